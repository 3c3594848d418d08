//! Navigation gate and session-expiry handling.

#![allow(clippy::unwrap_used)]

use merysalud_client::storage::keys;
use merysalud_client::{Access, GateState, KeyValueStore, NavbarVariant, Verdict};
use merysalud_core::Role;
use merysalud_integration_tests::{FakeBackend, TestClient};
use secrecy::SecretString;

async fn backend() -> FakeBackend {
    let backend = FakeBackend::start().await.unwrap();
    backend.add_user(3, "maria", "secreto123", "CUSTOMER");
    backend.add_user(1, "admin", "admin123", "ADMIN");
    backend.add_user(5, "repartidor1", "moto123", "REPARTIDOR");
    backend
}

async fn signed_in(backend: &FakeBackend, username: &str, password: &str) -> TestClient {
    let t = backend.client().unwrap();
    t.client
        .auth()
        .login(username, &SecretString::from(password))
        .await
        .unwrap();
    t
}

#[tokio::test]
async fn test_expired_session_on_protected_page_prompts_once() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;
    backend.expire_sessions();

    let navigation = t.client.gate().navigate("/mis-pedidos.html").await;

    assert_eq!(navigation.access, Access::Authenticated);
    assert_eq!(navigation.state, GateState::Invalid);
    assert_eq!(
        navigation.verdict,
        Verdict::SessionExpired {
            login: "/login.html"
        }
    );
    assert_eq!(t.prompt.count(), 1);
    assert_eq!(t.prompt.targets(), vec!["/login.html".to_string()]);
    assert!(!t.client.session().is_authenticated().await);
    assert_eq!(t.storage.get(keys::ACCESS_TOKEN).unwrap(), None);

    // Further failures on the same page stay silent
    assert!(t.client.orders().mine().await.is_err());
    assert_eq!(t.prompt.count(), 1);
}

#[tokio::test]
async fn test_token_expiring_after_render_prompts_once_across_calls() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;
    let navigation = t.client.gate().navigate("/mis-pedidos.html").await;
    assert_eq!(navigation.state, GateState::Valid);
    backend.expire_sessions();

    let orders = t.client.orders().mine().await;
    let cart = t.client.cart().get().await;
    let retried = t.client.orders().mine().await;

    assert!(orders.is_err());
    assert!(retried.is_err());
    assert!(cart.unwrap().is_empty());
    assert_eq!(t.prompt.count(), 1);
    assert!(!t.client.session().is_authenticated().await);
    assert!(t.storage.get(keys::ACCESS_TOKEN).unwrap().is_none());
}

#[tokio::test]
async fn test_staff_pages_send_expired_users_to_staff_login() {
    let backend = backend().await;
    let t = signed_in(&backend, "admin", "admin123").await;
    backend.expire_sessions();

    let navigation = t.client.gate().navigate("/admin/pedidos.html").await;

    assert_eq!(
        navigation.verdict,
        Verdict::SessionExpired {
            login: "/admin/index.html"
        }
    );
    assert_eq!(t.prompt.count(), 1);
}

#[tokio::test]
async fn test_expired_session_on_public_page_clears_silently() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;
    backend.expire_sessions();

    let navigation = t.client.gate().navigate("/productos.html").await;

    assert_eq!(navigation.state, GateState::Invalid);
    assert_eq!(
        navigation.verdict,
        Verdict::Render {
            user: None,
            navbar: NavbarVariant::Public
        }
    );
    assert!(navigation.verdict.shows_login());
    assert_eq!(t.prompt.count(), 0);
    assert!(!t.client.session().is_authenticated().await);
    assert_eq!(t.storage.get(keys::CURRENT_USER).unwrap(), None);
}

#[tokio::test]
async fn test_unauthorized_call_outside_navigation_is_silent() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;
    backend.expire_sessions();

    let err = t.client.auth().current_user().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(t.prompt.count(), 0);
    assert!(!t.client.session().is_authenticated().await);
}

#[tokio::test]
async fn test_each_navigation_may_prompt_again() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;
    backend.expire_sessions();
    t.client.gate().navigate("/mis-pedidos.html").await;

    t.client
        .auth()
        .login("maria", &SecretString::from("secreto123"))
        .await
        .unwrap();
    backend.expire_sessions();
    t.client.gate().navigate("/mis-pedidos.html").await;

    assert_eq!(t.prompt.count(), 2);
}

#[tokio::test]
async fn test_anonymous_visitor_is_redirected_without_prompt() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let orders = t.client.gate().navigate("/mis-pedidos.html").await;
    assert_eq!(orders.state, GateState::Anonymous);
    assert_eq!(orders.verdict, Verdict::Redirect { to: "/login.html" });

    let admin = t.client.gate().navigate("/admin/productos.html").await;
    assert_eq!(
        admin.verdict,
        Verdict::Redirect {
            to: "/admin/index.html"
        }
    );

    let home = t.client.gate().navigate("/index.html").await;
    assert!(home.verdict.shows_login());

    assert_eq!(t.prompt.count(), 0);
    assert_eq!(backend.me_calls(), 0);
}

#[tokio::test]
async fn test_wrong_role_goes_home() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;

    let navigation = t.client.gate().navigate("/admin/productos.html").await;

    assert_eq!(navigation.access, Access::Role(Role::Admin));
    assert_eq!(navigation.state, GateState::Valid);
    assert_eq!(navigation.verdict, Verdict::Redirect { to: "/" });
    assert!(t.client.session().is_authenticated().await);
    assert_eq!(t.prompt.count(), 0);
}

#[tokio::test]
async fn test_staff_render_with_their_navbar() {
    let backend = backend().await;

    let admin = signed_in(&backend, "admin", "admin123").await;
    let navigation = admin.client.gate().navigate("/admin/productos.html").await;
    let Verdict::Render { user, navbar } = navigation.verdict else {
        panic!("admin should see the admin area");
    };
    assert_eq!(user.unwrap().role, Role::Admin);
    assert_eq!(navbar, NavbarVariant::Admin);

    let courier = signed_in(&backend, "repartidor1", "moto123").await;
    let before = backend.me_calls();
    let navigation = courier.client.gate().navigate("/delivery/pedidos.html").await;
    assert_eq!(backend.me_calls(), before + 1);
    assert!(matches!(
        navigation.verdict,
        Verdict::Render {
            navbar: NavbarVariant::Delivery,
            ..
        }
    ));
}

#[tokio::test]
async fn test_signed_in_customer_renders_public_page() {
    let backend = backend().await;
    let t = signed_in(&backend, "maria", "secreto123").await;

    let navigation = t.client.gate().navigate("/index.html").await;

    assert_eq!(navigation.state, GateState::Valid);
    assert!(!navigation.verdict.shows_login());
    let Verdict::Render { user, navbar } = navigation.verdict else {
        panic!("public page should render");
    };
    assert_eq!(user.unwrap().display_name, "maria");
    assert_eq!(navbar, NavbarVariant::Public);
}
