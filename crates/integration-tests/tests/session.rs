//! Sign-in, session persistence, and backend error reporting.

#![allow(clippy::unwrap_used)]

use merysalud_client::storage::keys;
use merysalud_client::{ApiError, AuthError, KeyValueStore, Registration};
use merysalud_core::{Role, UserId};
use merysalud_integration_tests::FakeBackend;
use secrecy::SecretString;

async fn backend() -> FakeBackend {
    let backend = FakeBackend::start().await.unwrap();
    backend.add_user(3, "maria", "secreto123", "CUSTOMER");
    backend.add_user(1, "admin", "admin123", "ADMIN");
    backend
}

#[tokio::test]
async fn test_login_persists_token_and_profile_together() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let profile = t
        .client
        .auth()
        .login("maria", &SecretString::from("secreto123"))
        .await
        .unwrap();

    assert_eq!(profile.id, UserId::new(3));
    assert_eq!(profile.role, Role::Customer);
    assert!(t.client.session().is_authenticated().await);
    assert!(t.storage.get(keys::ACCESS_TOKEN).unwrap().is_some());
    assert!(t.storage.get(keys::REFRESH_TOKEN).unwrap().is_some());

    let stored = t.storage.get(keys::CURRENT_USER).unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["nombre"], "maria");
    assert_eq!(stored["rol"], "CUSTOMER");
}

#[tokio::test]
async fn test_failed_login_leaves_no_session() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let err = t
        .client
        .auth()
        .login("maria", &SecretString::from("wrong"))
        .await
        .unwrap_err();

    match err {
        AuthError::Api(ApiError::Http { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Credenciales inválidas");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!t.client.session().is_authenticated().await);
    assert_eq!(t.storage.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(t.storage.get(keys::CURRENT_USER).unwrap(), None);
    assert_eq!(t.prompt.count(), 0);
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let backend = backend().await;
    let t = backend.client().unwrap();
    t.client
        .auth()
        .login("maria", &SecretString::from("secreto123"))
        .await
        .unwrap();
    t.client.gate().navigate("/mis-pedidos.html").await;
    let token_before = t.storage.get(keys::ACCESS_TOKEN).unwrap();

    let err = t
        .client
        .auth()
        .login("maria", &SecretString::from("typo"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Api(ApiError::Http { status: 401, .. })));
    assert!(t.client.session().is_authenticated().await);
    assert_eq!(t.storage.get(keys::ACCESS_TOKEN).unwrap(), token_before);
    assert!(t.storage.get(keys::CURRENT_USER).unwrap().is_some());
    assert_eq!(t.prompt.count(), 0);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let backend = backend().await;
    let first = backend.client().unwrap();
    first
        .client
        .auth()
        .login("admin", &SecretString::from("admin123"))
        .await
        .unwrap();

    let second = backend.client_over(first.storage.clone()).unwrap();
    let restored = second.client.restore_session().await.unwrap().unwrap();
    assert_eq!(restored.role, Role::Admin);
    assert!(second.client.session().is_authenticated().await);
}

#[tokio::test]
async fn test_logout_removes_every_session_key() {
    let backend = backend().await;
    let t = backend.client().unwrap();
    t.client
        .auth()
        .login("maria", &SecretString::from("secreto123"))
        .await
        .unwrap();

    t.client.auth().logout().await.unwrap();

    assert!(!t.client.session().is_authenticated().await);
    for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::CURRENT_USER] {
        assert_eq!(t.storage.get(key).unwrap(), None, "{key} left behind");
    }
}

#[tokio::test]
async fn test_backend_error_list_is_joined() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let err = t
        .client
        .auth()
        .register(&Registration {
            username: "maria".to_string(),
            email: "maria@gmail.com".to_string(),
            password: SecretString::from("otra-clave"),
            telefono: "912345678".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        AuthError::Api(ApiError::Http { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "El usuario ya existe; El email ya está registrado");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_register_rejects_bad_form_before_sending() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let err = t
        .client
        .auth()
        .register(&Registration {
            username: "nuevo".to_string(),
            email: "sin-arroba".to_string(),
            password: SecretString::from("clave"),
            telefono: "812345678".to_string(),
        })
        .await
        .unwrap_err();

    let AuthError::Validation(errors) = err else {
        panic!("expected validation errors");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["email", "telefono"]);
}

#[tokio::test]
async fn test_register_returns_new_account() {
    let backend = backend().await;
    let t = backend.client().unwrap();

    let account = t
        .client
        .auth()
        .register(&Registration {
            username: "lucia".to_string(),
            email: "lucia@gmail.com".to_string(),
            password: SecretString::from("clave-segura"),
            telefono: " 987654321 ".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(account.username, "lucia");
    assert_eq!(account.telefono.as_deref(), Some("987654321"));
    assert!(!t.client.session().is_authenticated().await);
}
