//! Per-navigation authorization.
//!
//! [`AuthGate::navigate`] classifies the target path, checks that a stored
//! session is still accepted by the backend, and returns a [`Verdict`]: render
//! the page, redirect somewhere else, or end the session and prompt for a new
//! sign-in.

use tracing::{debug, instrument, warn};

use merysalud_core::{Role, UserProfile};

use crate::error::add_breadcrumb;
use crate::notice::SessionExpiryNotice;
use crate::session::SessionStore;
use crate::transport::{ApiRequest, Transport};

/// Customer sign-in page.
pub const LOGIN_PAGE: &str = "/login.html";
/// Sign-in page for the admin and delivery areas.
pub const STAFF_LOGIN_PAGE: &str = "/admin/index.html";
/// Storefront home, where users without the right role are sent.
pub const HOME_PAGE: &str = "/";

/// What a resource requires of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

impl Access {
    /// Classify a navigated path.
    #[must_use]
    pub fn classify(path: &str) -> Self {
        if path.contains("/admin/") {
            Self::Role(Role::Admin)
        } else if path.contains("/delivery/") {
            Self::Role(Role::Delivery)
        } else if path.contains("/mis-pedidos.html") {
            Self::Authenticated
        } else {
            Self::Public
        }
    }

    /// Sign-in page for a path: the staff page for the admin and delivery
    /// areas, the customer page otherwise.
    #[must_use]
    pub fn login_entry(path: &str) -> &'static str {
        if path.contains("/admin/") || path.contains("/delivery/") {
            STAFF_LOGIN_PAGE
        } else {
            LOGIN_PAGE
        }
    }

    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    /// Whether a signed-in user with `role` may view the resource.
    #[must_use]
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Self::Public | Self::Authenticated => true,
            Self::Role(required) => *required == role,
        }
    }
}

/// Session state for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Not yet evaluated.
    Unchecked,
    /// A session exists and the backend accepted it.
    Valid,
    /// A session existed but the backend rejected it.
    Invalid,
    /// No session.
    Anonymous,
}

/// Navigation bar shown to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavbarVariant {
    Public,
    Admin,
    Delivery,
}

impl NavbarVariant {
    #[must_use]
    pub fn for_user(user: Option<&UserProfile>) -> Self {
        match user.map(|u| u.role) {
            Some(Role::Admin) => Self::Admin,
            Some(Role::Delivery) => Self::Delivery,
            Some(Role::Customer) | None => Self::Public,
        }
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Render the page.
    Render {
        /// Signed-in user, `None` when rendering anonymously.
        user: Option<UserProfile>,
        navbar: NavbarVariant,
    },
    /// Go elsewhere without a prompt.
    Redirect { to: &'static str },
    /// The session was ended and the expiry notice raised; go to sign-in.
    SessionExpired { login: &'static str },
}

impl Verdict {
    /// Show the sign-in link instead of the sign-out one.
    #[must_use]
    pub const fn shows_login(&self) -> bool {
        matches!(self, Self::Render { user: None, .. })
    }

    fn anonymous() -> Self {
        Self::Render {
            user: None,
            navbar: NavbarVariant::Public,
        }
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub access: Access,
    pub state: GateState,
    pub verdict: Verdict,
}

/// Decides what happens when the user navigates to a path.
#[derive(Clone)]
pub struct AuthGate {
    transport: Transport,
}

impl AuthGate {
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    fn session(&self) -> &SessionStore {
        self.transport.session()
    }

    fn notice(&self) -> &SessionExpiryNotice {
        self.transport.notice()
    }

    /// Evaluate a navigation to `path`.
    ///
    /// With a stored session this makes exactly one `GET /auth/me` call,
    /// whatever the user's role.
    #[instrument(skip(self))]
    pub async fn navigate(&self, path: &str) -> Navigation {
        let access = Access::classify(path);
        self.notice().begin_navigation(path);

        let state = self.check_session().await;
        let verdict = self.decide(path, access, state).await;

        let (outcome, target) = match &verdict {
            Verdict::Render { .. } => ("render", path),
            Verdict::Redirect { to } => ("redirect", *to),
            Verdict::SessionExpired { login } => ("session_expired", *login),
        };
        debug!(?access, ?state, outcome, target, "Navigation decided");
        add_breadcrumb(
            "navigation",
            outcome,
            Some(&[("path", path), ("target", target)]),
        );

        Navigation {
            access,
            state,
            verdict,
        }
    }

    async fn check_session(&self) -> GateState {
        if !self.session().is_authenticated().await {
            return GateState::Anonymous;
        }
        let liveness = self
            .transport
            .execute(ApiRequest::get("/auth/me").authenticated())
            .await;
        match liveness {
            Ok(_) => GateState::Valid,
            Err(e) => {
                warn!(error = %e, "Stored session rejected by backend");
                GateState::Invalid
            }
        }
    }

    async fn decide(&self, path: &str, access: Access, state: GateState) -> Verdict {
        match state {
            GateState::Invalid => {
                if let Err(e) = self.session().clear().await {
                    warn!(error = %e, "Failed to clear persisted session");
                }
                if access.is_public() {
                    Verdict::anonymous()
                } else {
                    self.notice().session_expired();
                    Verdict::SessionExpired {
                        login: Access::login_entry(path),
                    }
                }
            }
            GateState::Anonymous | GateState::Unchecked => {
                if access.is_public() {
                    Verdict::anonymous()
                } else {
                    Verdict::Redirect {
                        to: Access::login_entry(path),
                    }
                }
            }
            GateState::Valid => match self.session().profile().await {
                Some(user) if access.permits(user.role) => Verdict::Render {
                    navbar: NavbarVariant::for_user(Some(&user)),
                    user: Some(user),
                },
                Some(_) => Verdict::Redirect { to: HOME_PAGE },
                // Cleared between the check and now
                None if access.is_public() => Verdict::anonymous(),
                None => Verdict::Redirect {
                    to: Access::login_entry(path),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_paths() {
        assert_eq!(Access::classify("/admin/productos.html"), Access::Role(Role::Admin));
        assert_eq!(
            Access::classify("/delivery/pedidos.html"),
            Access::Role(Role::Delivery)
        );
        assert_eq!(Access::classify("/mis-pedidos.html"), Access::Authenticated);
        assert_eq!(Access::classify("/productos.html"), Access::Public);
        assert_eq!(Access::classify("/"), Access::Public);
    }

    #[test]
    fn test_login_entry_depends_on_area() {
        assert_eq!(Access::login_entry("/admin/reportes.html"), STAFF_LOGIN_PAGE);
        assert_eq!(Access::login_entry("/delivery/index.html"), STAFF_LOGIN_PAGE);
        assert_eq!(Access::login_entry("/mis-pedidos.html"), LOGIN_PAGE);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Access::Authenticated.permits(Role::Delivery));
        assert!(Access::Role(Role::Admin).permits(Role::Admin));
        assert!(!Access::Role(Role::Admin).permits(Role::Customer));
        assert!(!Access::Role(Role::Delivery).permits(Role::Admin));
    }

    #[test]
    fn test_navbar_variant_by_role() {
        assert_eq!(NavbarVariant::for_user(None), NavbarVariant::Public);
        let mut user = UserProfile {
            id: merysalud_core::UserId::new(1),
            display_name: "admin".to_string(),
            email: None,
            role: Role::Admin,
            phone: None,
        };
        assert_eq!(NavbarVariant::for_user(Some(&user)), NavbarVariant::Admin);
        user.role = Role::Customer;
        assert_eq!(NavbarVariant::for_user(Some(&user)), NavbarVariant::Public);
    }
}
