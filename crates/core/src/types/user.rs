//! User accounts and the persisted session profile.

use serde::{Deserialize, Serialize};

use crate::{Role, UserId};

/// Account as returned by `GET /auth/me` and `GET /users/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    /// Some backend builds omit the role here; the login response always
    /// carries it.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Identity of the signed-in user, persisted next to the access token.
///
/// Serialized under `usuarioActual` with the store's field names so that a
/// profile written by an older front end is still readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
}

impl UserProfile {
    /// Build a profile from the account record and the role granted at login.
    ///
    /// The login role wins over whatever the account record says.
    #[must_use]
    pub fn from_account(account: UserAccount, login_role: Role) -> Self {
        Self {
            id: account.id,
            display_name: account.username,
            email: account.email,
            role: login_role,
            phone: account.telefono,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_persists_with_store_field_names() {
        let profile = UserProfile {
            id: UserId::new(3),
            display_name: "maria".to_string(),
            email: Some("maria@gmail.com".to_string()),
            role: Role::Customer,
            phone: Some("999888777".to_string()),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["nombre"], "maria");
        assert_eq!(json["rol"], "CUSTOMER");
        assert_eq!(json["telefono"], "999888777");
    }

    #[test]
    fn test_reads_legacy_profile_with_user_role() {
        let json = r#"{"id": 3, "nombre": "maria", "email": "maria@gmail.com", "rol": "USER"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.role, Role::Customer);
        assert_eq!(profile.phone, None);
    }

    #[test]
    fn test_login_role_overrides_account_role() {
        let account: UserAccount = serde_json::from_str(
            r#"{"id": 1, "username": "admin", "email": "admin@farmacia.com", "role": "USER"}"#,
        )
        .unwrap();
        let profile = UserProfile::from_account(account, Role::Admin);
        assert!(profile.is_admin());
        assert_eq!(profile.display_name, "admin");
    }
}
