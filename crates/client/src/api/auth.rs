//! Sign-in, registration, and sign-out.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use merysalud_core::{Email, Phone, Role, UserAccount, UserProfile};

use crate::error::{ApiError, AuthError, FieldError, StorageError};
use crate::session::{Session, SessionStore};
use crate::transport::{ApiRequest, Transport};

/// Token response of `POST /auth/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    role: Role,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// New-account form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub telefono: String,
}

#[derive(Serialize)]
struct RegistrationBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    telefono: &'a str,
}

impl Registration {
    /// Check the form the way the store's sign-up page does.
    ///
    /// # Errors
    ///
    /// Returns every failing field, not just the first.
    pub fn validate(&self) -> Result<(Email, Phone), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push(FieldError {
                field: "username",
                message: "value cannot be empty".to_string(),
            });
        }
        if self.password.expose_secret().is_empty() {
            errors.push(FieldError {
                field: "password",
                message: "value cannot be empty".to_string(),
            });
        }
        let email = Email::parse(self.email.trim())
            .map_err(|e| errors.push(FieldError::new("email", &e)))
            .ok();
        let phone = Phone::parse(&self.telefono)
            .map_err(|e| errors.push(FieldError::new("telefono", &e)))
            .ok();

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok((email, phone)),
            _ => Err(errors),
        }
    }
}

/// Authentication endpoints.
#[derive(Clone)]
pub struct AuthApi {
    transport: Transport,
}

impl AuthApi {
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    fn session(&self) -> &SessionStore {
        self.transport.session()
    }

    /// Sign in and persist the session.
    ///
    /// The profile is fetched with the new token before anything is stored,
    /// so the session appears complete or not at all.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` for rejected credentials or backend failures
    /// and `AuthError::Storage` if the session cannot be persisted.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<UserProfile, AuthError> {
        let body = LoginBody {
            username,
            password: password.expose_secret(),
        };
        let tokens: LoginResponse = self
            .transport
            .fetch(ApiRequest::post("/auth/login").json(&body)?)
            .await?;
        if tokens.access_token.is_empty() {
            return Err(AuthError::UnexpectedResponse(
                "missing access token".to_string(),
            ));
        }

        let token = SecretString::from(tokens.access_token);
        let account: UserAccount = self
            .transport
            .fetch(ApiRequest::get("/auth/me").bearer(token.clone()))
            .await?;
        let profile = UserProfile::from_account(account, tokens.role);

        self.session()
            .establish(Session {
                token,
                refresh_token: tokens.refresh_token.map(SecretString::from),
                profile: profile.clone(),
            })
            .await?;

        info!(user_id = %profile.id, role = %profile.role, "Signed in");
        Ok(profile)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` before any request if the form is
    /// invalid, or `AuthError::Api` if the backend rejects it.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<UserAccount, AuthError> {
        let (email, phone) = registration.validate().map_err(AuthError::Validation)?;
        let body = RegistrationBody {
            username: registration.username.trim(),
            email: email.as_str(),
            password: registration.password.expose_secret(),
            telefono: phone.as_str(),
        };
        let account = self
            .transport
            .fetch(ApiRequest::post("/auth/register").json(&body)?)
            .await?;
        Ok(account)
    }

    /// The signed-in account, as the backend sees it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails; a 401 also ends the session.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<UserAccount, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/auth/me").authenticated())
            .await
    }

    /// Sign out locally. The backend keeps no server-side session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the persisted keys cannot be removed.
    pub async fn logout(&self) -> Result<(), StorageError> {
        self.session().clear().await?;
        info!("Signed out");
        Ok(())
    }
}
