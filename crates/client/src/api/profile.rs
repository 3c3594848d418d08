//! The signed-in user's own account.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument};

use merysalud_core::{Phone, UserAccount};

use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

#[derive(Serialize)]
struct ProfileUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

/// Profile endpoints. Every call is authenticated.
#[derive(Clone)]
pub struct ProfileApi {
    transport: Transport,
}

impl ProfileApi {
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// The stored account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<UserAccount, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/users/profile").authenticated())
            .await
    }

    /// Change the display name and/or phone. `None` leaves a field as is.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        name: Option<&str>,
        phone: Option<&Phone>,
    ) -> Result<UserAccount, ApiError> {
        let body = ProfileUpdate {
            name,
            phone: phone.map(Phone::as_str),
        };
        self.transport
            .fetch(ApiRequest::put("/users/profile").json(&body)?.authenticated())
            .await
    }

    /// Change the password. The backend answers `{"error": ...}` when the
    /// current password is wrong, which surfaces as the error message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the change.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), ApiError> {
        let body = PasswordChange {
            current_password: current.expose_secret(),
            new_password: new.expose_secret(),
        };
        self.transport
            .execute(
                ApiRequest::put("/users/profile/password")
                    .json(&body)?
                    .authenticated(),
            )
            .await?;
        info!("Password changed");
        Ok(())
    }
}
