//! Error types for the pharmacy client.
//!
//! [`ApiError`] is the single error shape produced by the transport. Backend
//! error bodies are normalized into one human-readable message by
//! [`extract_error_message`]. The Sentry helpers at the bottom associate
//! reports with the signed-in user and record gate decisions as breadcrumbs.

use serde_json::Value;
use thiserror::Error;

use merysalud_core::ContactError;

/// Errors that can occur when talking to the pharmacy backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection refused, timeout, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The response claimed to be JSON but could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status for backend errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error means the session is no longer accepted.
    ///
    /// Matches a 401 status or any message mentioning `401`, since some
    /// backend paths wrap the status into the message of another code.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Http { status, message } => *status == 401 || message.contains("401"),
            _ => false,
        }
    }

    /// Whether this failure ends the stored session.
    ///
    /// A 401 counts only when the request carried the session token, so a
    /// rejected sign-in leaves an existing session alone. A message naming
    /// 401 counts for any request.
    #[must_use]
    pub fn expires_session(&self, carried_session: bool) -> bool {
        match self {
            Self::Http { status, message } => {
                (*status == 401 && carried_session) || message.contains("401")
            }
            _ => false,
        }
    }

    /// 401 or 403.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.is_auth_expired() || self.status() == Some(403)
    }

    /// Any 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }
}

/// Errors raised by the key-value store backing the session and local cart.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from cart operations.
///
/// Business failures of `add` (unknown product, rejected quantity, backend
/// refusal) are reported as `Ok(false)`, not through this type.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from authentication flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Client-side form validation failed; keyed by field name.
    #[error("{}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// The backend accepted the credentials but returned an unusable payload.
    #[error("Unexpected login response: {0}")]
    UnexpectedResponse(String),
}

/// A validation message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, error: &ContactError) -> Self {
        Self {
            field,
            message: error.to_string(),
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalize a backend error body into one message.
///
/// Priority: `errors[]` (each entry's `defaultMessage`, else `message`),
/// then `fieldErrors[]` as `field: message`, then a scalar `message`, then a
/// scalar `error`, then the body itself. A body that is not JSON yields
/// `Error <status>: <statusText>`.
#[must_use]
pub fn extract_error_message(status: u16, status_text: &str, body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return format!("Error {status}: {status_text}");
    };

    if let Some(errors) = json.get("errors").and_then(Value::as_array) {
        let message = join_messages(errors.iter().filter_map(|e| {
            e.get("defaultMessage")
                .and_then(Value::as_str)
                .or_else(|| e.get("message").and_then(Value::as_str))
                .map(str::to_owned)
        }));
        if !message.is_empty() {
            return message;
        }
    }

    if let Some(errors) = json.get("fieldErrors").and_then(Value::as_array) {
        let message = join_messages(errors.iter().filter_map(|e| {
            let field = e.get("field").and_then(Value::as_str)?;
            let text = e
                .get("message")
                .or_else(|| e.get("defaultMessage"))
                .and_then(Value::as_str)?;
            Some(format!("{field}: {text}"))
        }));
        if !message.is_empty() {
            return message;
        }
    }

    for key in ["message", "error"] {
        if let Some(text) = json.get(key).and_then(Value::as_str)
            && !text.is_empty()
        {
            return text.to_owned();
        }
    }

    match json {
        Value::String(s) if !s.is_empty() => s,
        Value::Null => format!("Error {status}: {status_text}"),
        other => other.to_string(),
    }
}

fn join_messages(messages: impl Iterator<Item = String>) -> String {
    messages.collect::<Vec<_>>().join("; ")
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context for the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a client-side decision.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb
                .data
                .insert((*key).to_string(), Value::String((*value).to_string()));
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
