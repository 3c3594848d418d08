//! HTTP transport to the pharmacy backend.
//!
//! Every backend call goes through [`Transport::send`], which attaches the
//! bearer token when asked to, normalizes error bodies into [`ApiError`], and
//! ends the session as soon as the backend reports it expired.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, extract_error_message};
use crate::notice::SessionExpiryNotice;
use crate::session::SessionStore;

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Body served with a JSON content type.
    Json(Value),
    /// Any other body, as text.
    Text(String),
}

impl Payload {
    /// Decode into `T`. Text bodies are decoded as JSON too, since some
    /// endpoints omit the content type.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

/// Token selection for one request.
#[derive(Debug, Clone, Default)]
enum Auth {
    #[default]
    None,
    /// Use the session token when one exists.
    Session,
    /// Use this token regardless of the session.
    Explicit(SecretString),
}

/// One backend request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    auth: Auth,
}

impl ApiRequest {
    /// Request for `path`, relative to the configured base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: Auth::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Send `body` as JSON. A body that serializes to `null` is omitted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)?;
        self.body = (!value.is_null()).then_some(value);
        Ok(self)
    }

    /// Attach the session's bearer token, if there is one.
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.auth = Auth::Session;
        self
    }

    /// Attach a specific bearer token.
    #[must_use]
    pub fn bearer(mut self, token: SecretString) -> Self {
        self.auth = Auth::Explicit(token);
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// HTTP transport bound to one backend and one session.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionStore,
    notice: SessionExpiryNotice,
}

impl Transport {
    /// Create a transport.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        session: SessionStore,
        notice: SessionExpiryNotice,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(TransportInner {
                client,
                base_url: config.base_url.clone(),
                session,
                notice,
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn notice(&self) -> &SessionExpiryNotice {
        &self.inner.notice
    }

    /// Absolute URL for a request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the path cannot be joined.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self
            .inner
            .base_url
            .join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Send a request and return its body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` for non-success statuses, `ApiError::Network`
    /// when the request never completes, and `ApiError::Parse` when a JSON
    /// response is malformed.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<Payload, ApiError> {
        let response = self.dispatch(request).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = response.text().await?;

        if is_json && !text.trim().is_empty() {
            Ok(Payload::Json(serde_json::from_str(&text)?))
        } else {
            Ok(Payload::Text(text))
        }
    }

    /// Send a request and decode its body as `T`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.decode()
    }

    /// Send a request whose body is not needed.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    /// Send a request and return the raw body bytes.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn download(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        let response = self.dispatch(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Build, send, and check the status of a request.
    async fn dispatch(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url_for(&request)?;
        let carries_session = matches!(request.auth, Auth::Session);

        let token = match request.auth {
            Auth::None => None,
            Auth::Session => self.inner.session.token().await,
            Auth::Explicit(token) => Some(token),
        };

        let mut builder = self.inner.client.request(request.method, url);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_text = status.canonical_reason().unwrap_or_default();
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::Http {
            status: status.as_u16(),
            message: extract_error_message(status.as_u16(), status_text, &body),
        };

        if error.expires_session(carries_session) {
            self.end_expired_session().await;
        }
        Err(error)
    }

    /// Clear the session and raise the expiry notice.
    async fn end_expired_session(&self) {
        if let Err(e) = self.inner.session.clear().await {
            warn!(error = %e, "Failed to clear persisted session after 401");
        }
        self.inner.notice.session_expired();
    }
}
