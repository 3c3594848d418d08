//! One handle wiring every component to the same session and transport.

use std::sync::Arc;

use merysalud_core::UserProfile;

use crate::api::{AuthApi, OrdersApi, ProductCatalog, ProfileApi, ReportsApi};
use crate::cart::CartReconciler;
use crate::config::ClientConfig;
use crate::error::{ApiError, StorageError};
use crate::gate::AuthGate;
use crate::notice::{ReauthPrompt, SessionExpiryNotice};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::transport::Transport;

/// Pharmacy client.
///
/// Cheap to clone; clones share the session, the product cache, and the
/// HTTP connection pool.
#[derive(Clone)]
pub struct PharmacyClient {
    session: SessionStore,
    transport: Transport,
    gate: AuthGate,
    cart: CartReconciler<ProductCatalog>,
    auth: AuthApi,
    products: ProductCatalog,
    orders: OrdersApi,
    profile: ProfileApi,
    reports: ReportsApi,
}

impl PharmacyClient {
    /// Build a client over `storage`, showing expiry prompts through `prompt`.
    ///
    /// The persisted session is not loaded; call
    /// [`restore_session`](Self::restore_session).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        prompt: Arc<dyn ReauthPrompt>,
    ) -> Result<Self, ApiError> {
        let session = SessionStore::new(storage);
        let notice = SessionExpiryNotice::new(prompt);
        let transport = Transport::new(config, session.clone(), notice)?;
        let products = ProductCatalog::new(transport.clone(), config.product_cache_ttl);

        Ok(Self {
            gate: AuthGate::new(transport.clone()),
            cart: CartReconciler::new(transport.clone(), products.clone()),
            auth: AuthApi::new(transport.clone()),
            orders: OrdersApi::new(transport.clone()),
            profile: ProfileApi::new(transport.clone()),
            reports: ReportsApi::new(transport.clone()),
            products,
            session,
            transport,
        })
    }

    /// Load the persisted session, repairing a half-written one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or repaired.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>, StorageError> {
        self.session.restore().await
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub const fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[must_use]
    pub const fn cart(&self) -> &CartReconciler<ProductCatalog> {
        &self.cart
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthApi {
        &self.auth
    }

    #[must_use]
    pub const fn products(&self) -> &ProductCatalog {
        &self.products
    }

    #[must_use]
    pub const fn orders(&self) -> &OrdersApi {
        &self.orders
    }

    #[must_use]
    pub const fn profile(&self) -> &ProfileApi {
        &self.profile
    }

    #[must_use]
    pub const fn reports(&self) -> &ReportsApi {
        &self.reports
    }
}
