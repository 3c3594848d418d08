//! Shopping cart that is local for visitors and remote for signed-in users.
//!
//! The mode is picked from the session on every call. Anonymous carts live in
//! the key-value store under `carrito_local`; signed-in carts are proxied to
//! `/cart`. The two are never merged.

use std::future::Future;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use merysalud_core::{LineItem, Price, Product, ProductId};

use crate::error::{ApiError, CartError, StorageError};
use crate::session::SessionStore;
use crate::storage::keys;
use crate::transport::{ApiRequest, Transport};

/// Resolves product details for the anonymous cart.
pub trait ProductLookup: Send + Sync {
    /// The product with `id`, or `None` if it cannot be found.
    fn find_product(&self, id: ProductId) -> impl Future<Output = Option<Product>> + Send;
}

/// Backend cart payload.
#[derive(Debug, Deserialize)]
struct RemoteCart {
    #[serde(default)]
    items: Vec<RemoteCartItem>,
}

#[derive(Debug, Deserialize)]
struct RemoteCartItem {
    product: Product,
    quantity: u32,
}

/// Cart operations that behave the same in both modes.
#[derive(Clone)]
pub struct CartReconciler<L> {
    transport: Transport,
    lookup: L,
}

impl<L: ProductLookup> CartReconciler<L> {
    #[must_use]
    pub const fn new(transport: Transport, lookup: L) -> Self {
        Self { transport, lookup }
    }

    fn session(&self) -> &SessionStore {
        self.transport.session()
    }

    async fn is_remote(&self) -> bool {
        let remote = self.session().is_authenticated().await;
        debug!(mode = if remote { "remote" } else { "local" }, "Cart mode");
        remote
    }

    /// Current cart lines.
    ///
    /// A remote read failing with a 5xx, 401, or 403 falls back to the local
    /// cart; 401 and 403 also end the session.
    ///
    /// # Errors
    ///
    /// Returns `CartError` on network failures, malformed responses, and
    /// storage failures.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Vec<LineItem>, CartError> {
        if !self.is_remote().await {
            return Ok(self.load_local()?);
        }

        match self.fetch_remote().await {
            Ok(items) => Ok(items),
            Err(e) if e.is_server_error() || e.is_auth_failure() => {
                warn!(error = %e, "Remote cart unavailable, using local cart");
                if e.is_auth_failure()
                    && let Err(clear_err) = self.session().clear().await
                {
                    warn!(error = %clear_err, "Failed to clear session after auth failure");
                }
                Ok(self.load_local()?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// Returns `false` when nothing was added: zero quantity, an unknown
    /// product, or a backend refusal.
    ///
    /// # Errors
    ///
    /// Returns `CartError` on network and storage failures.
    #[instrument(skip(self))]
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<bool, CartError> {
        if quantity == 0 {
            debug!("Rejected add with zero quantity");
            return Ok(false);
        }

        if self.is_remote().await {
            return match self.add_remote(product_id, quantity).await {
                Ok(()) => Ok(true),
                Err(e @ ApiError::Http { .. }) => {
                    warn!(error = %e, "Backend refused cart add");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            };
        }

        let Some(product) = self.lookup.find_product(product_id).await else {
            warn!("Product not found, nothing added");
            return Ok(false);
        };

        let mut items = self.load_local()?;
        if let Some(line) = items.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            items.push(LineItem::snapshot(&product, quantity));
        }
        self.save_local(&items)?;
        Ok(true)
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// Remotely a non-zero quantity is applied as remove then re-add.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the backend or the store fails.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if self.is_remote().await {
            self.remove_remote(product_id).await?;
            if quantity > 0 {
                self.add_remote(product_id, quantity).await?;
            }
            return Ok(());
        }

        let mut items = self.load_local()?;
        if quantity == 0 {
            items.retain(|l| l.product_id != product_id);
        } else if let Some(line) = items.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        self.save_local(&items)?;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the backend or the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        if self.is_remote().await {
            self.transport
                .execute(ApiRequest::delete("/cart/clear").authenticated())
                .await?;
            return Ok(());
        }
        self.session().storage().remove(keys::LOCAL_CART)?;
        Ok(())
    }

    /// Total number of units across all lines.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn item_count(&self) -> Result<u32, CartError> {
        Ok(self
            .get()
            .await?
            .iter()
            .fold(0u32, |n, l| n.saturating_add(l.quantity)))
    }

    /// Sum of unit price times quantity.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn total(&self) -> Result<Price, CartError> {
        Ok(self.get().await?.iter().map(LineItem::subtotal).sum())
    }

    async fn fetch_remote(&self) -> Result<Vec<LineItem>, ApiError> {
        let cart: RemoteCart = self
            .transport
            .fetch(ApiRequest::get("/cart").authenticated())
            .await?;
        Ok(cart
            .items
            .into_iter()
            .filter(|i| i.quantity > 0)
            .map(|i| LineItem::snapshot(&i.product, i.quantity))
            .collect())
    }

    async fn add_remote(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.transport
            .execute(
                ApiRequest::post("/cart/add")
                    .query("productId", product_id)
                    .query("quantity", quantity)
                    .authenticated(),
            )
            .await
    }

    async fn remove_remote(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.transport
            .execute(ApiRequest::delete(format!("/cart/remove/{product_id}")).authenticated())
            .await
    }

    /// Read the anonymous cart. An unreadable cart is treated as empty.
    fn load_local(&self) -> Result<Vec<LineItem>, StorageError> {
        let Some(raw) = self.session().storage().get(keys::LOCAL_CART)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<LineItem>>(&raw) {
            Ok(mut items) => {
                items.retain(|l| l.quantity > 0);
                Ok(items)
            }
            Err(e) => {
                warn!(error = %e, "Local cart is unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }

    fn save_local(&self, items: &[LineItem]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items)?;
        self.session().storage().set(keys::LOCAL_CART, &raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::notice::{LogPrompt, SessionExpiryNotice};
    use crate::storage::{KeyValueStore, MemoryStore};

    struct FixedCatalog(HashMap<ProductId, Product>);

    impl ProductLookup for FixedCatalog {
        async fn find_product(&self, id: ProductId) -> Option<Product> {
            self.0.get(&id).cloned()
        }
    }

    fn product(id: i64, cents: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Producto {id}"),
            "price": Price::from_cents(cents),
            "imageUrl": format!("p{id}.jpg"),
            "stock": 10,
        }))
        .unwrap()
    }

    fn cart() -> (CartReconciler<FixedCatalog>, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let session = SessionStore::new(storage.clone());
        let notice = SessionExpiryNotice::new(Arc::new(LogPrompt));
        let config = ClientConfig::with_base_url("http://127.0.0.1:9/api").unwrap();
        let transport = Transport::new(&config, session, notice).unwrap();
        let catalog = FixedCatalog(
            [product(1, 550), product(7, 200)]
                .into_iter()
                .map(|p| (p.id, p))
                .collect(),
        );
        (CartReconciler::new(transport, catalog), storage)
    }

    #[tokio::test]
    async fn test_adding_same_product_merges_lines() {
        let (cart, _) = cart();
        assert!(cart.add(ProductId::new(1), 2).await.unwrap());
        assert!(cart.add(ProductId::new(1), 3).await.unwrap());

        let items = cart.get().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let (cart, _) = cart();
        cart.add(ProductId::new(1), 1).await.unwrap();
        cart.add(ProductId::new(7), 1).await.unwrap();

        cart.set_quantity(ProductId::new(1), 0).await.unwrap();

        let items = cart.get().await.unwrap();
        assert!(items.iter().all(|l| l.product_id != ProductId::new(1)));
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_updates_existing_line_only() {
        let (cart, _) = cart();
        cart.add(ProductId::new(7), 1).await.unwrap();
        cart.set_quantity(ProductId::new(7), 4).await.unwrap();
        cart.set_quantity(ProductId::new(1), 2).await.unwrap();

        let items = cart.get().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_rejects_zero_quantity_and_unknown_product() {
        let (cart, storage) = cart();
        assert!(!cart.add(ProductId::new(1), 0).await.unwrap());
        assert!(!cart.add(ProductId::new(99), 1).await.unwrap());
        assert!(cart.get().await.unwrap().is_empty());
        assert_eq!(storage.get(keys::LOCAL_CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_persisted_under_local_key() {
        let (cart, storage) = cart();
        cart.add(ProductId::new(7), 1).await.unwrap();

        let raw = storage.get(keys::LOCAL_CART).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["id"], 7);
        assert_eq!(json[0]["cantidad"], 1);
        assert_eq!(json[0]["precio"].as_f64(), Some(2.0));
        assert_eq!(json[0]["imagen"], "p7.jpg");

        cart.clear().await.unwrap();
        assert!(cart.get().await.unwrap().is_empty());
        assert_eq!(storage.get(keys::LOCAL_CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_count_and_total() {
        let (cart, _) = cart();
        cart.add(ProductId::new(1), 2).await.unwrap();
        cart.add(ProductId::new(7), 3).await.unwrap();

        assert_eq!(cart.item_count().await.unwrap(), 5);
        assert_eq!(cart.total().await.unwrap(), Price::from_cents(1700));
    }

    #[tokio::test]
    async fn test_unreadable_local_cart_is_empty() {
        let (cart, storage) = cart();
        storage.set(keys::LOCAL_CART, "not json").unwrap();
        assert!(cart.get().await.unwrap().is_empty());
        assert!(cart.add(ProductId::new(7), 1).await.unwrap());
        assert_eq!(cart.get().await.unwrap().len(), 1);
    }
}
