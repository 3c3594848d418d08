//! Product catalog.
//!
//! Public lookups never fail: a backend or network error is logged and
//! reported as an empty result, since the storefront should still render.
//! Product details are cached with `moka`; admin writes invalidate them.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument, warn};

use merysalud_core::{Product, ProductDraft, ProductId};

use crate::cart::ProductLookup;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

/// Read-through product catalog.
#[derive(Clone)]
pub struct ProductCatalog {
    inner: Arc<ProductCatalogInner>,
}

struct ProductCatalogInner {
    transport: Transport,
    cache: Cache<ProductId, Product>,
}

impl ProductCatalog {
    /// Create a catalog whose product details live for `ttl`.
    #[must_use]
    pub fn new(transport: Transport, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(ProductCatalogInner { transport, cache }),
        }
    }

    fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// All products.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<Product> {
        self.fetch_list(ApiRequest::get("/products")).await
    }

    /// Products matching `keyword`.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Vec<Product> {
        self.fetch_list(ApiRequest::get("/products/search").query("keyword", keyword))
            .await
    }

    /// Products in a category.
    #[instrument(skip(self))]
    pub async fn by_category(&self, category: &str) -> Vec<Product> {
        let path = format!("/products/category/{}", encode_segment(category));
        self.fetch_list(ApiRequest::get(path)).await
    }

    /// One product, from cache when fresh.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        if let Some(product) = self.inner.cache.get(&id).await {
            debug!("Cache hit for product");
            return Some(product);
        }

        match self
            .transport()
            .fetch::<Product>(ApiRequest::get(format!("/products/{id}")))
            .await
        {
            Ok(product) => {
                self.inner.cache.insert(id, product.clone()).await;
                Some(product)
            }
            Err(e) => {
                warn!(error = %e, "Product lookup failed");
                None
            }
        }
    }

    /// Create a product (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the product.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        let product: Product = self
            .transport()
            .fetch(ApiRequest::post("/products").json(draft)?.authenticated())
            .await?;
        self.inner.cache.insert(product.id, product.clone()).await;
        Ok(product)
    }

    /// Replace a product (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the update.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<Product, ApiError> {
        let product: Product = self
            .transport()
            .fetch(
                ApiRequest::put(format!("/products/{id}"))
                    .json(draft)?
                    .authenticated(),
            )
            .await?;
        self.inner.cache.insert(id, product.clone()).await;
        Ok(product)
    }

    /// Delete a product (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ApiError> {
        self.inner.cache.invalidate(&id).await;
        self.transport()
            .execute(ApiRequest::delete(format!("/products/{id}")).authenticated())
            .await
    }

    /// Drop every cached product.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    async fn fetch_list(&self, request: ApiRequest) -> Vec<Product> {
        match self.transport().fetch::<Vec<Product>>(request).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Product listing failed, showing no products");
                Vec::new()
            }
        }
    }
}

impl ProductLookup for ProductCatalog {
    async fn find_product(&self, id: ProductId) -> Option<Product> {
        self.get(id).await
    }
}

/// Escape the characters that would split or end a path segment.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment_escapes_delimiters() {
        assert_eq!(encode_segment("Cuidado Personal"), "Cuidado Personal");
        assert_eq!(encode_segment("a/b?c#d%"), "a%2Fb%3Fc%23d%25");
    }
}
