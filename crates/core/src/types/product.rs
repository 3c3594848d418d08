//! Catalog products as served by `/api/products`.

use serde::{Deserialize, Serialize};

use crate::{Price, ProductId};

/// A product in the pharmacy catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Pack description, e.g. "Caja x 10 tabletas".
    #[serde(default)]
    pub presentacion: Option<String>,
    /// Active ingredient.
    #[serde(default)]
    pub principio_activo: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_active")]
    pub activo: bool,
}

const fn default_active() -> bool {
    true
}

impl Product {
    /// Whether the product can currently be bought.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.activo && self.stock > 0
    }
}

/// Payload for creating or updating a product (admin only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentacion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principio_activo: Option<String>,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub stock: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_product() {
        let json = r#"{
            "id": 7,
            "sku": "MASK-KN95",
            "name": "Mascarillas KN95",
            "price": 2.00,
            "categoria": "Protección",
            "imageUrl": "mascarilla.jpg",
            "stock": 500,
            "activo": true,
            "creadoEn": "2024-12-20T10:30:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, Price::from_cents(200));
        assert_eq!(product.image_url.as_deref(), Some("mascarilla.jpg"));
        assert!(product.is_available());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let product: Product =
            serde_json::from_str(r#"{"id": 1, "name": "Paracetamol", "price": 5.5}"#).unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.activo);
        assert!(!product.is_available());
    }
}
