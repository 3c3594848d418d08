//! Cart line items.
//!
//! The persisted local cart (`carrito_local`) uses the store's original
//! Spanish field names, so a cart written by an older front end still loads.

use serde::{Deserialize, Serialize};

use crate::{Price, Product, ProductId};

/// One product entry in the cart with a quantity and a price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub unit_price: Price,
    /// Always at least 1; lines that would drop to zero are removed instead.
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "imagen", default)]
    pub image_ref: Option<String>,
}

impl LineItem {
    /// Snapshot a product's name, price, and image at add-time.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_ref: product.image_url.clone(),
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_shape_uses_store_field_names() {
        let item = LineItem {
            product_id: ProductId::new(7),
            name: "Mascarillas KN95".to_string(),
            unit_price: Price::from_cents(200),
            quantity: 1,
            image_ref: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["cantidad"], 1);
        assert_eq!(json["precio"].as_f64(), Some(2.0));
        assert_eq!(json["nombre"], "Mascarillas KN95");
    }

    #[test]
    fn test_loads_cart_written_by_older_front_end() {
        let json = r#"[{"id": 1, "nombre": "Paracetamol 500mg", "precio": 5.50,
                        "cantidad": 2, "imagen": "paracetamol.jpg"}]"#;
        let items: Vec<LineItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0].subtotal(), Price::from_cents(1100));
    }
}
