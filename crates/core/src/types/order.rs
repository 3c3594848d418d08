//! Orders and checkout details.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{OrderId, OrderItemId, OrderStatus, Price, Product, UserId};

/// Shipping details submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub shipping_address: String,
    pub shipping_district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_reference: Option<String>,
}

/// Minimal view of a user embedded in an order (customer or courier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParty {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

/// One line of a placed order with the price charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: Product,
    pub quantity: u32,
    pub price: Price,
    #[serde(default)]
    pub subtotal: Option<Price>,
}

impl OrderItem {
    /// Line subtotal, computed when the backend omits it.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.subtotal.unwrap_or_else(|| self.price.times(self.quantity))
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub numero_pedido: Option<String>,
    #[serde(default)]
    pub user: Option<OrderParty>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    #[serde(default)]
    pub subtotal: Option<Price>,
    pub total_amount: Price,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub shipping_district: Option<String>,
    #[serde(default)]
    pub repartidor: Option<OrderParty>,
}

impl Order {
    /// Display reference: the order number when present, else `#<id>`.
    #[must_use]
    pub fn reference(&self) -> String {
        self.numero_pedido
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

/// Timestamps arrive either as ISO-8601 strings or as Jackson's
/// `[year, month, day, hour, minute, second, nanos]` arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Parts(Vec<i64>),
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawTimestamp>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw {
        RawTimestamp::Text(s) => s
            .trim_end_matches('Z')
            .parse::<NaiveDateTime>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        RawTimestamp::Parts(parts) => timestamp_from_parts(&parts)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp array: {parts:?}"))),
    }
}

fn timestamp_from_parts(parts: &[i64]) -> Option<NaiveDateTime> {
    let part = |i: usize| -> Option<u32> {
        parts.get(i).map_or(Some(0), |v| u32::try_from(*v).ok())
    };
    let year = i32::try_from(*parts.first()?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, part(1)?, part(2)?)?;
    date.and_hms_nano_opt(part(3)?, part(4)?, part(5)?, part(6)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER: &str = r#"{
        "id": 12,
        "numeroPedido": "PED-0012",
        "user": {"id": 3, "username": "maria"},
        "items": [{
            "id": 1,
            "product": {"id": 7, "name": "Mascarillas KN95", "price": 2.00},
            "quantity": 3,
            "price": 2.00
        }],
        "status": "Pendiente",
        "totalAmount": 6.00,
        "createdAt": [2024, 12, 20, 10, 30, 5],
        "repartidor": null
    }"#;

    #[test]
    fn test_deserialize_order_with_array_timestamp() {
        let order: Order = serde_json::from_str(ORDER).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.reference(), "PED-0012");
        assert_eq!(order.items[0].line_total(), Price::from_cents(600));
        assert_eq!(
            order.created_at.unwrap().to_string(),
            "2024-12-20 10:30:05"
        );
        assert!(order.repartidor.is_none());
    }

    #[test]
    fn test_deserialize_iso_timestamp() {
        let json = r#"{"id": 1, "status": "DELIVERED", "totalAmount": 10,
                       "createdAt": "2024-12-20T10:30:00.123"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.reference(), "#1");
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_rejects_impossible_timestamp() {
        let json = r#"{"id": 1, "status": "PENDING", "totalAmount": 1,
                       "createdAt": [2024, 13, 40]}"#;
        assert!(serde_json::from_str::<Order>(json).is_err());
    }

    #[test]
    fn test_shipping_details_body_keys() {
        let details = ShippingDetails {
            shipping_address: "Av. Arequipa 123".to_string(),
            shipping_district: "Miraflores".to_string(),
            shipping_reference: None,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["shippingAddress"], "Av. Arequipa 123");
        assert!(json.get("shippingReference").is_none());
    }
}
