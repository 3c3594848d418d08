//! Orders: checkout, history, and the admin and delivery workflows.

use serde_json::{Map, Value};
use tracing::{info, instrument};

use merysalud_core::{Order, OrderId, OrderStatus, ShippingDetails, UserAccount, UserId};

use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

/// Order endpoints. Every call is authenticated.
#[derive(Clone)]
pub struct OrdersApi {
    transport: Transport,
}

impl OrdersApi {
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Place an order from the signed-in user's remote cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses the order (e.g. empty cart).
    #[instrument(skip(self, shipping))]
    pub async fn create(&self, shipping: Option<&ShippingDetails>) -> Result<Order, ApiError> {
        let order: Order = self
            .transport
            .fetch(ApiRequest::post("/orders").json(&shipping)?.authenticated())
            .await?;
        info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(order)
    }

    /// Orders of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn mine(&self) -> Result<Vec<Order>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders").authenticated())
            .await
    }

    /// One order by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order, ApiError> {
        self.transport
            .fetch(ApiRequest::get(format!("/orders/{id}")).authenticated())
            .await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Every order in the store (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<Order>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders/admin/all").authenticated())
            .await
    }

    /// Change an order's status (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, ApiError> {
        self.transport
            .fetch(
                ApiRequest::put(format!("/orders/{id}/status"))
                    .query("status", status)
                    .authenticated(),
            )
            .await
    }

    /// Assign an order to a delivery user (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn assign_delivery(&self, id: OrderId, courier: UserId) -> Result<Order, ApiError> {
        self.transport
            .fetch(
                ApiRequest::put(format!("/orders/{id}/assign-delivery"))
                    .query("repartidorId", courier)
                    .authenticated(),
            )
            .await
    }

    /// Orders waiting for a courier (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn unassigned(&self) -> Result<Vec<Order>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders/unassigned").authenticated())
            .await
    }

    /// Delivery users that can take orders (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn available_couriers(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders/delivery/available").authenticated())
            .await
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Orders assigned to the signed-in courier.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn my_deliveries(&self) -> Result<Vec<Order>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders/delivery/my-orders").authenticated())
            .await
    }

    /// Report progress on an assigned order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn update_delivery_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.transport
            .fetch(
                ApiRequest::put(format!("/orders/{id}/delivery-status"))
                    .query("status", status)
                    .authenticated(),
            )
            .await
    }

    /// Delivery counters for the signed-in courier, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn delivery_stats(&self) -> Result<Map<String, Value>, ApiError> {
        self.transport
            .fetch(ApiRequest::get("/orders/delivery/stats").authenticated())
            .await
    }
}
