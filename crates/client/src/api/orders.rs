//! Order history and checkout.

use reqwest::Method;
use shopswift_core::OrderId;
use tracing::instrument;

use super::types::{NewOrder, Order};
use super::{ApiError, Authorized};

impl Authorized<'_> {
    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.client.url("/orders")?;
        self.send(Method::GET, url).await
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown order or one that belongs
    /// to another user.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        let url = self.client.url(&format!("/orders/{id}"))?;
        self.send(Method::GET, url).await
    }

    /// Turn the cart into an order. The server empties the cart and
    /// decrements stock.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a blank address, or
    /// `ApiError::Status` when the cart is empty or stock ran out.
    #[instrument(skip(self, order))]
    pub async fn place_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        order.validate()?;
        let url = self.client.url("/orders")?;
        let placed: Order = self.send_json(Method::POST, url, order).await?;
        // Stock levels shown in the catalog are now stale
        self.client.invalidate_catalog();
        tracing::info!(order_id = %placed.id, "Order placed");
        Ok(placed)
    }
}
