//! Cart endpoints.
//!
//! Mutations answer with a plain acknowledgement; fetch the cart again to
//! see the result.

use reqwest::Method;
use serde::Serialize;
use shopswift_core::{CartItemId, ProductId};
use tracing::instrument;

use super::types::{Cart, MessageResponse};
use super::{ApiError, Authorized};

#[derive(Serialize)]
struct AddItemBody {
    product_id: ProductId,
    quantity: i32,
}

#[derive(Serialize)]
struct UpdateItemBody {
    quantity: i32,
}

fn check_quantity(quantity: i32) -> Result<(), ApiError> {
    if quantity < 1 {
        return Err(ApiError::InvalidInput(
            "quantity must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

impl Authorized<'_> {
    /// The user's cart. The server creates an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        let url = self.client.url("/cart")?;
        self.send(Method::GET, url).await
    }

    /// Add units of a product. Adding a product already in the cart
    /// increases its quantity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown product or
    /// `ApiError::Status` when stock is insufficient.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<MessageResponse, ApiError> {
        check_quantity(quantity)?;
        let url = self.client.url("/cart/items")?;
        let body = AddItemBody {
            product_id,
            quantity,
        };
        self.send_json(Method::POST, url, &body).await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a quantity below 1; use
    /// [`remove_cart_item`](Self::remove_cart_item) to drop a line.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<MessageResponse, ApiError> {
        check_quantity(quantity)?;
        let url = self.client.url(&format!("/cart/items/{item_id}"))?;
        self.send_json(Method::PUT, url, &UpdateItemBody { quantity })
            .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the line is not in the cart.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_cart_item(&self, item_id: CartItemId) -> Result<MessageResponse, ApiError> {
        let url = self.client.url(&format!("/cart/items/{item_id}"))?;
        self.send(Method::DELETE, url).await
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<MessageResponse, ApiError> {
        let url = self.client.url("/cart")?;
        self.send(Method::DELETE, url).await
    }
}
