//! Admin endpoints: product, category, order and user management, plus the
//! dashboard stats.
//!
//! All calls need an admin account; the server answers 403 otherwise. Every
//! successful catalog mutation drops the catalog cache.

use reqwest::Method;
use shopswift_core::{CategoryId, OrderId, OrderStatus, ProductId, UserId};
use tracing::{info, instrument};

use super::types::{
    AdminStats, Category, CategoryInput, FeaturedToggle, MessageResponse, NewProduct, Order,
    OrderStatusUpdate, Product, ProductQuery, ProductUpdate, UserPage, UserToggle,
};
use super::{ApiError, Authorized};

impl Authorized<'_> {
    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a bad name, price or stock, or
    /// `ApiError::Forbidden` for a non-admin token.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        product.validate()?;
        let url = self.client.url("/products")?;
        let created: Product = self.send_json(Method::POST, url, product).await?;
        self.client.invalidate_catalog();
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an empty or invalid update, or
    /// `ApiError::NotFound` for an unknown product.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ApiError> {
        update.validate()?;
        let url = self.client.url(&format!("/products/{id}"))?;
        let updated: Product = self.send_json(Method::PUT, url, update).await?;
        self.client.invalidate_catalog();
        Ok(updated)
    }

    /// Deactivate a product, or delete it for good with `permanent`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        id: ProductId,
        permanent: bool,
    ) -> Result<MessageResponse, ApiError> {
        let mut url = self.client.url(&format!("/products/{id}"))?;
        if permanent {
            url.query_pairs_mut().append_pair("permanent", "true");
        }
        let response = self.send(Method::DELETE, url).await?;
        self.client.invalidate_catalog();
        info!(permanent, "Product deleted");
        Ok(response)
    }

    /// Flip a product's featured flag.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn toggle_featured(&self, id: ProductId) -> Result<FeaturedToggle, ApiError> {
        let url = self.client.url(&format!("/products/{id}/toggle-featured"))?;
        let toggled = self.send(Method::PUT, url).await?;
        self.client.invalidate_catalog();
        Ok(toggled)
    }

    /// Reactivate a soft-deleted product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the product is already active.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn restore_product(&self, id: ProductId) -> Result<MessageResponse, ApiError> {
        let url = self.client.url(&format!("/products/{id}/restore"))?;
        let response = self.send(Method::POST, url).await?;
        self.client.invalidate_catalog();
        Ok(response)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` without a valid name, or
    /// `ApiError::Status` if the name is taken.
    #[instrument(skip(self, category))]
    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category, ApiError> {
        category.validate(true)?;
        let url = self.client.url("/products/categories")?;
        let created = self.send_json(Method::POST, url, category).await?;
        self.client.invalidate_catalog();
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown category.
    #[instrument(skip(self, category), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        category: &CategoryInput,
    ) -> Result<Category, ApiError> {
        category.validate(false)?;
        let url = self.client.url(&format!("/products/categories/{id}"))?;
        let updated = self.send_json(Method::PUT, url, category).await?;
        self.client.invalidate_catalog();
        Ok(updated)
    }

    /// Delete a category that no product uses.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` while products still reference it.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<MessageResponse, ApiError> {
        let url = self.client.url(&format!("/products/categories/{id}"))?;
        let response = self.send(Method::DELETE, url).await?;
        self.client.invalidate_catalog();
        Ok(response)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Every customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for a non-admin token.
    #[instrument(skip(self))]
    pub async fn all_orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.client.url("/admin/orders")?;
        self.send(Method::GET, url).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown order.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let url = self.client.url(&format!("/admin/orders/{id}"))?;
        let order = self
            .send_json(Method::PUT, url, &OrderStatusUpdate { status })
            .await?;
        info!("Order status updated");
        Ok(order)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Revenue, counts and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for a non-admin token.
    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        let url = self.client.url("/admin/stats")?;
        self.send(Method::GET, url).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when `limit` is outside
    /// `1..=ProductQuery::MAX_LIMIT`.
    #[instrument(skip(self))]
    pub async fn users(&self, skip: u32, limit: u32) -> Result<UserPage, ApiError> {
        if !(1..=ProductQuery::MAX_LIMIT).contains(&limit) {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {}",
                ProductQuery::MAX_LIMIT
            )));
        }
        let mut url = self.client.url("/admin/users")?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        self.send(Method::GET, url).await
    }

    /// Grant or revoke admin rights.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown user, or a 400 when
    /// targeting your own account.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn toggle_user_admin(&self, id: UserId) -> Result<UserToggle, ApiError> {
        let url = self.client.url(&format!("/admin/users/{id}/toggle-admin"))?;
        let toggled: UserToggle = self.send(Method::PUT, url).await?;
        info!(is_admin = ?toggled.is_admin, "User admin flag toggled");
        Ok(toggled)
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown user, or a 400 when
    /// targeting your own account.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn toggle_user_active(&self, id: UserId) -> Result<UserToggle, ApiError> {
        let url = self.client.url(&format!("/admin/users/{id}/toggle-active"))?;
        let toggled: UserToggle = self.send(Method::PUT, url).await?;
        info!(is_active = ?toggled.is_active, "User active flag toggled");
        Ok(toggled)
    }
}
