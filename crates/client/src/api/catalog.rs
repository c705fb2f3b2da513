//! Catalog endpoints: products, categories and reviews.
//!
//! Product and category reads are cached for five minutes. Search queries
//! are cached too, keyed by the full [`ProductQuery`].

use reqwest::Method;
use shopswift_core::{CategoryId, ProductId, ReviewId};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, MessageResponse, Product, ProductDetail, ProductPage, ProductQuery, Review,
    ReviewInput,
};
use super::{ApiClient, ApiError, Authorized};

/// Largest page the featured endpoint serves.
pub const MAX_FEATURED: u32 = 20;

impl ApiClient {
    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List active products.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an out-of-range query, or an
    /// error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        query.validate()?;
        let cache_key = CacheKey::Products(query.clone());

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.url("/products")?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let page: ProductPage = self.send(self.request(Method::GET, url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Featured products for the home page, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when `limit` is outside
    /// `1..=MAX_FEATURED`, or an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        if !(1..=MAX_FEATURED).contains(&limit) {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {MAX_FEATURED}"
            )));
        }
        let cache_key = CacheKey::Featured { limit };

        if let Some(CacheValue::Featured(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let mut url = self.url("/products/featured")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let products: Vec<Product> = self.send(self.request(Method::GET, url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Featured(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product with its reviews.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<ProductDetail, ApiError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.url(&format!("/products/{id}"))?;
        let product: ProductDetail = self.send(self.request(Method::GET, url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Reviews for a product, newest first.
    ///
    /// Not cached; reviews change as users post them.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_reviews(
        &self,
        id: ProductId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Review>, ApiError> {
        if !(1..=ProductQuery::MAX_LIMIT).contains(&limit) {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {}",
                ProductQuery::MAX_LIMIT
            )));
        }
        let mut url = self.url(&format!("/products/{id}/reviews"))?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        self.send(self.request(Method::GET, url)).await
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// All active categories with their product counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.url("/products/categories")?;
        let categories: Vec<Category> = self.send(self.request(Method::GET, url)).await?;

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Get a single category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the category does not exist.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: CategoryId) -> Result<Category, ApiError> {
        let cache_key = CacheKey::Category(id);

        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let url = self.url(&format!("/products/categories/{id}"))?;
        let category: Category = self.send(self.request(Method::GET, url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Category(Box::new(category.clone())))
            .await;

        Ok(category)
    }
}

// =============================================================================
// Reviews
// =============================================================================

impl Authorized<'_> {
    /// Review a product. One review per user per product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a bad rating or comment, or
    /// `ApiError::Status` if the user already reviewed the product.
    #[instrument(skip(self, review), fields(product_id = %product_id))]
    pub async fn create_review(
        &self,
        product_id: ProductId,
        review: &ReviewInput,
    ) -> Result<Review, ApiError> {
        review.validate()?;
        let url = self.client.url(&format!("/products/{product_id}/reviews"))?;
        let created: Review = self.send_json(Method::POST, url, review).await?;
        // Cached detail embeds the review list and rating
        self.client.inner.cache.invalidate(&CacheKey::Product(product_id)).await;
        Ok(created)
    }

    /// Edit one of the user's own reviews.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for someone else's review.
    #[instrument(skip(self, review), fields(review_id = %review_id))]
    pub async fn update_review(
        &self,
        review_id: ReviewId,
        review: &ReviewInput,
    ) -> Result<Review, ApiError> {
        review.validate()?;
        let url = self.client.url(&format!("/products/reviews/{review_id}"))?;
        let updated: Review = self.send_json(Method::PUT, url, review).await?;
        self.client
            .inner
            .cache
            .invalidate(&CacheKey::Product(updated.product_id))
            .await;
        Ok(updated)
    }

    /// Delete one of the user's own reviews.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for someone else's review.
    #[instrument(skip(self), fields(review_id = %review_id))]
    pub async fn delete_review(&self, review_id: ReviewId) -> Result<MessageResponse, ApiError> {
        let url = self.client.url(&format!("/products/reviews/{review_id}"))?;
        let response = self.send(Method::DELETE, url).await?;
        // The product id is unknown here
        self.client.invalidate_catalog();
        Ok(response)
    }
}
