//! Request and response types for the ShopSwift REST API.
//!
//! Prices travel as JSON numbers and are held as [`Decimal`]; timestamps
//! come back either as RFC 3339 or as naive UTC and are normalized to
//! `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopswift_core::{
    CartId, CartItemId, CategoryId, LineItem, OrderId, OrderItemId, OrderStatus, ProductId,
    ReviewId, User, UserId,
};

use super::ApiError;

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product_count: Option<i64>,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Image path, relative to the asset origin or absolute.
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Name of the product's category, if it was embedded in the response.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}

/// A product with its reviews, from `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// One page of the product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

impl ProductPage {
    /// Whether more products exist past this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.skip + i64::try_from(self.data.len()).unwrap_or(i64::MAX) < self.total
    }
}

/// Sort field for the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortBy {
    Price,
    Name,
    #[default]
    CreatedAt,
    Rating,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::Rating => "rating",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(Self::Price),
            "name" => Ok(Self::Name),
            "created_at" | "newest" => Ok(Self::CreatedAt),
            "rating" => Ok(Self::Rating),
            other => Err(format!("invalid sort field: {other}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters and paging for `GET /products`.
///
/// Unset fields are left to the server defaults (first 20, newest first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProductQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<SortBy>,
    pub order: Option<SortOrder>,
    pub featured_only: bool,
}

impl ProductQuery {
    pub const MAX_LIMIT: u32 = 100;

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    #[must_use]
    pub const fn category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    #[must_use]
    pub const fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    #[must_use]
    pub const fn sort(mut self, by: SortBy, order: SortOrder) -> Self {
        self.sort_by = Some(by);
        self.order = Some(order);
        self
    }

    #[must_use]
    pub const fn featured_only(mut self) -> Self {
        self.featured_only = true;
        self
    }

    /// Reject values the server would answer with a 422.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` describing the first bad field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(limit) = self.limit
            && !(1..=Self::MAX_LIMIT).contains(&limit)
        {
            return Err(invalid(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        for (name, price) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
                return Err(invalid(format!("{name} must not be negative")));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(invalid("min_price must not exceed max_price"));
        }
        Ok(())
    }

    /// Query string pairs in the order the server documents them.
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(id) = self.category_id {
            pairs.push(("category_id", id.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.normalize().to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.normalize().to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            pairs.push(("sort_by", sort_by.as_str().to_owned()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_owned()));
        }
        if self.featured_only {
            pairs.push(("featured_only", "true".to_owned()));
        }
        pairs
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// Public profile of a review's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<ReviewAuthor>,
}

impl Review {
    /// Who wrote the review, for display.
    #[must_use]
    pub fn author(&self) -> &str {
        self.user
            .as_ref()
            .map_or("Anonymous", |u| u.full_name.as_deref().unwrap_or(&u.email))
    }
}

/// Body for creating or updating a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewInput {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewInput {
    pub const MAX_COMMENT_LENGTH: usize = 1000;

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a rating outside 1..=5 or an
    /// overlong comment.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(1..=5).contains(&self.rating) {
            return Err(invalid("rating must be between 1 and 5"));
        }
        if self
            .comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > Self::MAX_COMMENT_LENGTH)
        {
            return Err(invalid(format!(
                "comment must be at most {} characters",
                Self::MAX_COMMENT_LENGTH
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: i32,
    #[serde(with = "timestamp")]
    pub added_at: DateTime<Utc>,
}

/// The signed-in user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Snapshot the cart as calculator input, priced at the current
    /// product prices.
    #[must_use]
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .map(|item| LineItem::new(item.product.price, i64::from(item.quantity)))
            .collect()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// One line of a placed order, priced at the time of purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: Product,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    pub shipping_address: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The order's lines as calculator input, at purchase prices.
    #[must_use]
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .map(|item| LineItem::new(item.price, i64::from(item.quantity)))
            .collect()
    }
}

/// Body for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub shipping_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl NewOrder {
    #[must_use]
    pub fn new(shipping_address: impl Into<String>) -> Self {
        Self {
            shipping_address: shipping_address.into(),
            payment_intent_id: None,
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when the address is blank.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.shipping_address.trim().is_empty() {
            return Err(invalid("shipping address is required"));
        }
        Ok(())
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Body for `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock_quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_featured: bool,
}

/// Partial update for `PUT /products/{id}`; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

const MAX_PRODUCT_NAME: usize = 200;
const MAX_CATEGORY_NAME: usize = 100;
const MAX_CATEGORY_DESCRIPTION: usize = 500;

fn check_product_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_PRODUCT_NAME {
        return Err(invalid(format!(
            "product name must be between 1 and {MAX_PRODUCT_NAME} characters"
        )));
    }
    Ok(())
}

fn check_price(price: Decimal) -> Result<(), ApiError> {
    if price <= Decimal::ZERO {
        return Err(invalid("price must be greater than 0"));
    }
    Ok(())
}

fn check_stock(stock: i32) -> Result<(), ApiError> {
    if stock < 0 {
        return Err(invalid("stock quantity must not be negative"));
    }
    Ok(())
}

impl NewProduct {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a bad name, price or stock.
    pub fn validate(&self) -> Result<(), ApiError> {
        check_product_name(&self.name)?;
        check_price(self.price)?;
        check_stock(self.stock_quantity)
    }
}

impl ProductUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a bad field or an empty update.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(invalid("nothing to update"));
        }
        if let Some(name) = &self.name {
            check_product_name(name)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(stock) = self.stock_quantity {
            check_stock(stock)?;
        }
        Ok(())
    }
}

/// Result of `PUT /products/{id}/toggle-featured`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedToggle {
    pub id: ProductId,
    pub name: String,
    pub is_featured: bool,
}

/// Body for creating or updating a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl CategoryInput {
    /// A new category with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a bad name or description, or
    /// when creating without a name.
    pub fn validate(&self, creating: bool) -> Result<(), ApiError> {
        match &self.name {
            Some(name) => {
                let len = name.trim().chars().count();
                if len == 0 || len > MAX_CATEGORY_NAME {
                    return Err(invalid(format!(
                        "category name must be between 1 and {MAX_CATEGORY_NAME} characters"
                    )));
                }
            }
            None if creating => return Err(invalid("category name is required")),
            None => {}
        }
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_CATEGORY_DESCRIPTION)
        {
            return Err(invalid(format!(
                "category description must be at most {MAX_CATEGORY_DESCRIPTION} characters"
            )));
        }
        Ok(())
    }
}

/// Body for `PUT /admin/orders/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Plain `{message}` acknowledgement returned by most mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Dashboard figures from `GET /admin/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub active_products: i64,
    pub total_users: i64,
    #[serde(default)]
    pub recent_orders: Vec<RecentOrder>,
}

/// One row of the dashboard's recent order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentOrder {
    pub id: OrderId,
    pub user_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One page of `GET /admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    pub data: Vec<User>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Result of the admin and active toggles on `/admin/users/{id}`.
///
/// Each toggle reports only the flag it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToggle {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::InvalidInput(message.into())
}

// =============================================================================
// Timestamps
// =============================================================================

/// Lenient timestamp (de)serialization.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC);
/// always writes RFC 3339.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::parse(&raw).ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                    })
                })
                .transpose()
        }
    }
}
