//! Cache types for catalog responses.

use shopswift_core::{CategoryId, ProductId};

use super::types::{Category, Product, ProductDetail, ProductPage, ProductQuery};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(ProductQuery),
    Featured { limit: u32 },
    Product(ProductId),
    Categories,
    Category(CategoryId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(ProductPage),
    Featured(Vec<Product>),
    Product(Box<ProductDetail>),
    Categories(Vec<Category>),
    Category(Box<Category>),
}
