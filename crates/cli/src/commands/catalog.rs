//! Catalog commands: products, categories and reviews.

use std::io::{self, Write};

use shopswift_client::api::{ProductQuery, ReviewInput};
use shopswift_core::ProductId;

use super::{CommandError, Context, output};

/// # Errors
///
/// Returns an error for an invalid query or if the API request fails.
pub async fn products(ctx: &Context, query: &ProductQuery) -> Result<(), CommandError> {
    let page = ctx.api.products(query).await?;
    output::product_page(&mut io::stdout().lock(), &page)?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the API request fails.
pub async fn featured(ctx: &Context, limit: u32) -> Result<(), CommandError> {
    let products = ctx.api.featured_products(limit).await?;
    output::product_list(&mut io::stdout().lock(), &products)?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the product does not exist.
pub async fn product(ctx: &Context, id: ProductId) -> Result<(), CommandError> {
    let detail = ctx.api.product(id).await?;
    let image = ctx.api.image_url(detail.product.image.as_deref());
    output::product_detail(&mut io::stdout().lock(), &detail, image.as_deref())?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the API request fails.
pub async fn categories(ctx: &Context) -> Result<(), CommandError> {
    let categories = ctx.api.categories().await?;
    output::categories(&mut io::stdout().lock(), &categories)?;
    Ok(())
}

/// Post a review as the signed-in user.
///
/// # Errors
///
/// Returns an error without a session, for an invalid rating, or if the
/// user already reviewed the product.
pub async fn review(
    ctx: &Context,
    product_id: ProductId,
    rating: u8,
    comment: Option<String>,
) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let review = ReviewInput { rating, comment };
    let created = ctx
        .api
        .authorized(&token)
        .create_review(product_id, &review)
        .await?;

    writeln!(
        io::stdout().lock(),
        "Review #{} saved ({}/5)",
        created.id,
        created.rating
    )?;
    Ok(())
}
