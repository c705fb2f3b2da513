//! Cart commands.

use std::io::{self, Write};

use shopswift_client::api::Cart;
use shopswift_core::{CartItemId, ProductId, calculate_totals};

use super::{CommandError, Context, output};

/// Render the cart followed by its totals (tax, no shipping).
fn render(ctx: &Context, cart: &Cart) -> Result<(), CommandError> {
    let mut out = io::stdout().lock();
    output::cart(&mut out, cart)?;
    if !cart.is_empty() {
        let pricing = ctx.config.cart_pricing();
        let totals = calculate_totals(&cart.line_items(), &pricing)?;
        output::totals(&mut out, &totals, pricing.tax_rate)?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error without a session or if the API request fails.
pub async fn show(ctx: &Context) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let cart = ctx.api.authorized(&token).cart().await?;
    render(ctx, &cart)
}

/// # Errors
///
/// Returns an error for an unknown product or insufficient stock.
pub async fn add(ctx: &Context, product_id: ProductId, quantity: i32) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let api = ctx.api.authorized(&token);
    let ack = api.add_to_cart(product_id, quantity).await?;
    writeln!(io::stdout().lock(), "{}", ack.message)?;
    render(ctx, &api.cart().await?)
}

/// # Errors
///
/// Returns an error for a quantity below 1 or an unknown line.
pub async fn update(ctx: &Context, item_id: CartItemId, quantity: i32) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let api = ctx.api.authorized(&token);
    api.update_cart_item(item_id, quantity).await?;
    render(ctx, &api.cart().await?)
}

/// # Errors
///
/// Returns an error for an unknown line.
pub async fn remove(ctx: &Context, item_id: CartItemId) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let api = ctx.api.authorized(&token);
    api.remove_cart_item(item_id).await?;
    render(ctx, &api.cart().await?)
}

/// # Errors
///
/// Returns an error if the API request fails.
pub async fn clear(ctx: &Context) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let ack = ctx.api.authorized(&token).clear_cart().await?;
    writeln!(io::stdout().lock(), "{}", ack.message)?;
    Ok(())
}
