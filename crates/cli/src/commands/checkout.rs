//! Checkout and order history.

use std::io::{self, Write};

use shopswift_client::api::NewOrder;
use shopswift_core::{OrderId, calculate_totals};

use super::{CommandError, Context, output};

/// Show the cart with checkout totals and optionally place the order.
///
/// # Errors
///
/// Returns an error without a session, for an empty cart when placing, or
/// if the server refuses the order.
pub async fn checkout(ctx: &Context, address: Option<&str>, place: bool) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let api = ctx.api.authorized(&token);
    let cart = api.cart().await?;

    if cart.is_empty() {
        writeln!(io::stdout().lock(), "Your cart is empty.")?;
        return Ok(());
    }

    let pricing = ctx.config.checkout_pricing();
    let totals = calculate_totals(&cart.line_items(), &pricing)?;
    {
        let mut out = io::stdout().lock();
        output::cart(&mut out, &cart)?;
        output::totals(&mut out, &totals, pricing.tax_rate)?;
    }

    if !place {
        writeln!(
            io::stdout().lock(),
            "\nRun again with --address \"...\" --place to order."
        )?;
        return Ok(());
    }

    let address = address.ok_or_else(|| {
        CommandError::InvalidArgument("--place needs --address".to_owned())
    })?;
    let order = api.place_order(&NewOrder::new(address)).await?;

    let mut out = io::stdout().lock();
    writeln!(out, "\nOrder placed.")?;
    output::order_detail(&mut out, &order)?;
    Ok(())
}

/// # Errors
///
/// Returns an error without a session or if the API request fails.
pub async fn orders(ctx: &Context) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let orders = ctx.api.authorized(&token).orders().await?;
    output::order_summary(&mut io::stdout().lock(), &orders)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown order.
pub async fn order(ctx: &Context, id: OrderId) -> Result<(), CommandError> {
    let token = ctx.signed_in().await?;
    let order = ctx.api.authorized(&token).order(id).await?;
    output::order_detail(&mut io::stdout().lock(), &order)?;
    Ok(())
}
