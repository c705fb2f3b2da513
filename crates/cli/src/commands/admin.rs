//! Admin commands. All of them require an admin account.

use std::io::{self, Write};

use shopswift_client::api::{CategoryInput, NewProduct, ProductUpdate};
use shopswift_core::{CategoryId, OrderId, OrderStatus, ProductId, UserId};

use super::{CommandError, Context, output};

/// # Errors
///
/// Returns an error for invalid product data or a non-admin session.
pub async fn create_product(ctx: &Context, product: &NewProduct) -> Result<(), CommandError> {
    let (token, admin) = ctx.admin().await?;
    let created = ctx.api.authorized(&token).create_product(product).await?;
    tracing::info!(admin = %admin.email, product_id = %created.id, "Created product");
    output::product_list(&mut io::stdout().lock(), std::slice::from_ref(&created))?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an empty or invalid update.
pub async fn update_product(
    ctx: &Context,
    id: ProductId,
    update: &ProductUpdate,
) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let updated = ctx.api.authorized(&token).update_product(id, update).await?;
    output::product_list(&mut io::stdout().lock(), std::slice::from_ref(&updated))?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown product.
pub async fn delete_product(ctx: &Context, id: ProductId, permanent: bool) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let ack = ctx.api.authorized(&token).delete_product(id, permanent).await?;
    writeln!(io::stdout().lock(), "{}", ack.message)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown product.
pub async fn toggle_featured(ctx: &Context, id: ProductId) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let toggled = ctx.api.authorized(&token).toggle_featured(id).await?;
    let state = if toggled.is_featured {
        "now featured"
    } else {
        "no longer featured"
    };
    writeln!(io::stdout().lock(), "{} is {state}", toggled.name)?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the product is already active.
pub async fn restore_product(ctx: &Context, id: ProductId) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let ack = ctx.api.authorized(&token).restore_product(id).await?;
    writeln!(io::stdout().lock(), "{}", ack.message)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for a missing or duplicate name.
pub async fn create_category(ctx: &Context, category: &CategoryInput) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let created = ctx.api.authorized(&token).create_category(category).await?;
    output::categories(&mut io::stdout().lock(), std::slice::from_ref(&created))?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown category.
pub async fn update_category(
    ctx: &Context,
    id: CategoryId,
    category: &CategoryInput,
) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let updated = ctx
        .api
        .authorized(&token)
        .update_category(id, category)
        .await?;
    output::categories(&mut io::stdout().lock(), std::slice::from_ref(&updated))?;
    Ok(())
}

/// # Errors
///
/// Returns an error while products still use the category.
pub async fn delete_category(ctx: &Context, id: CategoryId) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let ack = ctx.api.authorized(&token).delete_category(id).await?;
    writeln!(io::stdout().lock(), "{}", ack.message)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for a non-admin session.
pub async fn all_orders(ctx: &Context) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let orders = ctx.api.authorized(&token).all_orders().await?;
    output::order_summary(&mut io::stdout().lock(), &orders)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown order.
pub async fn update_order_status(
    ctx: &Context,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let order = ctx
        .api
        .authorized(&token)
        .update_order_status(id, status)
        .await?;
    writeln!(
        io::stdout().lock(),
        "Order #{} is now {}",
        order.id,
        order.status.label()
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error for a non-admin session.
pub async fn stats(ctx: &Context) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let stats = ctx.api.authorized(&token).admin_stats().await?;
    output::admin_stats(&mut io::stdout().lock(), &stats)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for a page size over the server's limit.
pub async fn users(ctx: &Context, skip: u32, limit: u32) -> Result<(), CommandError> {
    let (token, _) = ctx.admin().await?;
    let page = ctx.api.authorized(&token).users(skip, limit).await?;
    output::user_page(&mut io::stdout().lock(), &page)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown user or your own account.
pub async fn toggle_user_admin(ctx: &Context, id: UserId) -> Result<(), CommandError> {
    let (token, admin) = ctx.admin().await?;
    let toggled = ctx.api.authorized(&token).toggle_user_admin(id).await?;
    tracing::info!(admin = %admin.email, user_id = %id, "Toggled admin rights");
    output::user_toggle(&mut io::stdout().lock(), &toggled)?;
    Ok(())
}

/// # Errors
///
/// Returns an error for an unknown user or your own account.
pub async fn toggle_user_active(ctx: &Context, id: UserId) -> Result<(), CommandError> {
    let (token, admin) = ctx.admin().await?;
    let toggled = ctx.api.authorized(&token).toggle_user_active(id).await?;
    tracing::info!(admin = %admin.email, user_id = %id, "Toggled account status");
    output::user_toggle(&mut io::stdout().lock(), &toggled)?;
    Ok(())
}
