//! Plain-text renderers.
//!
//! Every renderer writes to an `impl Write` so tests can capture output.

use std::io::{self, Write};

use rust_decimal::Decimal;
use shopswift_client::api::{
    AdminStats, Cart, Category, Order, Product, ProductDetail, ProductPage, UserPage, UserToggle,
};
use shopswift_client::{Notice, NoticeLevel};
use shopswift_core::{LineItem, Money, OrderTotals, User};

pub fn notice(out: &mut impl Write, notice: &Notice) -> io::Result<()> {
    let marker = match notice.level {
        NoticeLevel::Success => "✓",
        NoticeLevel::Info => "i",
        NoticeLevel::Error => "✗",
    };
    writeln!(out, "{marker} {notice}")
}

pub fn user(out: &mut impl Write, user: &User) -> io::Result<()> {
    writeln!(out, "{} <{}>", user.display_name(), user.email)?;
    writeln!(out, "  id: {}", user.id)?;
    if user.is_admin {
        writeln!(out, "  role: admin")?;
    }
    Ok(())
}

fn rating(product: &Product) -> String {
    match (product.average_rating, product.review_count) {
        (Some(avg), Some(count)) if count > 0 => format!("{avg:.1}★ ({count})"),
        _ => "no reviews".to_owned(),
    }
}

fn stock(product: &Product) -> String {
    if product.in_stock() {
        format!("{} in stock", product.stock_quantity)
    } else {
        "out of stock".to_owned()
    }
}

pub fn product_list(out: &mut impl Write, products: &[Product]) -> io::Result<()> {
    if products.is_empty() {
        return writeln!(out, "No products found.");
    }
    for product in products {
        let featured = if product.is_featured { " *" } else { "" };
        writeln!(
            out,
            "#{:<5} {:<40} {:>12}  {}  {}{featured}",
            product.id,
            product.name,
            Money::new(product.price).to_string(),
            stock(product),
            rating(product),
        )?;
    }
    Ok(())
}

pub fn product_page(out: &mut impl Write, page: &ProductPage) -> io::Result<()> {
    product_list(out, &page.data)?;
    if !page.data.is_empty() {
        let first = page.skip + 1;
        let last = page.skip + i64::try_from(page.data.len()).unwrap_or(0);
        writeln!(out, "\nShowing {first}-{last} of {}", page.total)?;
        if page.has_more() {
            writeln!(out, "More results: use --page")?;
        }
    }
    Ok(())
}

pub fn product_detail(
    out: &mut impl Write,
    detail: &ProductDetail,
    image_url: Option<&str>,
) -> io::Result<()> {
    let product = &detail.product;
    writeln!(out, "{} (#{})", product.name, product.id)?;
    writeln!(out, "  Price:    {}", Money::new(product.price))?;
    writeln!(out, "  Stock:    {}", stock(product))?;
    if let Some(category) = product.category_name() {
        writeln!(out, "  Category: {category}")?;
    }
    writeln!(out, "  Rating:   {}", rating(product))?;
    if let Some(url) = image_url {
        writeln!(out, "  Image:    {url}")?;
    }
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        writeln!(out, "\n{description}")?;
    }
    if !detail.reviews.is_empty() {
        writeln!(out, "\nReviews:")?;
        for review in &detail.reviews {
            writeln!(
                out,
                "  {}/5 by {} on {}",
                review.rating,
                review.author(),
                review.created_at.format("%Y-%m-%d")
            )?;
            if let Some(comment) = &review.comment {
                writeln!(out, "    {comment}")?;
            }
        }
    }
    Ok(())
}

pub fn categories(out: &mut impl Write, categories: &[Category]) -> io::Result<()> {
    if categories.is_empty() {
        return writeln!(out, "No categories.");
    }
    for category in categories {
        let count = category.product_count.unwrap_or(0);
        let inactive = if category.is_active == Some(false) {
            " (inactive)"
        } else {
            ""
        };
        writeln!(
            out,
            "#{:<5} {:<30} {count} products{inactive}",
            category.id, category.name
        )?;
    }
    Ok(())
}

/// Totals as a right-aligned two-column block.
pub fn totals(out: &mut impl Write, totals: &OrderTotals, tax_rate: Decimal) -> io::Result<()> {
    for (label, amount) in totals.display(tax_rate) {
        writeln!(out, "{label:>20}  {amount:>12}")?;
    }
    Ok(())
}

pub fn cart(out: &mut impl Write, cart: &Cart) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty.");
    }
    for item in &cart.items {
        let line_total = LineItem::new(item.product.price, i64::from(item.quantity))
            .line_total()
            .map_or_else(|| "overflow".to_owned(), |total| Money::new(total).to_string());
        writeln!(
            out,
            "[{:<4}] {:<40} {:>3} x {:>10} = {:>12}",
            item.id,
            item.product.name,
            item.quantity,
            Money::new(item.product.price).to_string(),
            line_total,
        )?;
    }
    writeln!(out)
}

pub fn order_summary(out: &mut impl Write, orders: &[Order]) -> io::Result<()> {
    if orders.is_empty() {
        return writeln!(out, "No orders yet.");
    }
    for order in orders {
        writeln!(
            out,
            "#{:<5} {}  {:<10} {:>3} items  {:>12}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status.label(),
            order.items.len(),
            Money::new(order.total_amount).to_string(),
        )?;
    }
    Ok(())
}

pub fn order_detail(out: &mut impl Write, order: &Order) -> io::Result<()> {
    writeln!(
        out,
        "Order #{} - {} ({})",
        order.id,
        order.status.label(),
        order.created_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(out, "Ship to: {}", order.shipping_address)?;
    writeln!(out)?;
    for item in &order.items {
        writeln!(
            out,
            "  {:<40} {:>3} x {:>10}",
            item.product.name,
            item.quantity,
            Money::new(item.price).to_string(),
        )?;
    }
    writeln!(out, "\n{:>20}  {:>12}", "Order total", Money::new(order.total_amount).to_string())
}

pub fn admin_stats(out: &mut impl Write, stats: &AdminStats) -> io::Result<()> {
    writeln!(out, "{:<16} {:>12}", "Revenue", Money::new(stats.total_revenue).to_string())?;
    writeln!(out, "{:<16} {:>12}", "Orders", stats.total_orders)?;
    writeln!(out, "{:<16} {:>12}", "Active products", stats.active_products)?;
    writeln!(out, "{:<16} {:>12}", "Users", stats.total_users)?;
    if stats.recent_orders.is_empty() {
        return Ok(());
    }
    writeln!(out, "\nRecent orders:")?;
    for order in &stats.recent_orders {
        writeln!(
            out,
            "#{:<5} {}  {:<30} {:<10} {:>12}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.user_email,
            order.status.label(),
            Money::new(order.total).to_string(),
        )?;
    }
    Ok(())
}

pub fn user_page(out: &mut impl Write, page: &UserPage) -> io::Result<()> {
    if page.data.is_empty() {
        return writeln!(out, "No users found.");
    }
    for user in &page.data {
        let mut flags = Vec::new();
        if user.is_admin {
            flags.push("admin");
        }
        if !user.is_active {
            flags.push("inactive");
        }
        writeln!(
            out,
            "#{:<5} {:<32} {:<24} {}",
            user.id,
            user.email,
            user.full_name.as_deref().unwrap_or("-"),
            flags.join(", "),
        )?;
    }
    let shown = i64::try_from(page.data.len()).unwrap_or(i64::MAX);
    writeln!(
        out,
        "\nShowing {}-{} of {}",
        page.skip + 1,
        page.skip + shown,
        page.total
    )
}

pub fn user_toggle(out: &mut impl Write, toggled: &UserToggle) -> io::Result<()> {
    if let Some(is_admin) = toggled.is_admin {
        let state = if is_admin { "now an admin" } else { "no longer an admin" };
        writeln!(out, "{} is {state}", toggled.email)?;
    }
    if let Some(is_active) = toggled.is_active {
        let state = if is_active { "active" } else { "deactivated" };
        writeln!(out, "{} is {state}", toggled.email)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopswift_core::{PricingConfig, UserId, calculate_totals};

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn product() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Desk Lamp",
            "price": 49.99,
            "stock_quantity": 0,
            "created_at": "2024-03-01T09:30:00",
            "average_rating": 4.5,
            "review_count": 4
        }))
        .unwrap()
    }

    #[test]
    fn test_notice_markers() {
        let text = render(|out| notice(out, &Notice::success("Login successful!")));
        assert_eq!(text, "✓ Login successful!\n");
        let text = render(|out| notice(out, &Notice::error("Invalid email or password")));
        assert!(text.starts_with('✗'));
    }

    #[test]
    fn test_product_list() {
        let text = render(|out| product_list(out, &[product()]));
        assert!(text.contains("Desk Lamp"));
        assert!(text.contains("$49.99"));
        assert!(text.contains("out of stock"));
        assert!(text.contains("4.5★ (4)"));

        let text = render(|out| product_list(out, &[]));
        assert_eq!(text, "No products found.\n");
    }

    #[test]
    fn test_checkout_totals_block() {
        let items = [
            LineItem::new(Decimal::new(4999, 2), 2),
            LineItem::new(Decimal::new(3001, 2), 1),
        ];
        let config = PricingConfig::checkout();
        let computed = calculate_totals(&items, &config).unwrap();
        let text = render(|out| totals(out, &computed, config.tax_rate));

        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Subtotal") && lines[0].ends_with("$129.99"));
        assert!(lines[1].starts_with("Tax (10%)") && lines[1].ends_with("$13.00"));
        assert!(lines[2].starts_with("Shipping") && lines[2].ends_with("Free"));
        assert!(lines[3].starts_with("Total") && lines[3].ends_with("$142.99"));
    }

    #[test]
    fn test_user() {
        let admin = User {
            id: UserId::new(1),
            email: "ada@example.com".to_owned(),
            full_name: Some("Ada Lovelace".to_owned()),
            is_admin: true,
            is_active: true,
        };
        let text = render(|out| user(out, &admin));
        assert!(text.starts_with("Ada Lovelace <ada@example.com>"));
        assert!(text.contains("role: admin"));
    }

    #[test]
    fn test_admin_stats() {
        let stats: AdminStats = serde_json::from_value(serde_json::json!({
            "total_revenue": 1250.5,
            "total_orders": 3,
            "active_products": 12,
            "total_users": 4,
            "recent_orders": [{
                "id": 3,
                "user_email": "ada@example.com",
                "total": 99.98,
                "status": "pending",
                "created_at": "2024-03-05T12:00:00"
            }]
        }))
        .unwrap();
        let text = render(|out| admin_stats(out, &stats));
        assert!(text.lines().next().unwrap().ends_with("$1,250.50"));
        assert!(text.contains("Recent orders:"));
        assert!(text.contains("ada@example.com"));
        assert!(text.contains("$99.98"));
    }

    #[test]
    fn test_user_page_flags() {
        let page = UserPage {
            data: vec![User {
                id: UserId::new(2),
                email: "grace@example.com".to_owned(),
                full_name: None,
                is_admin: true,
                is_active: false,
            }],
            total: 5,
            skip: 0,
            limit: 1,
        };
        let text = render(|out| user_page(out, &page));
        assert!(text.contains("admin, inactive"));
        assert!(text.ends_with("Showing 1-1 of 5\n"));
    }
}
