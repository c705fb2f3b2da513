//! ShopSwift CLI - Browse, shop and administer a ShopSwift store.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from SHOPSWIFT_PASSWORD, or typed on stdin)
//! swift login -e ada@example.com
//!
//! # Browse the catalog
//! swift products --search lamp --sort price --order asc
//! swift product 7
//!
//! # Shop
//! swift cart add 7 --quantity 2
//! swift checkout --address "1 Main St, Springfield" --place
//! swift orders
//!
//! # Administer
//! swift admin product create --name "Desk Lamp" --price 49.99 --stock 10
//! swift admin order status 12 shipped
//! swift admin stats
//! swift admin user toggle-active 4
//! ```
//!
//! # Commands
//!
//! - `login` / `register` / `logout` / `whoami` - Session
//! - `products` / `product` / `featured` / `categories` / `review` - Catalog
//! - `cart` - Cart management
//! - `checkout` / `orders` - Checkout and order history
//! - `admin` - Product, category, order and user management, dashboard stats

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use shopswift_core::{CartItemId, CategoryId, OrderId, OrderStatus, ProductId, UserId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "swift")]
#[command(author, version, about = "ShopSwift command-line storefront")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,
    },
    /// Create an account and sign in
    Register {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Full name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// List products
    Products(ProductArgs),
    /// Show one product with its reviews
    Product {
        id: ProductId,
    },
    /// List featured products
    Featured {
        #[arg(short, long, default_value_t = 8)]
        limit: u32,
    },
    /// List categories
    Categories,
    /// Review a product
    Review {
        product_id: ProductId,

        /// Rating from 1 to 5
        #[arg(short, long)]
        rating: u8,

        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Review totals and place an order
    Checkout {
        /// Shipping address
        #[arg(short, long)]
        address: Option<String>,

        /// Place the order (otherwise only show totals)
        #[arg(long, requires = "address")]
        place: bool,
    },
    /// Show order history, or one order
    Orders {
        id: Option<OrderId>,
    },
    /// Store administration
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Args)]
struct ProductArgs {
    /// Search names and descriptions
    #[arg(short, long)]
    search: Option<String>,

    #[arg(short, long)]
    category: Option<CategoryId>,

    #[arg(long)]
    min_price: Option<Decimal>,

    #[arg(long)]
    max_price: Option<Decimal>,

    /// `price`, `name`, `created_at` or `rating`
    #[arg(long)]
    sort: Option<String>,

    /// `asc` or `desc`
    #[arg(long)]
    order: Option<String>,

    /// Only featured products
    #[arg(long)]
    featured: bool,

    /// Page number, from 1
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    per_page: u32,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: i32,
    },
    /// Change a line's quantity
    Update { item_id: CartItemId, quantity: i32 },
    /// Remove a line
    Remove { item_id: CartItemId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Manage products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Show dashboard figures
    Stats,
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create a product
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        price: Decimal,

        #[arg(short, long, default_value_t = 0)]
        stock: i32,

        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(short, long)]
        description: Option<String>,

        /// Image path or URL
        #[arg(long)]
        image: Option<String>,

        #[arg(long)]
        featured: bool,
    },
    /// Update a product
    Update {
        id: ProductId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        price: Option<Decimal>,

        #[arg(short, long)]
        stock: Option<i32>,

        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        image: Option<String>,

        #[arg(long)]
        active: Option<bool>,
    },
    /// Deactivate a product (or delete it with --permanent)
    Delete {
        id: ProductId,

        #[arg(long)]
        permanent: bool,
    },
    /// Flip a product's featured flag
    ToggleFeatured { id: ProductId },
    /// Reactivate a deactivated product
    Restore { id: ProductId },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Create a category
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Update a category
    Update {
        id: CategoryId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete an unused category
    Delete { id: CategoryId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List every customer's orders
    List,
    /// Set an order's status
    Status { id: OrderId, status: OrderStatus },
}

#[derive(Subcommand)]
enum UserAction {
    /// List accounts
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
    /// Grant or revoke admin rights
    ToggleAdmin { id: UserId },
    /// Activate or deactivate an account
    ToggleActive { id: UserId },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing with `EnvFilter`; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "shopswift_client=debug,shopswift_cli=debug"
    } else {
        "shopswift_client=info,shopswift_cli=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::from_env()?;

    match cli.command {
        Commands::Login { email } => commands::auth::login(&ctx, &email).await?,
        Commands::Register { email, name } => {
            commands::auth::register(&ctx, &email, name.as_deref()).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx)?,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Products(args) => {
            let query = args.into_query()?;
            commands::catalog::products(&ctx, &query).await?;
        }
        Commands::Product { id } => commands::catalog::product(&ctx, id).await?,
        Commands::Featured { limit } => commands::catalog::featured(&ctx, limit).await?,
        Commands::Categories => commands::catalog::categories(&ctx).await?,
        Commands::Review {
            product_id,
            rating,
            comment,
        } => commands::catalog::review(&ctx, product_id, rating, comment).await?,
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, product_id, quantity).await?,
            CartAction::Update { item_id, quantity } => {
                commands::cart::update(&ctx, item_id, quantity).await?;
            }
            CartAction::Remove { item_id } => commands::cart::remove(&ctx, item_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Checkout { address, place } => {
            commands::checkout::checkout(&ctx, address.as_deref(), place).await?;
        }
        Commands::Orders { id } => match id {
            Some(id) => commands::checkout::order(&ctx, id).await?,
            None => commands::checkout::orders(&ctx).await?,
        },
        Commands::Admin { action } => run_admin(&ctx, action).await?,
    }
    Ok(())
}

async fn run_admin(
    ctx: &commands::Context,
    action: AdminAction,
) -> Result<(), commands::CommandError> {
    use commands::admin;
    use shopswift_client::api::{CategoryInput, NewProduct, ProductUpdate};

    match action {
        AdminAction::Product { action } => match action {
            ProductAction::Create {
                name,
                price,
                stock,
                category,
                description,
                image,
                featured,
            } => {
                let product = NewProduct {
                    name,
                    description,
                    price,
                    stock_quantity: stock,
                    category_id: category,
                    image,
                    is_featured: featured,
                };
                admin::create_product(ctx, &product).await
            }
            ProductAction::Update {
                id,
                name,
                price,
                stock,
                category,
                description,
                image,
                active,
            } => {
                let update = ProductUpdate {
                    name,
                    description,
                    price,
                    stock_quantity: stock,
                    category_id: category,
                    image,
                    is_featured: None,
                    is_active: active,
                };
                admin::update_product(ctx, id, &update).await
            }
            ProductAction::Delete { id, permanent } => {
                admin::delete_product(ctx, id, permanent).await
            }
            ProductAction::ToggleFeatured { id } => admin::toggle_featured(ctx, id).await,
            ProductAction::Restore { id } => admin::restore_product(ctx, id).await,
        },
        AdminAction::Category { action } => match action {
            CategoryAction::Create { name, description } => {
                let category = CategoryInput {
                    description,
                    ..CategoryInput::named(name)
                };
                admin::create_category(ctx, &category).await
            }
            CategoryAction::Update {
                id,
                name,
                description,
                active,
            } => {
                let category = CategoryInput {
                    name,
                    description,
                    is_active: active,
                };
                admin::update_category(ctx, id, &category).await
            }
            CategoryAction::Delete { id } => admin::delete_category(ctx, id).await,
        },
        AdminAction::Order { action } => match action {
            OrderAction::List => admin::all_orders(ctx).await,
            OrderAction::Status { id, status } => {
                admin::update_order_status(ctx, id, status).await
            }
        },
        AdminAction::User { action } => match action {
            UserAction::List { page, per_page } => {
                let skip = (page.max(1) - 1).saturating_mul(per_page);
                admin::users(ctx, skip, per_page).await
            }
            UserAction::ToggleAdmin { id } => admin::toggle_user_admin(ctx, id).await,
            UserAction::ToggleActive { id } => admin::toggle_user_active(ctx, id).await,
        },
        AdminAction::Stats => admin::stats(ctx).await,
    }
}

impl ProductArgs {
    fn into_query(self) -> Result<shopswift_client::api::ProductQuery, commands::CommandError> {
        use shopswift_client::api::{ProductQuery, SortBy, SortOrder};

        let mut query = ProductQuery::default();
        if let Some(search) = self.search {
            query = query.search(search);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        query = query.price_range(self.min_price, self.max_price);

        let sort_by = self
            .sort
            .as_deref()
            .map(str::parse::<SortBy>)
            .transpose()
            .map_err(commands::CommandError::InvalidArgument)?;
        let order = match self.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => None,
            Some("asc") => Some(SortOrder::Asc),
            Some("desc") => Some(SortOrder::Desc),
            Some(other) => {
                return Err(commands::CommandError::InvalidArgument(format!(
                    "invalid sort order: {other}"
                )));
            }
        };
        query.sort_by = sort_by;
        query.order = order;

        if self.featured {
            query = query.featured_only();
        }

        let page = self.page.max(1);
        let skip = (page - 1).saturating_mul(self.per_page);
        Ok(query.page(skip, self.per_page))
    }
}
