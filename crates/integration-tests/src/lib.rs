//! Integration test support for ShopSwift.
//!
//! [`FakeShop`] is an in-process `axum` stand-in for the ShopSwift REST API,
//! bound to an ephemeral port. Tests drive the real `reqwest` client and
//! session manager against it.
//!
//! # Example
//!
//! ```rust,ignore
//! let shop = FakeShop::start().await;
//! shop.add_user("ada@example.com", "secret", false);
//!
//! let api = shop.api_client();
//! let session = SessionManager::create(api.clone(), MemoryStore::new());
//! session.login("ada@example.com", &"secret".into()).await?;
//! ```
//!
//! Every request is counted by method and path (see [`FakeShop::hits`]) so
//! tests can tell whether the client went to the network.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Form, Path as UrlPath, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Value, json};
use shopswift_client::api::{
    ApiClient, Cart, CartItem, Category, Order, OrderItem, Product, ProductDetail, ProductPage,
    Review,
};
use shopswift_client::ClientConfig;
use shopswift_core::{
    CartId, CartItemId, CategoryId, OrderId, OrderItemId, OrderStatus, ProductId, ReviewId, User,
    UserId,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// =============================================================================
// Shop State
// =============================================================================

struct Account {
    user: User,
    password: String,
}

struct CartLine {
    id: CartItemId,
    product_id: ProductId,
    quantity: i32,
    added_at: DateTime<Utc>,
}

struct ShopData {
    accounts: Vec<Account>,
    tokens: HashMap<String, UserId>,
    categories: Vec<Category>,
    products: Vec<Product>,
    reviews: Vec<Review>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: Vec<(UserId, Order)>,
    hits: HashMap<String, usize>,
    next_id: i32,
    created_at: DateTime<Utc>,
}

impl Default for ShopData {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            tokens: HashMap::new(),
            categories: Vec::new(),
            products: Vec::new(),
            reviews: Vec::new(),
            carts: HashMap::new(),
            orders: Vec::new(),
            hits: HashMap::new(),
            next_id: 0,
            created_at: Utc::now(),
        }
    }
}

type Failure = (StatusCode, Json<Value>);

fn fail(status: StatusCode, detail: &str) -> Failure {
    (status, Json(json!({ "detail": detail })))
}

impl ShopData {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user_id: UserId) -> String {
        let token = format!("token-{}-{}", user_id, self.next_id());
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn grant(&mut self, user: User) -> Value {
        let token = self.issue_token(user.id);
        json!({ "access_token": token, "token_type": "bearer", "user": user })
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<User, Failure> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
        let user_id = self
            .tokens
            .get(token)
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))?;
        self.accounts
            .iter()
            .find(|account| account.user.id == *user_id)
            .map(|account| account.user.clone())
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }

    fn authenticate_admin(&self, headers: &HeaderMap) -> Result<User, Failure> {
        let user = self.authenticate(headers)?;
        if !user.is_admin {
            return Err(fail(StatusCode::FORBIDDEN, "Not enough permissions"));
        }
        Ok(user)
    }

    fn product(&self, id: ProductId) -> Result<&Product, Failure> {
        self.products
            .iter()
            .find(|product| product.id == id)
            .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product, Failure> {
        self.products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))
    }

    fn account_mut(&mut self, id: UserId) -> Result<&mut User, Failure> {
        self.accounts
            .iter_mut()
            .map(|account| &mut account.user)
            .find(|user| user.id == id)
            .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
    }

    fn cart(&self, user_id: UserId) -> Result<Cart, Failure> {
        let items = self
            .carts
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|line| {
                Ok(CartItem {
                    id: line.id,
                    product: self.product(line.product_id)?.clone(),
                    quantity: line.quantity,
                    added_at: line.added_at,
                })
            })
            .collect::<Result<Vec<_>, Failure>>()?;
        Ok(Cart {
            id: CartId::new(user_id.as_i32()),
            items,
            created_at: self.created_at,
            updated_at: Utc::now(),
        })
    }
}

#[derive(Clone, Default)]
struct SharedState(Arc<Mutex<ShopData>>);

impl SharedState {
    fn lock(&self) -> MutexGuard<'_, ShopData> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// FakeShop
// =============================================================================

/// A running fake of the ShopSwift REST API.
///
/// The server task is aborted when the value is dropped.
pub struct FakeShop {
    addr: SocketAddr,
    state: SharedState,
    server: JoinHandle<()>,
}

impl Drop for FakeShop {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeShop {
    /// Start the server on `127.0.0.1` with an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = SharedState::default();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake shop listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake shop address");

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake shop server stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the fake API, e.g. `http://127.0.0.1:41234/api`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self, token_file: &Path) -> ClientConfig {
        config_for(&self.api_url(), token_file)
    }

    /// An API client pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(&self.config(Path::new("unused-session.json")))
            .expect("Failed to build API client")
    }

    /// Register an account directly, bypassing the API.
    pub fn add_user(&self, email: &str, password: &str, is_admin: bool) -> User {
        let mut data = self.state.lock();
        let user = User {
            id: UserId::new(data.next_id()),
            email: email.to_owned(),
            full_name: None,
            is_admin,
            is_active: true,
        };
        data.accounts.push(Account {
            user: user.clone(),
            password: password.to_owned(),
        });
        user
    }

    /// Issue a valid token for an existing user.
    #[must_use]
    pub fn issue_token(&self, user_id: UserId) -> String {
        self.state.lock().issue_token(user_id)
    }

    /// Invalidate every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    pub fn add_category(&self, name: &str) -> CategoryId {
        let mut data = self.state.lock();
        let id = CategoryId::new(data.next_id());
        data.categories.push(Category {
            id,
            name: name.to_owned(),
            description: None,
            is_active: Some(true),
            created_at: Utc::now(),
            updated_at: None,
            product_count: Some(0),
        });
        id
    }

    /// Add an active product; `price` is a decimal string such as `"49.99"`.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a decimal.
    #[allow(clippy::expect_used)]
    pub fn add_product(&self, name: &str, price: &str, stock: i32) -> ProductId {
        let mut data = self.state.lock();
        let id = ProductId::new(data.next_id());
        data.products.push(Product {
            id,
            name: name.to_owned(),
            description: Some(format!("{name} description")),
            price: price.parse().expect("price must be a decimal"),
            stock_quantity: stock,
            category_id: None,
            image: Some(format!("/uploads/products/{id}.png")),
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
            category: None,
            average_rating: Some(0.0),
            review_count: Some(0),
        });
        id
    }

    /// Change a product behind the client's back.
    pub fn rename_product(&self, id: ProductId, name: &str) {
        let mut data = self.state.lock();
        if let Ok(product) = data.product_mut(id) {
            name.clone_into(&mut product.name);
        }
    }

    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<i32> {
        self.state.lock().product(id).ok().map(|p| p.stock_quantity)
    }

    /// How many times `"{METHOD} {path}"` was requested, e.g.
    /// `hits("GET /api/products")`.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.state.lock().hits.get(route).copied().unwrap_or(0)
    }

    /// Total number of requests served.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.state.lock().hits.values().sum()
    }
}

/// Configuration for an API at `api_url`.
///
/// # Panics
///
/// Panics if `api_url` is not a valid URL.
#[must_use]
#[allow(clippy::expect_used)]
pub fn config_for(api_url: &str, token_file: &Path) -> ClientConfig {
    let api_url = api_url.to_owned();
    let token_file = token_file.display().to_string();
    ClientConfig::from_lookup(|key| match key {
        "SHOPSWIFT_API_URL" => Some(api_url.clone()),
        "SHOPSWIFT_ASSET_URL" => Some(api_url.trim_end_matches("/api").to_owned()),
        "SHOPSWIFT_TOKEN_FILE" => Some(token_file.clone()),
        "SHOPSWIFT_TIMEOUT_SECS" => Some("5".to_owned()),
        _ => None,
    })
    .expect("Failed to build client configuration")
}

/// Base URL of an API that refuses connections: a port that was bound and
/// released.
///
/// # Panics
///
/// Panics if no local port can be bound.
#[allow(clippy::expect_used)]
pub async fn unreachable_api_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind scratch listener");
    let addr = listener.local_addr().expect("Failed to read scratch address");
    drop(listener);
    format!("http://{addr}/api")
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/auth/token", post(token))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/products", get(list_products).post(create_product))
        .route("/products/featured", get(featured_products))
        .route("/products/categories", get(list_categories))
        .route("/products/{id}", get(product_detail))
        .route("/products/{id}/reviews", post(create_review))
        .route("/products/{id}/toggle-featured", put(toggle_featured))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/{id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/{id}", get(get_order))
        .route("/admin/orders", get(all_orders))
        .route("/admin/orders/{id}", put(update_order_status))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/toggle-admin", put(toggle_user_admin))
        .route("/admin/users/{id}/toggle-active", put(toggle_user_active));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record_hit))
        .with_state(state)
}

async fn record_hit(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let route = format!("{} {}", request.method(), request.uri().path());
    *state.lock().hits.entry(route).or_default() += 1;
    next.run(request).await
}

type Reply = Result<Json<Value>, Failure>;

fn reply(value: impl serde::Serialize) -> Reply {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))
}

// --- auth --------------------------------------------------------------------

#[derive(Deserialize)]
struct TokenForm {
    username: String,
    password: String,
}

async fn token(State(state): State<SharedState>, Form(form): Form<TokenForm>) -> Reply {
    let mut data = state.lock();
    let user = data
        .accounts
        .iter()
        .find(|a| a.user.email == form.username && a.password == form.password)
        .map(|a| a.user.clone())
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    Ok(Json(data.grant(user)))
}

#[derive(Deserialize)]
struct RegisterBody {
    email: String,
    password: String,
    full_name: Option<String>,
}

async fn register(State(state): State<SharedState>, Json(body): Json<RegisterBody>) -> Reply {
    let mut data = state.lock();
    if data.accounts.iter().any(|a| a.user.email == body.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let user = User {
        id: UserId::new(data.next_id()),
        email: body.email,
        full_name: body.full_name,
        is_admin: false,
        is_active: true,
    };
    data.accounts.push(Account {
        user: user.clone(),
        password: body.password,
    });
    Ok(Json(data.grant(user)))
}

async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let user = state.lock().authenticate(&headers)?;
    reply(user)
}

// --- catalog -----------------------------------------------------------------

#[derive(Deserialize)]
struct ListParams {
    skip: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    category_id: Option<i32>,
    featured_only: Option<bool>,
}

async fn list_products(State(state): State<SharedState>, Query(params): Query<ListParams>) -> Reply {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let data = state.lock();
    let search = params.search.map(|s| s.to_lowercase());
    let matching: Vec<&Product> = data
        .products
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| !params.featured_only.unwrap_or(false) || p.is_featured)
        .filter(|p| params.category_id.is_none_or(|id| p.category_id == Some(CategoryId::new(id))))
        .filter(|p| {
            search
                .as_deref()
                .is_none_or(|term| p.name.to_lowercase().contains(term))
        })
        .collect();

    let page = ProductPage {
        data: matching
            .iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|p| (*p).clone())
            .collect(),
        total: i64::try_from(matching.len()).unwrap_or(i64::MAX),
        skip,
        limit,
    };
    reply(page)
}

async fn featured_products(State(state): State<SharedState>) -> Reply {
    let data = state.lock();
    let featured: Vec<&Product> = data
        .products
        .iter()
        .filter(|p| p.is_active && p.is_featured)
        .collect();
    reply(featured)
}

async fn list_categories(State(state): State<SharedState>) -> Reply {
    reply(&state.lock().categories)
}

async fn product_detail(State(state): State<SharedState>, UrlPath(id): UrlPath<i32>) -> Reply {
    let data = state.lock();
    let id = ProductId::new(id);
    let product = data.product(id)?.clone();
    let reviews = data
        .reviews
        .iter()
        .filter(|r| r.product_id == id)
        .cloned()
        .collect();
    reply(ProductDetail { product, reviews })
}

#[derive(Deserialize)]
struct ReviewBody {
    rating: u8,
    comment: Option<String>,
}

async fn create_review(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
    Json(body): Json<ReviewBody>,
) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    let product_id = ProductId::new(id);
    data.product(product_id)?;
    if data
        .reviews
        .iter()
        .any(|r| r.product_id == product_id && r.user_id == user.id)
    {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "You have already reviewed this product",
        ));
    }
    let review = Review {
        id: ReviewId::new(data.next_id()),
        user_id: user.id,
        product_id,
        rating: body.rating,
        comment: body.comment,
        created_at: Utc::now(),
        user: None,
    };
    data.reviews.push(review.clone());

    let ratings: Vec<f64> = data
        .reviews
        .iter()
        .filter(|r| r.product_id == product_id)
        .map(|r| f64::from(r.rating))
        .collect();
    let product = data.product_mut(product_id)?;
    #[allow(clippy::cast_precision_loss)]
    let average = ratings.iter().sum::<f64>() / ratings.len() as f64;
    product.average_rating = Some(average);
    product.review_count = Some(i64::try_from(ratings.len()).unwrap_or(i64::MAX));

    reply(review)
}

#[derive(Deserialize)]
struct NewProductBody {
    name: String,
    description: Option<String>,
    price: f64,
    stock_quantity: i32,
    category_id: Option<i32>,
    image: Option<String>,
    #[serde(default)]
    is_featured: bool,
}

async fn create_product(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<NewProductBody>,
) -> Reply {
    let mut data = state.lock();
    data.authenticate_admin(&headers)?;
    let price = Decimal::try_from(body.price)
        .map_err(|_| fail(StatusCode::UNPROCESSABLE_ENTITY, "invalid price"))?;
    let product = Product {
        id: ProductId::new(data.next_id()),
        name: body.name,
        description: body.description,
        price,
        stock_quantity: body.stock_quantity,
        category_id: body.category_id.map(CategoryId::new),
        image: body.image,
        is_featured: body.is_featured,
        is_active: true,
        created_at: Utc::now(),
        updated_at: None,
        category: None,
        average_rating: Some(0.0),
        review_count: Some(0),
    };
    data.products.push(product.clone());
    reply(product)
}

async fn toggle_featured(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
) -> Reply {
    let mut data = state.lock();
    data.authenticate_admin(&headers)?;
    let product = data.product_mut(ProductId::new(id))?;
    product.is_featured = !product.is_featured;
    Ok(Json(json!({
        "id": product.id,
        "name": product.name,
        "is_featured": product.is_featured,
    })))
}

// --- cart --------------------------------------------------------------------

async fn get_cart(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let data = state.lock();
    let user = data.authenticate(&headers)?;
    reply(data.cart(user.id)?)
}

#[derive(Deserialize)]
struct AddItemBody {
    product_id: i32,
    #[serde(default = "one")]
    quantity: i32,
}

const fn one() -> i32 {
    1
}

async fn add_cart_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<AddItemBody>,
) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    let product_id = ProductId::new(body.product_id);
    let stock = data.product(product_id)?.stock_quantity;

    let in_cart = data
        .carts
        .get(&user.id)
        .and_then(|lines| lines.iter().find(|l| l.product_id == product_id))
        .map_or(0, |line| line.quantity);
    if stock < in_cart + body.quantity {
        return Err(fail(StatusCode::BAD_REQUEST, "Insufficient stock"));
    }

    let id = CartItemId::new(data.next_id());
    let lines = data.carts.entry(user.id).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
        line.quantity += body.quantity;
    } else {
        lines.push(CartLine {
            id,
            product_id,
            quantity: body.quantity,
            added_at: Utc::now(),
        });
    }
    Ok(Json(json!({ "message": "Item added to cart" })))
}

#[derive(Deserialize)]
struct UpdateItemBody {
    quantity: i32,
}

async fn update_cart_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
    Json(body): Json<UpdateItemBody>,
) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    let line = data
        .carts
        .get_mut(&user.id)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == CartItemId::new(id)))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart item not found"))?;
    line.quantity = body.quantity;
    Ok(Json(json!({ "message": "Cart item updated" })))
}

async fn remove_cart_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    let lines = data.carts.entry(user.id).or_default();
    let before = lines.len();
    lines.retain(|l| l.id != CartItemId::new(id));
    if lines.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Cart item not found"));
    }
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn clear_cart(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    data.carts.remove(&user.id);
    Ok(Json(json!({ "message": "Cart cleared" })))
}

// --- orders ------------------------------------------------------------------

#[derive(Deserialize)]
struct NewOrderBody {
    shipping_address: String,
}

async fn place_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<NewOrderBody>,
) -> Reply {
    let mut data = state.lock();
    let user = data.authenticate(&headers)?;
    let cart = data.cart(user.id)?;
    if cart.items.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Cart is empty"));
    }
    for item in &cart.items {
        if item.product.stock_quantity < item.quantity {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                &format!("Insufficient stock for {}", item.product.name),
            ));
        }
    }

    // Server-side total is the plain subtotal; tax and shipping are not stored
    let total_amount = cart
        .items
        .iter()
        .map(|item| item.product.price * Decimal::from(item.quantity))
        .sum();

    let mut items = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        items.push(OrderItem {
            id: OrderItemId::new(data.next_id()),
            product: item.product.clone(),
            quantity: item.quantity,
            price: item.product.price,
        });
        data.product_mut(item.product.id)?.stock_quantity -= item.quantity;
    }

    let now = Utc::now();
    let order = Order {
        id: OrderId::new(data.next_id()),
        total_amount,
        status: OrderStatus::Pending,
        shipping_address: body.shipping_address,
        items,
        created_at: now,
        updated_at: now,
    };
    data.orders.push((user.id, order.clone()));
    data.carts.remove(&user.id);
    reply(order)
}

async fn list_orders(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let data = state.lock();
    let user = data.authenticate(&headers)?;
    let orders: Vec<&Order> = data
        .orders
        .iter()
        .rev()
        .filter(|(owner, _)| *owner == user.id)
        .map(|(_, order)| order)
        .collect();
    reply(orders)
}

async fn get_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
) -> Reply {
    let data = state.lock();
    let user = data.authenticate(&headers)?;
    let order = data
        .orders
        .iter()
        .find(|(owner, order)| *owner == user.id && order.id == OrderId::new(id))
        .map(|(_, order)| order)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"))?;
    reply(order)
}

#[derive(Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

async fn update_order_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
    Json(body): Json<StatusBody>,
) -> Reply {
    let mut data = state.lock();
    data.authenticate_admin(&headers)?;
    let order = data
        .orders
        .iter_mut()
        .map(|(_, order)| order)
        .find(|order| order.id == OrderId::new(id))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"))?;
    order.status = body.status;
    order.updated_at = Utc::now();
    reply(&*order)
}

async fn all_orders(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let data = state.lock();
    data.authenticate_admin(&headers)?;
    let orders: Vec<&Order> = data.orders.iter().rev().map(|(_, order)| order).collect();
    reply(orders)
}

// --- admin -------------------------------------------------------------------

/// Orders listed on the dashboard.
const RECENT_ORDERS: usize = 5;

async fn admin_stats(State(state): State<SharedState>, headers: HeaderMap) -> Reply {
    let data = state.lock();
    data.authenticate_admin(&headers)?;

    // Only delivered orders count as revenue
    let total_revenue: Decimal = data
        .orders
        .iter()
        .filter(|(_, order)| order.status == OrderStatus::Delivered)
        .map(|(_, order)| order.total_amount)
        .sum();
    let recent_orders: Vec<Value> = data
        .orders
        .iter()
        .rev()
        .take(RECENT_ORDERS)
        .map(|(owner, order)| {
            let email = data
                .accounts
                .iter()
                .find(|a| a.user.id == *owner)
                .map(|a| a.user.email.as_str())
                .unwrap_or_default();
            json!({
                "id": order.id,
                "user_email": email,
                "total": order.total_amount.to_f64(),
                "status": order.status,
                "created_at": order.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "total_revenue": total_revenue.to_f64(),
        "total_orders": data.orders.len(),
        "active_products": data.products.iter().filter(|p| p.is_active).count(),
        "total_users": data.accounts.len(),
        "recent_orders": recent_orders,
    })))
}

#[derive(Deserialize)]
struct PageParams {
    skip: Option<usize>,
    limit: Option<usize>,
}

async fn list_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Reply {
    let data = state.lock();
    data.authenticate_admin(&headers)?;
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);
    let users: Vec<&User> = data
        .accounts
        .iter()
        .skip(skip)
        .take(limit)
        .map(|a| &a.user)
        .collect();
    Ok(Json(json!({
        "data": users,
        "total": data.accounts.len(),
        "skip": skip,
        "limit": limit,
    })))
}

async fn toggle_user_admin(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
) -> Reply {
    let mut data = state.lock();
    let admin = data.authenticate_admin(&headers)?;
    if admin.id == UserId::new(id) {
        return Err(fail(StatusCode::BAD_REQUEST, "Cannot modify your own admin status"));
    }
    let user = data.account_mut(UserId::new(id))?;
    user.is_admin = !user.is_admin;
    Ok(Json(json!({ "id": user.id, "email": user.email, "is_admin": user.is_admin })))
}

async fn toggle_user_active(
    State(state): State<SharedState>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i32>,
) -> Reply {
    let mut data = state.lock();
    let admin = data.authenticate_admin(&headers)?;
    if admin.id == UserId::new(id) {
        return Err(fail(StatusCode::BAD_REQUEST, "Cannot deactivate yourself"));
    }
    let user = data.account_mut(UserId::new(id))?;
    user.is_active = !user.is_active;
    Ok(Json(json!({ "id": user.id, "email": user.email, "is_active": user.is_active })))
}
