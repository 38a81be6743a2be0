use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::auth::{self, require_admin, require_user, CurrentUser};
use super::error::ApiError;
use super::models::{
    NewOrder, NewProduct, NewShowroom, Order, PopulatedOrder, PopulatedOrderItem,
    PopulatedProduct, Product, PublicUser, Role,
};
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

// --- auth handlers ---

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let digest = auth::hash_password(&req.password)?;
    let user = state
        .store
        .create_user(&req.name, &req.email, &digest, Role::User)
        .await?;

    tracing::info!("user registered: {}", user.email);

    let token = state.keys.issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.public(),
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .store
        .user_by_email(&req.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !auth::verify_password(&req.password, &user.password_digest) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.keys.issue(&user)?;
    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}

async fn profile(Extension(current): Extension<CurrentUser>) -> Json<PublicUser> {
    Json(current.0.public())
}

// --- product handlers ---

async fn populate_product(
    state: &AppState,
    product: Product,
) -> Result<PopulatedProduct, ApiError> {
    let showroom = match product.showroom.as_deref() {
        Some(id) => state.store.showroom(id).await?,
        None => None,
    };
    Ok(product.populate(showroom))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PopulatedProduct>>, ApiError> {
    let mut populated = Vec::new();
    for product in state.store.products().await? {
        populated.push(populate_product(&state, product).await?);
    }
    Ok(Json(populated))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedProduct>, ApiError> {
    let product = state
        .store
        .product(&id)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(populate_product(&state, product).await?))
}

async fn products_by_showroom(
    State(state): State<Arc<AppState>>,
    Path(showroom_id): Path<String>,
) -> Result<Json<Vec<PopulatedProduct>>, ApiError> {
    let products = state.store.products_by_showroom(&showroom_id).await?;
    tracing::debug!(
        "found {} products for showroom {showroom_id}",
        products.len()
    );

    let mut populated = Vec::new();
    for product in products {
        populated.push(populate_product(&state, product).await?);
    }
    Ok(Json(populated))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.store.create_product(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete_product(&id).await? {
        return Err(ApiError::NotFound("Product"));
    }
    Ok(Json(json!({ "message": "Product deleted" })))
}

// --- showroom handlers ---

async fn list_showrooms(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.showrooms().await?))
}

async fn create_showroom(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewShowroom>,
) -> Result<impl IntoResponse, ApiError> {
    let showroom = state.store.create_showroom(new).await?;
    Ok((StatusCode::CREATED, Json(showroom)))
}

async fn delete_showroom(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete_showroom(&id).await? {
        return Err(ApiError::NotFound("Showroom"));
    }
    Ok(Json(json!({ "message": "Showroom deleted" })))
}

// --- order handlers ---

async fn populate_order(state: &AppState, order: Order) -> Result<PopulatedOrder, ApiError> {
    let mut items = Vec::new();
    for item in order.items {
        let product = state.store.product(&item.product).await?;
        items.push(PopulatedOrderItem {
            product,
            quantity: item.quantity,
        });
    }
    Ok(PopulatedOrder {
        id: order.id,
        user: order.user,
        items,
        total_price: order.total_price,
        status: order.status,
        created_at: order.created_at,
    })
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(new): Json<NewOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.store.create_order(&current.0.id, new).await?;
    tracing::info!("order {} created by user {}", order.id, order.user);
    Ok((StatusCode::CREATED, Json(order)))
}

async fn my_orders(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<PopulatedOrder>>, ApiError> {
    let mut populated = Vec::new();
    for order in state.store.orders_by_user(&current.0.id).await? {
        populated.push(populate_order(&state, order).await?);
    }
    Ok(Json(populated))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedOrder>, ApiError> {
    let order = state
        .store
        .order(&id)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(populate_order(&state, order).await?))
}

async fn root() -> &'static str {
    "API is running..."
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        // development default: any origin, no credentials
        layer.allow_origin(Any)
    } else {
        let list: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer
            .allow_origin(AllowOrigin::list(list))
            .allow_credentials(true)
    }
}

/// Assemble the full API router.
pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/products", get(list_products))
        .route("/api/products/showroom/:id", get(products_by_showroom))
        .route("/api/products/:id", get(get_product))
        .route("/api/showrooms", get(list_showrooms));

    let user = Router::new()
        .route("/api/auth/profile", get(profile))
        .route("/api/orders", post(create_order))
        .route("/api/orders/my-orders", get(my_orders))
        .route("/api/orders/:id", get(get_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    // admin gate runs inside the user gate
    let admin = Router::new()
        .route("/api/products", post(create_product))
        .route("/api/products/:id", delete(delete_product))
        .route("/api/showrooms", post(create_showroom))
        .route("/api/showrooms/:id", delete(delete_showroom))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public
        .merge(user)
        .merge(admin)
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}
