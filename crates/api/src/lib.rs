//! HTTP API server for the commerce backend.
//!
//! Exposes users, catalog, carts and orders under `/api/v1`, with
//! structured logging (tracing) and Prometheus metrics at `/metrics`.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use application::{
    AppError, Argon2PasswordHasher, CartUseCase, OrderUseCase, ProductUseCase, RetryPolicy,
    SellerUseCase, SessionTokenIssuer, UserUseCase,
};
use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Use cases shared by every handler.
pub struct AppState<S: Store> {
    pub users: UserUseCase<S, Argon2PasswordHasher, SessionTokenIssuer>,
    pub sellers: SellerUseCase<S>,
    pub products: ProductUseCase<S>,
    pub carts: CartUseCase<S>,
    pub orders: OrderUseCase<S>,
    /// Handle on the session table the user use case issues into.
    pub sessions: SessionTokenIssuer,
}

/// Wires every use case over `store` with the configured retry and auth settings.
pub fn create_state<S: Store>(store: S, config: &Config) -> Result<Arc<AppState<S>>, AppError> {
    let retry = RetryPolicy::new(config.retry.clone());
    let hasher = Argon2PasswordHasher::new(&config.auth)?;
    let sessions = SessionTokenIssuer::new(config.auth.token_ttl);

    Ok(Arc::new(AppState {
        users: UserUseCase::new(store.clone(), hasher, sessions.clone()),
        sellers: SellerUseCase::new(store.clone()),
        products: ProductUseCase::new(store.clone(), retry.clone()),
        carts: CartUseCase::new(store.clone()),
        orders: OrderUseCase::new(store, retry),
        sessions,
    }))
}

fn api_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    use routes::{carts, orders, products, users};

    Router::new()
        .route("/users", post(users::register::<S>))
        .route("/users/login", post(users::login::<S>))
        .route("/users/logout", post(users::logout::<S>))
        .route("/users/me", get(users::me).patch(users::update_me::<S>))
        .route(
            "/users/me/seller",
            post(users::register_seller::<S>)
                .get(users::my_seller::<S>)
                .patch(users::update_my_seller::<S>),
        )
        .route(
            "/products",
            post(products::create::<S>).get(products::list::<S>),
        )
        .route(
            "/products/{id}",
            get(products::get::<S>).patch(products::update::<S>),
        )
        .route("/carts/me", get(carts::mine::<S>))
        .route("/carts/items", post(carts::add_item::<S>))
        .route(
            "/carts/items/{product_id}",
            patch(carts::update_item::<S>).delete(carts::remove_item::<S>),
        )
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route("/orders/checkout", post(orders::checkout::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/orders/{id}/cancel", post(orders::cancel::<S>))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .nest("/api/v1", api_routes::<S>())
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
