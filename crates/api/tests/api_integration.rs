//! Integration tests for the API server.

use std::sync::OnceLock;

use api::config::Config;
use application::AuthConfig;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let config = Config {
        auth: AuthConfig {
            secret: "test-pepper".to_string(),
            hash_memory_kib: 8,
            hash_iterations: 1,
            ..AuthConfig::default()
        },
        ..Config::default()
    };
    let state = api::create_state(InMemoryStore::new(), &config).unwrap();
    api::create_app(state, get_metrics_handle())
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Registers and logs in a user, returning the bearer token.
async fn sign_up(app: &Router, email: &str) -> String {
    let (status, _) = call(
        app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": email, "password": "secret-pass", "fullName": "Test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({ "email": email, "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["result"]["accessToken"].as_str().unwrap().to_string()
}

/// Signs up a seller with one product and returns `(seller_token, product_id)`.
async fn seller_with_product(app: &Router, price: i64, stock: i64) -> (String, i64) {
    let token = sign_up(app, "seller@example.com").await;
    let (status, _) = call(
        app,
        "POST",
        "/api/v1/users/me/seller",
        Some(&token),
        Some(json!({ "storeName": "Gadgets" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        "POST",
        "/api/v1/products",
        Some(&token),
        Some(json!({ "name": "Widget", "price": price, "stock": stock })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (token, body["result"]["id"].as_i64().unwrap())
}

async fn stock_of(app: &Router, product_id: i64) -> i64 {
    let (_, body) = call(app, "GET", &format!("/api/v1/products/{product_id}"), None, None).await;
    body["result"]["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = setup();
    let token = sign_up(&app, "Ada@Example.com").await;

    let (status, body) = call(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "OK");
    assert_eq!(body["result"]["email"], "ada@example.com");
    assert_eq!(body["result"]["role"], "buyer");
    assert!(body["result"].get("hashedPassword").is_none());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = setup();
    sign_up(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["result"].is_null());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup();
    let (status, body) = call(&app, "GET", "/api/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, "GET", "/api/v1/carts/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = setup();
    let token = sign_up(&app, "ada@example.com").await;

    let (status, _) = call(&app, "POST", "/api/v1/users/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = setup();
    sign_up(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": "ADA@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = setup();
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_non_seller_cannot_create_product() {
    let app = setup();
    let token = sign_up(&app, "buyer@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/products",
        Some(&token),
        Some(json!({ "name": "Widget", "price": 100, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_product_validation_and_update() {
    let app = setup();
    let (seller, product_id) = seller_with_product(&app, 500, 3).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/products",
        Some(&seller),
        Some(json!({ "name": "Free", "price": 0, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/v1/products/{product_id}"),
        Some(&seller),
        Some(json!({ "stock": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["stock"], 10);
    assert_eq!(body["result"]["version"], 2);

    let (status, _) = call(
        &app,
        "PATCH",
        &format!("/api/v1/products/{product_id}"),
        Some(&seller),
        Some(json!({ "stock": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_seller_cannot_update_product() {
    let app = setup();
    let (_, product_id) = seller_with_product(&app, 500, 3).await;

    let rival = sign_up(&app, "rival@example.com").await;
    call(
        &app,
        "POST",
        "/api/v1/users/me/seller",
        Some(&rival),
        Some(json!({ "storeName": "Rival" })),
    )
    .await;

    let (status, _) = call(
        &app,
        "PATCH",
        &format!("/api/v1/products/{product_id}"),
        Some(&rival),
        Some(json!({ "price": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_products_pagination() {
    let app = setup();
    seller_with_product(&app, 500, 3).await;

    let (status, body) = call(&app, "GET", "/api/v1/products?offset=0&limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", "/api/v1/products?limit=101", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = call(&app, "GET", "/api/v1/products?offset=-1", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_order_then_cancel_restores_stock() {
    let app = setup();
    let (_, product_id) = seller_with_product(&app, 10_000, 100).await;
    let buyer = sign_up(&app, "buyer@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&buyer),
        Some(json!({ "items": [{ "productId": product_id, "quantity": 2 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["status"], "PENDING");
    assert_eq!(body["result"]["totalPrice"], 20_000);
    assert_eq!(body["result"]["items"][0]["price"], 10_000);
    assert_eq!(stock_of(&app, product_id).await, 98);

    let order_id = body["result"]["id"].as_i64().unwrap();
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/v1/orders/{order_id}/cancel"),
        Some(&buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "CANCELLED");
    assert_eq!(stock_of(&app, product_id).await, 100);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/v1/orders/{order_id}/cancel"),
        Some(&buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(stock_of(&app, product_id).await, 100);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_untouched() {
    let app = setup();
    let (_, product_id) = seller_with_product(&app, 100, 3).await;
    let buyer = sign_up(&app, "buyer@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&buyer),
        Some(json!({ "items": [{ "productId": product_id, "quantity": 5 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(stock_of(&app, product_id).await, 3);

    let (_, body) = call(&app, "GET", "/api/v1/orders", Some(&buyer), None).await;
    assert!(body["result"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_product_order_is_not_found() {
    let app = setup();
    let buyer = sign_up(&app, "buyer@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&buyer),
        Some(json!({ "items": [{ "productId": 999, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_cart_checkout_flow() {
    let app = setup();
    let (_, product_id) = seller_with_product(&app, 250, 10).await;
    let buyer = sign_up(&app, "buyer@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/carts/items",
        Some(&buyer),
        Some(json!({ "productId": product_id, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["totalPrice"], 750);
    assert_eq!(body["result"]["items"][0]["productName"], "Widget");

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/v1/carts/items/{product_id}"),
        Some(&buyer),
        Some(json!({ "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["items"][0]["quantity"], 4);

    let (status, body) = call(&app, "POST", "/api/v1/orders/checkout", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["totalPrice"], 1_000);
    assert_eq!(stock_of(&app, product_id).await, 6);

    let (_, body) = call(&app, "GET", "/api/v1/carts/me", Some(&buyer), None).await;
    assert!(body["result"]["items"].as_array().unwrap().is_empty());

    let (status, body) = call(&app, "POST", "/api/v1/orders/checkout", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_remove_missing_cart_item_is_not_found() {
    let app = setup();
    let buyer = sign_up(&app, "buyer@example.com").await;

    let (status, _) = call(&app, "DELETE", "/api/v1/carts/items/42", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = setup();
    let (_, product_id) = seller_with_product(&app, 100, 5).await;
    let buyer = sign_up(&app, "buyer@example.com").await;
    let other = sign_up(&app, "other@example.com").await;

    let (_, body) = call(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&buyer),
        Some(json!({ "items": [{ "productId": product_id, "quantity": 1 }] })),
    )
    .await;
    let order_id = body["result"]["id"].as_i64().unwrap();

    let (status, _) = call(&app, "GET", &format!("/api/v1/orders/{order_id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/v1/orders/{order_id}/cancel"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&app, product_id).await, 4);

    let (status, body) = call(&app, "GET", &format!("/api/v1/orders/{order_id}"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["id"], order_id);
}
