//! Order placement, listing and cancellation.

use std::sync::Arc;

use application::OrderLineRequest;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{Order, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};
use store::Store;

use super::Pagination;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Unit price captured when the order was placed.
    pub price: i64,
    pub quantity: u32,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            price: item.unit_price.cents(),
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price: i64,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_price: order.total_price.cents(),
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// POST /orders
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<ApiResponse<OrderResponse>, ApiError> {
    let Json(req) = body?;
    let lines = req
        .items
        .into_iter()
        .map(|item| OrderLineRequest::new(ProductId::new(item.product_id), item.quantity))
        .collect();

    let order = state.orders.create_order(current.user.id, lines).await?;
    Ok(ApiResponse::created(order.into()))
}

/// POST /orders/checkout
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
) -> Result<ApiResponse<OrderResponse>, ApiError> {
    let order = state.orders.create_order_from_cart(current.user.id).await?;
    Ok(ApiResponse::created(order.into()))
}

/// GET /orders
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<ApiResponse<Vec<OrderResponse>>, ApiError> {
    let Query(pagination) = query?;
    let orders = state
        .orders
        .list_orders(current.user.id, pagination.page()?)
        .await?;
    Ok(ApiResponse::ok(
        orders.into_iter().map(OrderResponse::from).collect(),
    ))
}

/// GET /orders/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let order = state
        .orders
        .get_order(current.user.id, OrderId::new(id))
        .await?;
    Ok(ApiResponse::ok(order.into()))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let order = state
        .orders
        .cancel_order(current.user.id, OrderId::new(id))
        .await?;
    Ok(ApiResponse::ok(order.into()))
}
