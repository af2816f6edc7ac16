//! Cart endpoints. Every cart is the caller's own.

use std::sync::Arc;

use application::{CartLine, CartView};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use common::{CartItemId, ProductId};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: i64,
    pub quantity: u32,
    pub total_price: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_price: i64,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name,
            price: line.unit_price.cents(),
            quantity: line.quantity,
            total_price: line.line_total.cents(),
        }
    }
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            items: view.items.into_iter().map(CartItemResponse::from).collect(),
            total_price: view.total_price.cents(),
        }
    }
}

/// GET /carts/me
pub async fn mine<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
) -> Result<ApiResponse<CartResponse>, ApiError> {
    let view = state.carts.get_cart(current.user.id).await?;
    Ok(ApiResponse::ok(view.into()))
}

/// POST /carts/items
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<ApiResponse<CartResponse>, ApiError> {
    let Json(req) = body?;
    let view = state
        .carts
        .add_to_cart(current.user.id, ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(ApiResponse::created(view.into()))
}

/// PATCH /carts/items/{product_id}
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    product_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<ApiResponse<CartResponse>, ApiError> {
    let Path(product_id) = product_id?;
    let Json(req) = body?;
    let view = state
        .carts
        .update_item_quantity(current.user.id, ProductId::new(product_id), req.quantity)
        .await?;
    Ok(ApiResponse::ok(view.into()))
}

/// DELETE /carts/items/{product_id}
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    product_id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<CartResponse>, ApiError> {
    let Path(product_id) = product_id?;
    let view = state
        .carts
        .remove_item(current.user.id, ProductId::new(product_id))
        .await?;
    Ok(ApiResponse::ok(view.into()))
}
