//! Catalog endpoints.

use std::sync::Arc;

use application::NewProductInput;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::{ProductId, SellerId, Version};
use domain::{DomainError, Money, Product, ProductUpdate};
use serde::{Deserialize, Serialize};
use store::{ProductQuery, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentSeller;
use crate::response::ApiResponse;

/// Prices are integer minor units (cents).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub seller_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: u32,
    pub version: Version,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            seller_id: product.seller_id,
            name: product.name,
            description: product.description,
            price: product.price.cents(),
            stock: product.stock,
            version: product.version,
        }
    }
}

fn initial_stock(stock: i64) -> Result<u32, ApiError> {
    if stock < 0 {
        return Err(ApiError::App(DomainError::NegativeStock { stock }.into()));
    }
    u32::try_from(stock).map_err(|_| ApiError::Validation(format!("stock {stock} is too large")))
}

/// POST /products
#[tracing::instrument(skip_all, fields(seller_id = %current.seller.id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentSeller,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    let Json(req) = body?;
    let product = state
        .products
        .create_product(
            current.seller.id,
            NewProductInput {
                name: req.name,
                description: req.description,
                price: Money::from_cents(req.price),
                stock: initial_stock(req.stock)?,
            },
        )
        .await?;
    Ok(ApiResponse::created(product.into()))
}

/// GET /products
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<ProductResponse>>, ApiError> {
    let Query(params) = query?;
    let page = super::Pagination {
        offset: params.offset,
        limit: params.limit,
    }
    .page()?;

    let mut filter = ProductQuery::new().page(page);
    if let Some(seller_id) = params.seller_id {
        filter = filter.seller(SellerId::new(seller_id));
    }

    let products = state.products.list_products(filter).await?;
    Ok(ApiResponse::ok(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// GET /products/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    let Path(id) = id?;
    let product = state.products.get_product(ProductId::new(id)).await?;
    Ok(ApiResponse::ok(product.into()))
}

/// PATCH /products/{id}
///
/// Only the owning seller may update. Stock here is a direct set, not a delta.
#[tracing::instrument(skip_all, fields(seller_id = %current.seller.id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentSeller,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<ApiResponse<ProductResponse>, ApiError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let update = ProductUpdate {
        name: req.name,
        description: req.description,
        price: req.price.map(Money::from_cents),
        stock: req.stock,
    };

    let product = state
        .products
        .update_product(current.seller.id, ProductId::new(id), update)
        .await?;
    Ok(ApiResponse::ok(product.into()))
}
