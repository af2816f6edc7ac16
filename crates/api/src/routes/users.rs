//! Account, session and seller-profile endpoints.

use std::sync::Arc;

use application::{AccessToken, NewSellerInput, NewUserInput, UserUpdate};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use common::{SellerId, UserId};
use domain::{Seller, SellerUpdate, User};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSellerRequest {
    pub store_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSellerRequest {
    pub store_name: Option<String>,
    pub description: Option<String>,
}

/// Public view of an account. The password digest never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub role: &'static str,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            role: user.role.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl From<AccessToken> for TokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerResponse {
    pub id: SellerId,
    pub user_id: UserId,
    pub store_name: String,
    pub description: Option<String>,
}

impl From<Seller> for SellerResponse {
    fn from(seller: Seller) -> Self {
        Self {
            id: seller.id,
            user_id: seller.user_id,
            store_name: seller.store_name,
            description: seller.description,
        }
    }
}

/// POST /users
#[tracing::instrument(skip_all)]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let Json(req) = body?;
    let user = state
        .users
        .register(NewUserInput {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
        })
        .await?;
    Ok(ApiResponse::created(user.into()))
}

/// POST /users/login
#[tracing::instrument(skip_all)]
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let Json(req) = body?;
    let token = state.users.login(&req.email, &req.password).await?;
    Ok(ApiResponse::ok(token.into()))
}

/// POST /users/logout
pub async fn logout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
) -> ApiResponse<()> {
    state.users.logout(&current.token).await;
    tracing::info!(user_id = %current.user.id, "session revoked");
    ApiResponse::ok(())
}

/// GET /users/me
pub async fn me(current: CurrentUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(current.user.into())
}

/// PATCH /users/me
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn update_me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let Json(req) = body?;
    let user = state
        .users
        .update_user(
            current.user.id,
            UserUpdate {
                full_name: req.full_name,
                password: req.password,
            },
        )
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

/// POST /users/me/seller
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn register_seller<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    body: Result<Json<RegisterSellerRequest>, JsonRejection>,
) -> Result<ApiResponse<SellerResponse>, ApiError> {
    let Json(req) = body?;
    let seller = state
        .sellers
        .register_seller(
            current.user.id,
            NewSellerInput {
                store_name: req.store_name,
                description: req.description,
            },
        )
        .await?;
    Ok(ApiResponse::created(seller.into()))
}

/// GET /users/me/seller
pub async fn my_seller<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
) -> Result<ApiResponse<SellerResponse>, ApiError> {
    let seller = state.sellers.get_seller(current.user.id).await?;
    Ok(ApiResponse::ok(seller.into()))
}

/// PATCH /users/me/seller
#[tracing::instrument(skip_all, fields(user_id = %current.user.id))]
pub async fn update_my_seller<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    current: CurrentUser,
    body: Result<Json<UpdateSellerRequest>, JsonRejection>,
) -> Result<ApiResponse<SellerResponse>, ApiError> {
    let Json(req) = body?;
    let seller = state
        .sellers
        .update_seller(
            current.user.id,
            SellerUpdate {
                store_name: req.store_name,
                description: req.description,
            },
        )
        .await?;
    Ok(ApiResponse::ok(seller.into()))
}
