//! Request extractors for authenticated callers.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use domain::{Seller, User};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// The active user behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// The raw token, kept so the session can be revoked.
    pub token: String,
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthorized)?
            .to_string();
        let user = state.users.authenticate(&token).await?;
        Ok(Self { user, token })
    }
}

/// An authenticated user that also has a seller profile.
#[derive(Debug, Clone)]
pub struct CurrentSeller {
    pub user: User,
    pub seller: Seller,
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentSeller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        let seller = state.sellers.require_seller(user.id).await?;
        Ok(Self { user, seller })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}
