//! HTTP handlers grouped by resource.

pub mod carts;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use serde::Deserialize;
use store::Page;

use crate::error::ApiError;

/// `?offset=&limit=` as sent by the client, validated by [`Pagination::page`].
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Rejects out-of-range values instead of clamping them.
    pub fn page(&self) -> Result<Page, ApiError> {
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(Page::DEFAULT_LIMIT);

        if offset < 0 {
            return Err(ApiError::Validation(
                "offset must be greater than or equal to 0".to_string(),
            ));
        }
        if !(1..=Page::MAX_LIMIT).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                Page::MAX_LIMIT
            )));
        }
        Ok(Page::new(offset, limit))
    }
}
