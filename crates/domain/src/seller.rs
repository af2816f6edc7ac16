//! Seller profiles.

use common::{SellerId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Store front owned by a user. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub user_id: UserId,
    pub store_name: String,
    pub description: Option<String>,
}

impl Seller {
    pub fn update_info(&mut self, update: SellerUpdate) -> Result<(), DomainError> {
        if let Some(store_name) = &update.store_name
            && store_name.trim().is_empty()
        {
            return Err(DomainError::Blank {
                field: "store_name",
            });
        }
        if let Some(store_name) = update.store_name {
            self.store_name = store_name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeller {
    pub user_id: UserId,
    pub store_name: String,
    pub description: Option<String>,
}

impl NewSeller {
    pub fn new(
        user_id: UserId,
        store_name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        let store_name = store_name.into();
        if store_name.trim().is_empty() {
            return Err(DomainError::Blank {
                field: "store_name",
            });
        }
        Ok(Self {
            user_id,
            store_name,
            description,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerUpdate {
    pub store_name: Option<String>,
    pub description: Option<String>,
}
