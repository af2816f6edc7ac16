//! Shopping cart rows.

use common::{CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One product in a user's cart. At most one row exists per
/// `(user_id, product_id)`; repeated adds grow `quantity` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    /// Grows the quantity by `quantity`.
    pub fn add_quantity(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.quantity =
            self.quantity
                .checked_add(quantity)
                .ok_or(DomainError::QuantityOverflow {
                    current: self.quantity,
                    added: quantity,
                })?;
        Ok(())
    }

    /// Replaces the quantity.
    pub fn update_quantity(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.quantity = quantity;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl NewCartItem {
    pub fn new(user_id: UserId, product_id: ProductId, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        Ok(Self {
            user_id,
            product_id,
            quantity,
        })
    }
}
