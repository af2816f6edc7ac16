//! Order lines.

use common::{OrderItemId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::product::Product;

/// A persisted order line. Immutable once the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Unit price captured when stock was taken.
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.multiply(self.quantity)
    }
}

/// A line of an order that is being placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    product_id: ProductId,
    unit_price: Money,
    quantity: u32,
    line_total: Money,
}

impl OrderLine {
    /// Snapshots the product's current price for `quantity` units.
    ///
    /// Later price changes on the product never reach the line. Fails
    /// with `AmountOverflow` when the line total is out of range.
    pub fn capture(product: &Product, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        Ok(Self {
            product_id: product.id,
            unit_price: product.price,
            quantity,
            line_total: product.price.multiply(quantity)?,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }
}
