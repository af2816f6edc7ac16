//! Orders, their lines and the status state machine.

mod item;
mod state;

pub use item::{OrderItem, OrderLine};
pub use state::{OrderStatus, ParseOrderStatusError};

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A placed order.
///
/// Lines and total are fixed at placement; afterwards only `status`
/// changes, and only along the edges [`OrderStatus::can_transition_to`]
/// allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price: Money,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl Order {
    /// Fails with `PermissionDenied` unless `user_id` placed this order.
    pub fn verify_owner(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.user_id != user_id {
            return Err(DomainError::PermissionDenied {
                resource: "order",
                id: self.id.as_i64(),
            });
        }
        Ok(())
    }

    /// Sum of line totals. Equals `total_price` for every placed order.
    pub fn items_total(&self) -> Result<Money, DomainError> {
        let lines = self
            .items
            .iter()
            .map(OrderItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::total(lines)
    }

    /// Cancels the order. Allowed from `Pending` and `Paid` only.
    ///
    /// Stock restoration is the caller's job; this only moves the status.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Cancelled, "cancel")
    }

    pub fn mark_paid(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Paid, "pay")
    }

    pub fn ship(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Shipped, "ship")
    }

    pub fn deliver(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Delivered, "deliver")
    }

    fn transition(&mut self, next: OrderStatus, action: &'static str) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                current_state: self.status,
                action,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// An order being assembled before it is persisted.
///
/// The total is always derived from the lines, so the stored total and
/// the sum of line totals cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    user_id: UserId,
    lines: Vec<OrderLine>,
    total_price: Money,
}

impl NewOrder {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total_price: Money::zero(),
        }
    }

    /// Appends a line, keeping input order.
    ///
    /// A line that would push the total out of range is rejected and the
    /// draft is left unchanged.
    pub fn push(&mut self, line: OrderLine) -> Result<(), DomainError> {
        self.total_price = self.total_price.checked_add(line.line_total())?;
        self.lines.push(line);
        Ok(())
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }
}
