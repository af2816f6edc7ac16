//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Invariant violations raised by entity methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A quantity of zero was supplied where a positive one is required.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Adding a quantity would leave the supported range.
    #[error("Quantity overflow: {current} + {added} is out of range")]
    QuantityOverflow { current: u32, added: u32 },

    /// Price must be strictly positive.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: i64 },

    /// Stock was set to a negative value.
    #[error("Invalid stock: {stock} (must not be negative)")]
    NegativeStock { stock: i64 },

    /// A price, line total or order total left the representable range.
    #[error("Amount out of range")]
    AmountOverflow,

    /// More units were requested than the product has on hand.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The caller does not own the resource.
    #[error("Permission denied: {resource} {id} belongs to another owner")]
    PermissionDenied { resource: &'static str, id: i64 },

    /// Order status change not allowed by the state machine.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// Order requested without any lines.
    #[error("Order has no items")]
    NoItems,

    /// Checkout requested with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A required text field was empty.
    #[error("Invalid {field}: must not be blank")]
    Blank { field: &'static str },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },
}
