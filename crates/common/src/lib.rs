//! Identifier and concurrency-token types shared by every layer.

mod types;
mod version;

pub use types::{CartItemId, OrderId, OrderItemId, ProductId, SellerId, UserId};
pub use version::Version;
