//! Domain layer for the commerce backend.
//!
//! Entities here are plain data plus the methods that guard their
//! invariants. Nothing in this crate performs I/O; persistence and
//! orchestration live in the `store` and `application` crates.

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod seller;
pub mod user;

pub use cart::{CartItem, NewCartItem};
pub use common::{CartItemId, OrderId, OrderItemId, ProductId, SellerId, UserId, Version};
pub use error::DomainError;
pub use money::Money;
pub use order::{NewOrder, Order, OrderItem, OrderLine, OrderStatus, ParseOrderStatusError};
pub use product::{NewProduct, Product, ProductUpdate};
pub use seller::{NewSeller, Seller, SellerUpdate};
pub use user::{NewUser, ParseUserRoleError, User, UserRole};
