//! Use cases for the commerce backend.
//!
//! Every use case owns a [`Store`](store::Store) handle and opens one unit
//! of work per attempt. Operations that write versioned rows run under a
//! [`RetryPolicy`], which re-runs the whole attempt (fresh unit, fresh
//! reads) when the store reports a lost optimistic-concurrency race.

pub mod auth;
pub mod carts;
pub mod error;
pub mod orders;
pub mod products;
pub mod retry;
pub mod sellers;
pub mod users;

pub use auth::{
    AccessToken, Argon2PasswordHasher, AuthConfig, PasswordHasher, SessionTokenIssuer,
    TokenClaims, TokenIssuer,
};
pub use carts::{CartLine, CartUseCase, CartView};
pub use error::{AppError, ErrorKind, Result};
pub use orders::{OrderLineRequest, OrderUseCase};
pub use products::{NewProductInput, ProductUseCase};
pub use retry::{RetryConfig, RetryPolicy};
pub use sellers::{NewSellerInput, SellerUseCase};
pub use users::{NewUserInput, UserUpdate, UserUseCase};
