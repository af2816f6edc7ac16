//! Persistence for the commerce backend.
//!
//! [`repository`] defines the ports use cases depend on and the
//! [`UnitOfWork`] contract that groups them into one atomic scope.
//! [`InMemoryStore`] and [`PgStore`] are the two adapters.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PgStore, PgUnitOfWork};
pub use query::{Page, ProductQuery};
pub use repository::{
    CartRepository, OrderRepository, ProductRepository, SellerRepository, Store, UnitOfWork,
    UserRepository,
};
