use async_trait::async_trait;
use common::{CartItemId, OrderId, ProductId, UserId};
use domain::{
    CartItem, NewCartItem, NewOrder, NewProduct, NewSeller, NewUser, Order, Product, Seller, User,
};

use crate::{Page, ProductQuery, Result};

/// Persistence port for catalog products.
#[async_trait]
pub trait ProductRepository {
    /// Inserts a product at [`Version::first`](common::Version::first).
    async fn create_product(&mut self, product: NewProduct) -> Result<Product>;

    /// Loads a product, including writes made earlier in the same unit.
    async fn product_by_id(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products ordered by id.
    async fn list_products(&mut self, query: ProductQuery) -> Result<Vec<Product>>;

    /// Writes every field of `product`.
    ///
    /// `product.version` must be the version that was read. If the stored
    /// row has moved on, the write is rejected with `ConcurrencyConflict`
    /// and nothing is changed. On success the stored version is bumped by
    /// one and the written row is returned.
    async fn update_product(&mut self, product: &Product) -> Result<Product>;
}

/// Persistence port for orders and their lines.
#[async_trait]
pub trait OrderRepository {
    /// Inserts the order with status `PENDING` and its lines in order.
    async fn create_order(&mut self, order: NewOrder) -> Result<Order>;

    async fn order_by_id(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Lists one user's orders, oldest first.
    async fn list_orders_by_user(&mut self, user_id: UserId, page: Page) -> Result<Vec<Order>>;

    /// Writes the order's status with the same version check as
    /// [`ProductRepository::update_product`]. Lines are never rewritten.
    async fn update_order(&mut self, order: &Order) -> Result<Order>;
}

/// Persistence port for cart rows.
#[async_trait]
pub trait CartRepository {
    async fn cart_item(&mut self, user_id: UserId, product_id: ProductId)
    -> Result<Option<CartItem>>;

    /// Returns the user's cart rows ordered by id.
    async fn cart_items(&mut self, user_id: UserId) -> Result<Vec<CartItem>>;

    /// Inserts a row. Fails with `Duplicate` if the user already has a row
    /// for the product.
    async fn create_cart_item(&mut self, item: NewCartItem) -> Result<CartItem>;

    async fn update_cart_item(&mut self, item: &CartItem) -> Result<CartItem>;

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<()>;

    /// Deletes the user's rows for the given products. Returns the number removed.
    async fn delete_cart_items_for_products(
        &mut self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64>;

    /// Deletes every row of the user's cart. Returns the number removed.
    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64>;
}

/// Persistence port for seller profiles.
#[async_trait]
pub trait SellerRepository {
    async fn seller_by_user(&mut self, user_id: UserId) -> Result<Option<Seller>>;

    /// Inserts a seller. Fails with `Duplicate` if the user already has one.
    async fn create_seller(&mut self, seller: NewSeller) -> Result<Seller>;

    async fn update_seller(&mut self, seller: &Seller) -> Result<Seller>;
}

/// Persistence port for user accounts.
#[async_trait]
pub trait UserRepository {
    /// Inserts a user. Fails with `Duplicate` if the email is taken.
    async fn create_user(&mut self, user: NewUser) -> Result<User>;

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>>;

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>>;

    async fn update_user(&mut self, user: &User) -> Result<User>;
}

/// A transactional scope over every repository.
///
/// Writes made through the unit are visible to later reads through the
/// same unit and to nobody else until [`commit`](UnitOfWork::commit).
/// Dropping a unit without committing discards all of its writes, so an
/// early return with `?` rolls back.
#[async_trait]
pub trait UnitOfWork:
    ProductRepository
    + OrderRepository
    + CartRepository
    + SellerRepository
    + UserRepository
    + Send
    + Sized
{
    /// Makes every write of the unit visible atomically.
    ///
    /// Fails with `ConcurrencyConflict` if a versioned row written by the
    /// unit was committed by someone else first; nothing is applied then.
    async fn commit(self) -> Result<()>;

    /// Discards every write of the unit.
    async fn rollback(self) -> Result<()>;
}

/// Factory for units of work. Cheap to clone and share across tasks.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Unit: UnitOfWork + 'static;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Unit>;
}
