//! Shopping cart use cases.

use common::{CartItemId, ProductId, UserId};
use domain::{DomainError, Money, NewCartItem};
use store::{CartRepository, ProductRepository, Store, UnitOfWork};

use crate::error::{AppError, Result};

/// A cart row joined with the live catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Current catalog price, not a snapshot.
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// A user's cart priced at current catalog prices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_price: Money,
}

/// Builds the cart view as seen by `uow`, skipping rows whose product is gone.
async fn cart_view<U: UnitOfWork>(uow: &mut U, user_id: UserId) -> Result<CartView> {
    let mut items = Vec::new();
    for item in uow.cart_items(user_id).await? {
        let Some(product) = uow.product_by_id(item.product_id).await? else {
            continue;
        };
        items.push(CartLine {
            id: item.id,
            product_id: item.product_id,
            product_name: product.name,
            unit_price: product.price,
            quantity: item.quantity,
            line_total: product.price.multiply(item.quantity)?,
        });
    }
    let total_price = Money::total(items.iter().map(|line| line.line_total))?;
    Ok(CartView { items, total_price })
}

pub struct CartUseCase<S: Store> {
    store: S,
}

impl<S: Store> CartUseCase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let mut uow = self.store.begin().await?;
        cart_view(&mut uow, user_id).await
    }

    /// Adds `quantity` units, merging into an existing row for the product.
    ///
    /// The combined quantity must be in stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity }.into());
        }

        let mut uow = self.store.begin().await?;
        let product = uow
            .product_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", product_id))?;

        match uow.cart_item(user_id, product_id).await? {
            Some(mut item) => {
                item.add_quantity(quantity)?;
                product.check_stock(item.quantity)?;
                uow.update_cart_item(&item).await?;
            }
            None => {
                product.check_stock(quantity)?;
                uow.create_cart_item(NewCartItem::new(user_id, product_id, quantity)?)
                    .await?;
            }
        }

        let view = cart_view(&mut uow, user_id).await?;
        uow.commit().await?;
        tracing::info!(user_id = %user_id, product_id = %product_id, quantity, "cart item added");
        Ok(view)
    }

    /// Replaces the quantity of the user's row for `product_id`.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        let mut uow = self.store.begin().await?;
        let mut item = uow
            .cart_item(user_id, product_id)
            .await?
            .ok_or(AppError::CartItemNotFound { product_id })?;
        let product = uow
            .product_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", product_id))?;

        item.update_quantity(quantity)?;
        product.check_stock(quantity)?;
        uow.update_cart_item(&item).await?;

        let view = cart_view(&mut uow, user_id).await?;
        uow.commit().await?;
        Ok(view)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<CartView> {
        let mut uow = self.store.begin().await?;
        let item = uow
            .cart_item(user_id, product_id)
            .await?
            .ok_or(AppError::CartItemNotFound { product_id })?;
        uow.delete_cart_item(item.id).await?;

        let view = cart_view(&mut uow, user_id).await?;
        uow.commit().await?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use domain::{NewProduct, NewSeller, NewUser, Product, ProductUpdate};
    use store::{InMemoryStore, SellerRepository, UserRepository};

    use super::*;
    use crate::error::ErrorKind;

    async fn setup(stock: u32) -> (InMemoryStore, UserId, Product) {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let buyer = uow
            .create_user(NewUser::new("buyer@example.com", None, "digest".to_string()).unwrap())
            .await
            .unwrap();
        let owner = uow
            .create_user(NewUser::new("seller@example.com", None, "digest".to_string()).unwrap())
            .await
            .unwrap();
        let seller = uow
            .create_seller(NewSeller::new(owner.id, "Shop", None).unwrap())
            .await
            .unwrap();
        let product = uow
            .create_product(
                NewProduct::new(seller.id, "Mug", None, Money::from_cents(250), stock).unwrap(),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();
        (store, buyer.id, product)
    }

    #[tokio::test]
    async fn test_add_creates_row_and_prices_view() {
        let (store, buyer, product) = setup(10).await;
        let carts = CartUseCase::new(store);

        let view = carts.add_to_cart(buyer, product.id, 2).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_name, "Mug");
        assert_eq!(view.items[0].line_total, Money::from_cents(500));
        assert_eq!(view.total_price, Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_combined_quantity_checked_against_stock() {
        let (store, buyer, product) = setup(4).await;
        let carts = CartUseCase::new(store);

        carts.add_to_cart(buyer, product.id, 3).await.unwrap();
        let err = carts.add_to_cart(buyer, product.id, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let view = carts.get_cart(buyer).await.unwrap();
        assert_eq!(view.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_zero_rejected() {
        let (store, buyer, product) = setup(4).await;
        let carts = CartUseCase::new(store);

        let err = carts.add_to_cart(buyer, product.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDomain);
    }

    #[tokio::test]
    async fn test_view_uses_live_price() {
        let (store, buyer, mut product) = setup(4).await;
        let carts = CartUseCase::new(store.clone());
        carts.add_to_cart(buyer, product.id, 2).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        product
            .apply_update(&ProductUpdate {
                price: Some(Money::from_cents(400)),
                ..ProductUpdate::default()
            })
            .unwrap();
        uow.update_product(&product).await.unwrap();
        uow.commit().await.unwrap();

        let view = carts.get_cart(buyer).await.unwrap();
        assert_eq!(view.items[0].unit_price, Money::from_cents(400));
        assert_eq!(view.total_price, Money::from_cents(800));
    }

    #[tokio::test]
    async fn test_update_quantity() {
        let (store, buyer, product) = setup(5).await;
        let carts = CartUseCase::new(store);
        carts.add_to_cart(buyer, product.id, 1).await.unwrap();

        let view = carts
            .update_item_quantity(buyer, product.id, 5)
            .await
            .unwrap();
        assert_eq!(view.items[0].quantity, 5);

        let err = carts
            .update_item_quantity(buyer, product.id, 6)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[tokio::test]
    async fn test_missing_row() {
        let (store, buyer, product) = setup(5).await;
        let carts = CartUseCase::new(store);

        let err = carts
            .update_item_quantity(buyer, product.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CartItemNotFound { .. }));

        let err = carts.remove_item(buyer, product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_item() {
        let (store, buyer, product) = setup(5).await;
        let carts = CartUseCase::new(store);
        carts.add_to_cart(buyer, product.id, 1).await.unwrap();

        let view = carts.remove_item(buyer, product.id).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total_price, Money::zero());
    }

    #[tokio::test]
    async fn test_cart_total_out_of_range_rejected() {
        let (store, buyer, mut product) = setup(10).await;
        let mut uow = store.begin().await.unwrap();
        product
            .apply_update(&ProductUpdate {
                price: Some(Money::from_cents(i64::MAX / 2 + 1)),
                ..ProductUpdate::default()
            })
            .unwrap();
        uow.update_product(&product).await.unwrap();
        uow.commit().await.unwrap();
        let carts = CartUseCase::new(store);

        let err = carts.add_to_cart(buyer, product.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::AmountOverflow)));
        assert_eq!(err.kind(), ErrorKind::InvalidDomain);
        assert!(carts.get_cart(buyer).await.unwrap().items.is_empty());
    }
}
