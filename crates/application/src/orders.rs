//! Order placement and cancellation.
//!
//! Placing an order takes stock from every product it names, and
//! cancelling gives it back. Both run inside a single unit of work, so a
//! failure on any line leaves every product and the cart untouched.
//! Product and order rows are versioned; a lost race surfaces as a
//! concurrent-modification error, and the [`RetryPolicy`] re-runs the
//! whole attempt against fresh rows.

use common::{OrderId, ProductId, UserId};
use domain::{DomainError, NewOrder, Order, OrderLine};
use store::{
    CartRepository, OrderRepository, Page, ProductRepository, Store, UnitOfWork,
};

use crate::error::{AppError, Result};
use crate::retry::RetryPolicy;

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

pub struct OrderUseCase<S: Store> {
    store: S,
    retry: RetryPolicy,
}

/// Takes stock for each line in request order and persists the order.
///
/// Each line's unit price is captured from the product as it is read, in
/// the same unit that decrements its stock.
async fn place_order<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    lines: &[OrderLineRequest],
) -> Result<Order> {
    let mut draft = NewOrder::new(user_id);
    for line in lines {
        let mut product = uow
            .product_by_id(line.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", line.product_id))?;

        draft.push(OrderLine::capture(&product, line.quantity)?)?;
        product.decrease_stock(line.quantity)?;
        uow.update_product(&product).await?;
    }
    Ok(uow.create_order(draft).await?)
}

impl<S: Store> OrderUseCase<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Places an order for the given lines and drops the ordered products
    /// from the user's cart. Other cart rows are kept.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        lines: Vec<OrderLineRequest>,
    ) -> Result<Order> {
        if lines.is_empty() {
            return Err(DomainError::NoItems.into());
        }
        let lines = lines.as_slice();
        let order = self
            .retry
            .run("create_order", move || self.try_create_order(user_id, lines))
            .await?;

        self.record_created(&order);
        Ok(order)
    }

    async fn try_create_order(&self, user_id: UserId, lines: &[OrderLineRequest]) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let order = place_order(&mut uow, user_id, lines).await?;

        let product_ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        uow.delete_cart_items_for_products(user_id, &product_ids)
            .await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Orders the whole cart and empties it.
    #[tracing::instrument(skip(self))]
    pub async fn create_order_from_cart(&self, user_id: UserId) -> Result<Order> {
        let order = self
            .retry
            .run("create_order_from_cart", move || {
                self.try_create_order_from_cart(user_id)
            })
            .await?;

        self.record_created(&order);
        Ok(order)
    }

    async fn try_create_order_from_cart(&self, user_id: UserId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let lines: Vec<OrderLineRequest> = uow
            .cart_items(user_id)
            .await?
            .into_iter()
            .map(|item| OrderLineRequest::new(item.product_id, item.quantity))
            .collect();
        if lines.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }

        let order = place_order(&mut uow, user_id, &lines).await?;
        uow.clear_cart(user_id).await?;
        uow.commit().await?;
        Ok(order)
    }

    fn record_created(&self, order: &Order) {
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            items = order.items.len(),
            total_price = %order.total_price,
            "order created"
        );
    }

    /// Loads one of the caller's orders.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let order = uow
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order", order_id))?;
        order.verify_owner(user_id)?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId, page: Page) -> Result<Vec<Order>> {
        let mut uow = self.store.begin().await?;
        Ok(uow.list_orders_by_user(user_id, page).await?)
    }

    /// Cancels a pending or paid order and returns its stock.
    ///
    /// Cancelling twice fails the second time with an invalid state
    /// transition.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self
            .retry
            .run("cancel_order", move || self.try_cancel_order(user_id, order_id))
            .await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id, user_id = %user_id, "order cancelled");
        Ok(order)
    }

    async fn try_cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .order_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order", order_id))?;

        order.verify_owner(user_id)?;
        order.cancel()?;

        for item in &order.items {
            let mut product = uow
                .product_by_id(item.product_id)
                .await?
                .ok_or_else(|| AppError::not_found("product", item.product_id))?;
            product.increase_stock(item.quantity)?;
            uow.update_product(&product).await?;
        }

        let cancelled = uow.update_order(&order).await?;
        uow.commit().await?;
        Ok(cancelled)
    }
}
