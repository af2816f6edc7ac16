//! Catalog use cases.

use common::{ProductId, SellerId};
use domain::{Money, NewProduct, Product, ProductUpdate};
use store::{ProductQuery, ProductRepository, Store, UnitOfWork};

use crate::error::{AppError, Result};
use crate::retry::RetryPolicy;

/// Fields a seller supplies for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
}

/// Creates, reads and updates catalog products.
pub struct ProductUseCase<S: Store> {
    store: S,
    retry: RetryPolicy,
}

impl<S: Store> ProductUseCase<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, seller_id: SellerId, input: NewProductInput) -> Result<Product> {
        let new_product = NewProduct::new(
            seller_id,
            input.name,
            input.description,
            input.price,
            input.stock,
        )?;

        let mut uow = self.store.begin().await?;
        let product = uow.create_product(new_product).await?;
        uow.commit().await?;

        tracing::info!(product_id = %product.id, seller_id = %seller_id, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        let mut uow = self.store.begin().await?;
        uow.product_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", product_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let mut uow = self.store.begin().await?;
        Ok(uow.list_products(query).await?)
    }

    /// Applies the present fields of `update` to a product the seller owns.
    ///
    /// Runs under the retry policy: a concurrent write to the same product
    /// makes the attempt re-read the row and re-apply the patch.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        seller_id: SellerId,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        let update = &update;
        let product = self
            .retry
            .run("update_product", move || {
                self.try_update_product(seller_id, product_id, update)
            })
            .await?;

        metrics::counter!("products_updated_total").increment(1);
        tracing::info!(
            product_id = %product.id,
            version = %product.version,
            stock = product.stock,
            "product updated"
        );
        Ok(product)
    }

    async fn try_update_product(
        &self,
        seller_id: SellerId,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product> {
        let mut uow = self.store.begin().await?;
        let mut product = uow
            .product_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", product_id))?;

        product.verify_owner(seller_id)?;
        if update.is_empty() {
            return Ok(product);
        }
        product.apply_update(update)?;

        let updated = uow.update_product(&product).await?;
        uow.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use common::Version;
    use domain::{NewSeller, NewUser};
    use store::{InMemoryStore, SellerRepository, UserRepository};

    use super::*;
    use crate::error::ErrorKind;

    async fn seller(store: &InMemoryStore) -> SellerId {
        let mut uow = store.begin().await.unwrap();
        let user = uow
            .create_user(NewUser::new("seller@example.com", None, "digest".to_string()).unwrap())
            .await
            .unwrap();
        let seller = uow
            .create_seller(NewSeller::new(user.id, "Shop".to_string(), None).unwrap())
            .await
            .unwrap();
        uow.commit().await.unwrap();
        seller.id
    }

    fn input(price: i64, stock: u32) -> NewProductInput {
        NewProductInput {
            name: "Keyboard".to_string(),
            description: None,
            price: Money::from_cents(price),
            stock,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store, RetryPolicy::default());

        let created = use_case
            .create_product(seller_id, input(10_000, 100))
            .await
            .unwrap();
        assert_eq!(created.version, Version::first());

        let fetched = use_case.get_product(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_price() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store, RetryPolicy::default());

        let err = use_case
            .create_product(seller_id, input(0, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDomain);
    }

    #[tokio::test]
    async fn test_get_missing_product() {
        let use_case = ProductUseCase::new(InMemoryStore::new(), RetryPolicy::default());
        let err = use_case.get_product(ProductId::new(404)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_partial_update_leaves_absent_fields() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store, RetryPolicy::default());
        let created = use_case
            .create_product(seller_id, input(500, 3))
            .await
            .unwrap();

        let updated = use_case
            .update_product(
                seller_id,
                created.id,
                ProductUpdate {
                    stock: Some(9),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, 9);
        assert_eq!(updated.price, Money::from_cents(500));
        assert_eq!(updated.name, "Keyboard");
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store.clone(), RetryPolicy::default());
        let created = use_case
            .create_product(seller_id, input(500, 3))
            .await
            .unwrap();
        let commits = store.commit_count();

        let unchanged = use_case
            .update_product(seller_id, created.id, ProductUpdate::default())
            .await
            .unwrap();

        assert_eq!(unchanged, created);
        assert_eq!(unchanged.version, Version::first());
        assert_eq!(store.commit_count(), commits);
    }

    #[tokio::test]
    async fn test_empty_patch_still_checks_owner() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store, RetryPolicy::default());
        let created = use_case
            .create_product(seller_id, input(500, 3))
            .await
            .unwrap();

        let err = use_case
            .update_product(SellerId::new(999), created.id, ProductUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_rejected_patch_changes_nothing() {
        let store = InMemoryStore::new();
        let seller_id = seller(&store).await;
        let use_case = ProductUseCase::new(store, RetryPolicy::default());
        let created = use_case
            .create_product(seller_id, input(500, 3))
            .await
            .unwrap();

        let err = use_case
            .update_product(
                seller_id,
                created.id,
                ProductUpdate {
                    name: Some("Renamed".to_string()),
                    stock: Some(-1),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDomain);

        let stored = use_case.get_product(created.id).await.unwrap();
        assert_eq!(stored, created);
    }
}
