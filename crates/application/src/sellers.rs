//! Seller onboarding.

use common::UserId;
use domain::{NewSeller, Seller, SellerUpdate};
use store::{SellerRepository, Store, UnitOfWork, UserRepository};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSellerInput {
    pub store_name: String,
    pub description: Option<String>,
}

pub struct SellerUseCase<S: Store> {
    store: S,
}

impl<S: Store> SellerUseCase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates the user's seller profile and grants the seller role in
    /// the same unit.
    #[tracing::instrument(skip(self, input))]
    pub async fn register_seller(&self, user_id: UserId, input: NewSellerInput) -> Result<Seller> {
        let mut uow = self.store.begin().await?;
        let mut user = uow
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;

        if uow.seller_by_user(user_id).await?.is_some() {
            return Err(AppError::SellerAlreadyExists);
        }

        let seller = uow
            .create_seller(NewSeller::new(user_id, input.store_name, input.description)?)
            .await?;
        user.promote_to_seller();
        uow.update_user(&user).await?;
        uow.commit().await?;

        tracing::info!(user_id = %user_id, seller_id = %seller.id, "seller registered");
        Ok(seller)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_seller(&self, user_id: UserId) -> Result<Seller> {
        let mut uow = self.store.begin().await?;
        uow.seller_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("seller", user_id))
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_seller(&self, user_id: UserId, update: SellerUpdate) -> Result<Seller> {
        let mut uow = self.store.begin().await?;
        let mut seller = uow
            .seller_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("seller", user_id))?;

        seller.update_info(update)?;
        let updated = uow.update_seller(&seller).await?;
        uow.commit().await?;
        Ok(updated)
    }

    /// Resolves the caller's seller profile for catalog writes.
    pub async fn require_seller(&self, user_id: UserId) -> Result<Seller> {
        let mut uow = self.store.begin().await?;
        uow.seller_by_user(user_id)
            .await?
            .ok_or(AppError::NotASeller)
    }
}
