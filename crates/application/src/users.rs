//! Accounts, login and bearer-token authentication.

use common::UserId;
use domain::{DomainError, NewUser, User, user::normalize_email};
use store::{Store, UnitOfWork, UserRepository};

use crate::auth::{AccessToken, PasswordHasher, TokenIssuer};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Optional account changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub password: Option<String>,
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(DomainError::Blank { field: "password" }.into());
    }
    Ok(())
}

pub struct UserUseCase<S: Store, H: PasswordHasher, T: TokenIssuer> {
    store: S,
    hasher: H,
    tokens: T,
}

impl<S, H, T> UserUseCase<S, H, T>
where
    S: Store,
    H: PasswordHasher,
    T: TokenIssuer,
{
    pub fn new(store: S, hasher: H, tokens: T) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: NewUserInput) -> Result<User> {
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;

        let mut uow = self.store.begin().await?;
        if uow.user_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let digest = self.hasher.hash(&input.password)?;
        let user = uow
            .create_user(NewUser::new(&email, input.full_name, digest)?)
            .await?;
        uow.commit().await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Checks credentials and issues a bearer token.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken> {
        let Ok(email) = normalize_email(email) else {
            return Err(AppError::InvalidCredentials);
        };

        let mut uow = self.store.begin().await?;
        let user = uow
            .user_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.hashed_password)? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::Inactive);
        }

        self.tokens.issue(user.id, &user.email).await
    }

    /// Resolves a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self
            .tokens
            .verify(token)
            .await
            .ok_or(AppError::InvalidCredentials)?;

        let mut uow = self.store.begin().await?;
        let user = uow
            .user_by_id(claims.user_id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AppError::Inactive);
        }
        Ok(user)
    }

    pub async fn logout(&self, token: &str) {
        self.tokens.revoke(token).await;
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        let mut uow = self.store.begin().await?;
        uow.user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_user(&self, user_id: UserId, update: UserUpdate) -> Result<User> {
        let digest = match &update.password {
            Some(password) => {
                validate_password(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let mut uow = self.store.begin().await?;
        let mut user = uow
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;

        if let Some(digest) = digest {
            user.set_password_hash(digest);
        }
        user.update_info(update.full_name);

        let updated = uow.update_user(&user).await?;
        uow.commit().await?;
        Ok(updated)
    }
}
