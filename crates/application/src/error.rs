//! Application error types.

use common::ProductId;
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// The failure categories callers can react to.
///
/// Every [`AppError`] falls into exactly one kind; the HTTP layer maps
/// kinds to status codes and the retry policy keys off
/// [`ErrorKind::ConcurrentModification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    InsufficientStock,
    InvalidDomain,
    ConcurrentModification,
    AlreadyExists,
    InvalidCredentials,
    Inactive,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PermissionDenied => "FORBIDDEN",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::InvalidDomain => "BAD_REQUEST",
            ErrorKind::ConcurrentModification => "CONFLICT",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::InvalidCredentials => "UNAUTHORIZED",
            ErrorKind::Inactive => "INACTIVE_USER",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Errors returned by use cases.
#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The user's cart holds no row for the product.
    #[error("Cart item not found for product {product_id}")]
    CartItemNotFound { product_id: ProductId },

    #[error("Email is already registered")]
    EmailAlreadyExists,

    #[error("User is already registered as a seller")]
    SellerAlreadyExists,

    /// The caller has no seller profile.
    #[error("Seller registration required")]
    NotASeller,

    /// Unknown email, wrong password, or an unknown or expired token.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Inactive user")]
    Inactive,

    /// Password hashing or token machinery failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        AppError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } | AppError::CartItemNotFound { .. } => ErrorKind::NotFound,
            AppError::EmailAlreadyExists | AppError::SellerAlreadyExists => {
                ErrorKind::AlreadyExists
            }
            AppError::NotASeller => ErrorKind::PermissionDenied,
            AppError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AppError::Inactive => ErrorKind::Inactive,
            AppError::Auth(_) => ErrorKind::Internal,
            AppError::Domain(err) => match err {
                DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                DomainError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
                _ => ErrorKind::InvalidDomain,
            },
            AppError::Store(err) => match err {
                StoreError::ConcurrencyConflict { .. } => ErrorKind::ConcurrentModification,
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::Duplicate { .. } => ErrorKind::AlreadyExists,
                _ => ErrorKind::Internal,
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::ConcurrentModification
    }
}

/// Convenience type alias for use case results.
pub type Result<T> = std::result::Result<T, AppError>;
