//! User accounts.

use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Buyer,
    Seller,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Seller => "seller",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown user role: {0}")]
pub struct ParseUserRoleError(pub String);

impl std::str::FromStr for UserRole {
    type Err = ParseUserRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(UserRole::Buyer),
            "seller" => Ok(UserRole::Seller),
            "admin" => Ok(UserRole::Admin),
            other => Err(ParseUserRoleError(other.to_string())),
        }
    }
}

/// A registered account. The password is only ever held as a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub is_active: bool,
    pub role: UserRole,
}

impl User {
    pub fn is_seller(&self) -> bool {
        self.role == UserRole::Seller
    }

    /// Grants the seller role. Sellers keep their role; admins are left alone.
    pub fn promote_to_seller(&mut self) {
        if self.role == UserRole::Buyer {
            self.role = UserRole::Seller;
        }
    }

    pub fn update_info(&mut self, full_name: Option<String>) {
        if let Some(full_name) = full_name {
            self.full_name = Some(full_name);
        }
    }

    pub fn set_password_hash(&mut self, hashed_password: String) {
        self.hashed_password = hashed_password;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

impl NewUser {
    /// Normalizes and validates the email; the password must already be hashed.
    pub fn new(
        email: &str,
        full_name: Option<String>,
        hashed_password: String,
    ) -> Result<Self, DomainError> {
        let email = normalize_email(email)?;
        Ok(Self {
            email,
            full_name,
            hashed_password,
        })
    }
}

/// Trims and lower-cases an address, rejecting anything without a
/// `local@domain` shape.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::Blank { field: "email" });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::InvalidEmail { email }),
    }
}
