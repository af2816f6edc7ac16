//! Password hashing and access tokens.
//!
//! Both concerns sit behind traits so use cases never touch key material
//! directly. The production implementations are [`Argon2PasswordHasher`]
//! and [`SessionTokenIssuer`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordVerifier};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use common::UserId;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

/// Random bytes per session token.
const TOKEN_BYTES: usize = 32;

/// Settings for password hashing and token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Pepper mixed into every password hash. Empty disables it.
    pub secret: String,
    pub token_ttl: Duration,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl: Duration::from_secs(30 * 60),
            hash_memory_kib: Params::DEFAULT_M_COST,
            hash_iterations: Params::DEFAULT_T_COST,
        }
    }
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// Returns `Ok(false)` on a mismatch and `Err` only when the stored
    /// digest itself is unusable.
    fn verify(&self, password: &str, digest: &str) -> Result<bool>;
}

/// Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    secret: Vec<u8>,
    params: Params,
}

impl Argon2PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| AppError::Auth(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            secret: config.secret.as_bytes().to_vec(),
            params,
        })
    }

    fn argon2(&self) -> Result<Argon2<'_>> {
        if self.secret.is_empty() {
            return Ok(Argon2::new(
                Algorithm::Argon2id,
                argon2::Version::V0x13,
                self.params.clone(),
            ));
        }
        Argon2::new_with_secret(
            &self.secret,
            Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| AppError::Auth(format!("invalid argon2 secret: {e}")))
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    #[tracing::instrument(skip_all, err(Display))]
    fn hash(&self, password: &str) -> Result<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut SaltRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Auth(format!("password hashing failed: {e}")))
    }

    #[tracing::instrument(skip_all, err(Display))]
    fn verify(&self, password: &str, digest: &str) -> Result<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::Auth(format!("stored password hash is malformed: {e}")))?;
        match self.argon2()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Auth(format!("password verification failed: {e}"))),
        }
    }
}

/// What a valid token proves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// The account's email.
    pub subject: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Issues and resolves bearer tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, user_id: UserId, subject: &str) -> Result<AccessToken>;

    /// Resolves a token. Unknown and expired tokens yield `None`.
    async fn verify(&self, token: &str) -> Option<TokenClaims>;

    /// Invalidates a token. Unknown tokens are ignored.
    async fn revoke(&self, token: &str);
}

/// Opaque random tokens backed by an in-process session table.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    ttl: chrono::Duration,
    sessions: Arc<RwLock<HashMap<String, TokenClaims>>>,
}

impl SessionTokenIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drops every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, claims| !claims.is_expired(now));
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[async_trait]
impl TokenIssuer for SessionTokenIssuer {
    async fn issue(&self, user_id: UserId, subject: &str) -> Result<AccessToken> {
        let token = generate_token();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = TokenClaims {
            subject: subject.to_string(),
            user_id,
            expires_at,
        };
        self.sessions.write().await.insert(token.clone(), claims);
        tracing::debug!(user_id = %user_id, "session token issued");
        Ok(AccessToken {
            access_token: token,
            token_type: "bearer",
            expires_at,
        })
    }

    async fn verify(&self, token: &str) -> Option<TokenClaims> {
        let claims = self.sessions.read().await.get(token).cloned()?;
        if claims.is_expired(Utc::now()) {
            self.sessions.write().await.remove(token);
            return None;
        }
        Some(claims)
    }

    async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}
