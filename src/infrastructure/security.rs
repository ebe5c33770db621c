// Password hashing and opaque bearer tokens

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

use crate::config::AuthConfig;
use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::traits::TokenRepository;

/// 30 random bytes encode to 40 URL-safe characters.
const TOKEN_BYTES: usize = 30;

/// Hashed once and verified against when a login names an unknown user.
const DUMMY_PASSWORD: &str = "social-graph-dummy-password";

/// Argon2id hasher. CPU-heavy work runs on the blocking pool.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let params = Params::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            1,
            None,
        )
        .map_err(|e| AppError::ConfigurationError(format!("Invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            let hash = argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?;
            Ok(hash.to_string())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
    }

    /// Parameters are read back from the encoded hash, so old hashes keep verifying after a config change.
    pub async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash)
                .map_err(|e| AppError::Internal(format!("Invalid stored hash: {}", e)))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
    }

    /// Spend the same argon2 work as a real check. Always false.
    pub async fn verify_dummy(&self, password: &str) -> AppResult<bool> {
        let dummy_hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await?;
        self.verify(password, dummy_hash).await?;
        Ok(false)
    }
}

pub fn generate_token_key() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Issues tokens and resolves them back to users, fronted by an LRU cache.
pub struct TokenAuthenticator {
    tokens: Arc<dyn TokenRepository>,
    cache: Mutex<Cache<String, UserId>>,
}

impl TokenAuthenticator {
    pub fn new(tokens: Arc<dyn TokenRepository>, cache_capacity: usize) -> Self {
        Self {
            tokens,
            cache: Mutex::new(Cache::new(cache_capacity)),
        }
    }

    /// The same key is returned on every call for a given user.
    #[instrument(skip(self))]
    pub async fn issue_token(&self, user: UserId) -> AppResult<String> {
        let key = self
            .tokens
            .get_or_create_token(user, &generate_token_key())
            .await?;
        self.cache.lock().await.insert(key.clone(), user);
        Ok(key)
    }

    /// The cache lock is held across the store lookup on a miss, so a `forget_user`
    /// issued after the account row is gone can never be overtaken by a stale insert.
    pub async fn authenticate(&self, key: &str) -> AppResult<Option<UserId>> {
        let key = key.to_string();
        let mut cache = self.cache.lock().await;
        if let Some(user) = cache.get(&key).copied() {
            return Ok(Some(user));
        }

        let user = self.tokens.resolve_token(&key).await?;
        if let Some(user) = user {
            debug!("Token cache miss for user {}", user);
            cache.insert(key, user);
        }
        Ok(user)
    }

    /// Evict every cached key of a user. Call after the account is deleted.
    pub async fn forget_user(&self, user: UserId) {
        self.cache.lock().await.retain_values(|cached| *cached != user);
    }
}
