use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_cache_capacity: usize,
    /// Argon2 memory cost in KiB.
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub max_page_size: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite:data/social_graph.db".to_string()),
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "SERVER_PORT", 3000),
            },
            auth: AuthConfig {
                token_cache_capacity: parse_or(&lookup, "TOKEN_CACHE_CAPACITY", 1024),
                password_hash_memory_kib: parse_or(&lookup, "PASSWORD_HASH_MEMORY_KIB", 19456),
                password_hash_iterations: parse_or(&lookup, "PASSWORD_HASH_ITERATIONS", 2),
            },
            pagination: PaginationConfig {
                max_page_size: parse_or(&lookup, "MAX_PAGE_SIZE", 100),
            },
        };

        if config.database.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if config.pagination.max_page_size == 0 {
            anyhow::bail!("MAX_PAGE_SIZE must be at least 1");
        }

        Ok(config)
    }

    /// In-memory store with cheap password hashing, for tests and local experiments.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            auth: AuthConfig {
                token_cache_capacity: 64,
                password_hash_memory_kib: 64,
                password_hash_iterations: 1,
            },
            pagination: PaginationConfig { max_page_size: 100 },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database.url, "sqlite:data/social_graph.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.server_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "8080"),
            ("TOKEN_CACHE_CAPACITY", "not-a-number"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_cache_capacity, 1024);
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("MAX_PAGE_SIZE", "0")])).is_err());
    }
}
