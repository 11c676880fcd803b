use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

/// Key material used to verify bearer tokens.
#[derive(Debug, Clone)]
pub enum JwtKey {
    Secret(String),
    RsaPublicPem(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub jwt_key: JwtKey,
    pub jwt_audience: Option<String>,
    pub webhook_secret: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("mysql") => StoreBackend::MySql,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                value: v.clone(),
            })?,
            None => 5,
        };

        let run_migrations = match get("RUN_MIGRATIONS").as_deref() {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "RUN_MIGRATIONS",
                    value: other.to_string(),
                })
            }
        };

        let jwt_key = match (get("AUTH_JWT_PUBLIC_KEY"), get("AUTH_JWT_SECRET")) {
            (Some(pem), _) => JwtKey::RsaPublicPem(pem),
            (None, Some(secret)) => JwtKey::Secret(secret),
            (None, None) => return Err(ConfigError::Missing("AUTH_JWT_SECRET")),
        };

        let webhook_secret = get("WEBHOOK_SECRET").ok_or(ConfigError::Missing("WEBHOOK_SECRET"))?;

        Ok(Config {
            store_backend,
            database_url,
            database_max_connections,
            run_migrations,
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            upload_dir: PathBuf::from(
                get("UPLOAD_DIR").unwrap_or_else(|| "./public/uploads".to_string()),
            ),
            jwt_key,
            jwt_audience: get("AUTH_JWT_AUDIENCE"),
            webhook_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn mysql_backend_requires_database_url() {
        let err = Config::from_lookup(lookup(&[
            ("AUTH_JWT_SECRET", "s"),
            ("WEBHOOK_SECRET", "whsec_c2VjcmV0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn memory_backend_with_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("AUTH_JWT_SECRET", "s"),
            ("WEBHOOK_SECRET", "whsec_c2VjcmV0"),
        ]))
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database_max_connections, 5);
        assert!(config.run_migrations);
        assert!(matches!(config.jwt_key, JwtKey::Secret(_)));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = Config::from_lookup(lookup(&[("STORE_BACKEND", "mongo")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "STORE_BACKEND", .. }));
    }
}
