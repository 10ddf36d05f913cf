//! Process configuration read from environment variables.

use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-insecure-secret-change-me";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_PAYMENT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub redis_url: String,
    pub payment_timeout: Duration,
    pub allow_tenant_header: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let use_persistent_stores = parse_flag(&lookup, "USE_PERSISTENT_STORES")?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let payment_timeout = match lookup("PAYMENT_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "PAYMENT_TIMEOUT_MS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_millis(DEFAULT_PAYMENT_TIMEOUT_MS),
        };

        let allow_tenant_header = parse_flag(&lookup, "ALLOW_TENANT_HEADER")?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            use_persistent_stores,
            database_url,
            redis_url,
            payment_timeout,
            allow_tenant_header,
        })
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(!config.use_persistent_stores);
        assert_eq!(config.database_url, None);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.payment_timeout, Duration::from_millis(5_000));
        assert!(!config.allow_tenant_header);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/forgecart"),
            ("REDIS_URL", "redis://cache:6380"),
            ("PAYMENT_TIMEOUT_MS", "250"),
            ("ALLOW_TENANT_HEADER", "1"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(config.use_persistent_stores);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/forgecart"));
        assert_eq!(config.redis_url, "redis://cache:6380");
        assert_eq!(config.payment_timeout, Duration::from_millis(250));
        assert!(config.allow_tenant_header);
    }

    #[test]
    fn persistent_mode_requires_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[("USE_PERSISTENT_STORES", "yes")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("PAYMENT_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PAYMENT_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("PAYMENT_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PAYMENT_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("ALLOW_TENANT_HEADER", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ALLOW_TENANT_HEADER", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("BIND_ADDR", "not-an-addr")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));
    }
}
