use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Runtime configuration, read from `INVOICE_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// SQLite database file; `:memory:` keeps everything in memory
    pub database_path: String,
    /// Insert the demo user, customers and invoices at startup
    pub seed_demo_data: bool,
    /// Maximum number of rendered pages kept in the page cache
    pub page_cache_capacity: usize,
    /// Directory served under `/static`
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_path: "invoices.db".to_string(),
            seed_demo_data: true,
            page_cache_capacity: 64,
            static_dir: "./src/web/static".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(addr) = lookup("INVOICE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("INVOICE_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Some(raw) = lookup("INVOICE_SEED_DEMO_DATA") {
            config.seed_demo_data = parse_bool("INVOICE_SEED_DEMO_DATA", &raw)?;
        }
        if let Some(raw) = lookup("INVOICE_PAGE_CACHE_CAPACITY") {
            config.page_cache_capacity = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "INVOICE_PAGE_CACHE_CAPACITY".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(dir) = lookup("INVOICE_STATIC_DIR") {
            config.static_dir = dir;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("INVOICE_BIND_ADDR", "0.0.0.0:3000"),
            ("INVOICE_DATABASE_PATH", ":memory:"),
            ("INVOICE_SEED_DEMO_DATA", "off"),
            ("INVOICE_PAGE_CACHE_CAPACITY", "8"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database_path, ":memory:");
        assert!(!config.seed_demo_data);
        assert_eq!(config.page_cache_capacity, 8);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("INVOICE_SEED_DEMO_DATA", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("INVOICE_SEED_DEMO_DATA"));

        let err = AppConfig::from_lookup(lookup_from(&[("INVOICE_PAGE_CACHE_CAPACITY", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
