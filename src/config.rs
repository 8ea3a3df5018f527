//! Configuration for the ingest and server binaries.
//!
//! Recognized environment variables (§6): `DATABASE_PATH`, `USE_RW_DB`,
//! `INCREMENTAL`, `CHECK_FOR_CHANGES`, `CURRENCY_PROVIDER_URL`,
//! `CURRENCY_PROVIDER_KEY`. An optional `kissaten.toml` supplies the same
//! fields, layered under built-in defaults and then overridden by the
//! environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Top-level configuration, assembled from `kissaten.toml` (if present) and
/// then overridden field-by-field by recognized environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Selects the read-write warehouse file over the read-only snapshot.
    #[serde(default)]
    pub use_rw_db: bool,

    /// Loader mode: incremental vs. full refresh.
    #[serde(default)]
    pub incremental: bool,

    /// Enables checksum verification of previously-processed files.
    #[serde(default)]
    pub check_for_changes: bool,

    #[serde(default)]
    pub currency: CurrencySection,

    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencySection {
    /// Base-URL of a provider returning `{ base, rates, timestamp }`.
    #[serde(default = "default_currency_provider")]
    pub provider_url: String,
    /// Opaque API key, if the provider requires one. Never logged.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CurrencySection {
    fn default() -> Self {
        Self {
            provider_url: default_currency_provider(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/kissaten.db")
}

fn default_currency_provider() -> String {
    "https://openexchangerates.org/api/latest.json".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            use_rw_db: false,
            incremental: false,
            check_for_changes: false,
            currency: CurrencySection::default(),
            server: ServerSection::default(),
        }
    }
}

impl Config {
    /// Load `path` (if it exists) as TOML, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))?
            }
            _ => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("USE_RW_DB") {
            self.use_rw_db = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("INCREMENTAL") {
            self.incremental = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("CHECK_FOR_CHANGES") {
            self.check_for_changes = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("CURRENCY_PROVIDER_URL") {
            self.currency.provider_url = v;
        }
        if let Ok(v) = std::env::var("CURRENCY_PROVIDER_KEY") {
            self.currency.api_key = Some(v);
        }
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_paths() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("data/kissaten.db"));
        assert!(!config.use_rw_db);
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("INCREMENTAL", "true");
        let mut config = Config::default();
        config.apply_env();
        assert!(config.incremental);
        std::env::remove_var("INCREMENTAL");
    }
}
