//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the API bearer token) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::EscrowError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSection,
    pub api: ApiConfig,
    pub risk: RiskConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    /// Wallet address used for action eligibility when no session carries one.
    #[serde(default)]
    pub user_address: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the env var holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `POST /api/risk/insights` on the platform.
    Remote,
    /// A saved dashboard JSON file.
    Snapshot,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default = "default_true")]
    pub refresh_on_start: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later at runtime.
    pub fn validate(&self) -> Result<(), EscrowError> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(EscrowError::Config(format!(
                "api.base_url must be an http(s) URL, got '{base}'"
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(EscrowError::Config("api.timeout_secs must be > 0".into()));
        }
        if self.risk.provider == ProviderKind::Snapshot
            && self.risk.snapshot_path.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            return Err(EscrowError::Config(
                "risk.snapshot_path is required when risk.provider = \"snapshot\"".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// The bearer token, if `api.token_env` names one.
    pub fn api_token(&self) -> Result<Option<SecretString>> {
        match self.api.token_env.as_deref() {
            Some(name) => Ok(Some(SecretString::new(Self::resolve_env(name)?))),
            None => Ok(None),
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
