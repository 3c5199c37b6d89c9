//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::BridgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, apply environment overrides, and validate configuration.
///
/// Without a path the defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => BridgeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment-style overrides on top of file configuration.
///
/// `lookup` is injected so tests do not touch the process environment.
pub fn apply_env_overrides<F>(config: &mut BridgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(hex) = get("CHAIN_ID_HEX") {
        config.chain.chain_id_hex = hex.trim().to_string();
    }
    if let Some(dec) = get("CHAIN_ID_DEC") {
        match dec.trim().parse() {
            Ok(id) => config.chain.chain_id = id,
            Err(_) => tracing::warn!(value = %dec, "Ignoring non-numeric CHAIN_ID_DEC"),
        }
    }
    if let Some(name) = get("CHAIN_NAME") {
        config.chain.chain_name = name;
    }
    if let Some(urls) = get("RPC_URLS") {
        config.chain.rpc_urls = split_list(&urls);
    }
    if let Some(urls) = get("EXPLORERS") {
        config.chain.explorer_urls = split_list(&urls);
    }
    if let Some(address) = get("TOKEN_ADDRESS").or_else(|| get("EERC_CONTRACT")) {
        config.token.contract_address = address.trim().to_string();
    }
    if let Some(url) = get("BACKEND_URL") {
        config.backend.base_url = url.trim().to_string();
    }
    if let Some(url) = get("WALLET_ENDPOINT") {
        config.signer.extension_url = Some(url.trim().to_string());
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
