//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the hex and decimal chain IDs agree
//! - Validate URLs, addresses, and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::{BridgeConfig, SignerKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let chain = &config.chain;

    match parse_hex_chain_id(&chain.chain_id_hex) {
        Some(id) if id != chain.chain_id => errors.push(ValidationError::new(
            "chain.chain_id_hex",
            format!(
                "{} is {} but chain.chain_id is {}",
                chain.chain_id_hex, id, chain.chain_id
            ),
        )),
        Some(_) => {}
        None => errors.push(ValidationError::new(
            "chain.chain_id_hex",
            format!("'{}' is not a 0x-prefixed hex number", chain.chain_id_hex),
        )),
    }

    if chain.rpc_urls.is_empty() {
        errors.push(ValidationError::new("chain.rpc_urls", "at least one RPC URL is required"));
    }
    for url in chain.rpc_urls.iter().chain(chain.explorer_urls.iter()) {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new("chain.rpc_urls", format!("invalid URL '{}'", url)));
        }
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "chain.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }
    if chain.poll_interval_ms == 0 {
        errors.push(ValidationError::new("chain.poll_interval_ms", "must be greater than 0"));
    }
    if config.listener.request_timeout_secs <= chain.confirmation_timeout_secs {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!(
                "{}s must exceed chain.confirmation_timeout_secs ({}s)",
                config.listener.request_timeout_secs, chain.confirmation_timeout_secs
            ),
        ));
    }

    check_optional_address(&config.token.contract_address, "token.contract_address", &mut errors);
    check_optional_address(
        &config.settlement.treasury_address,
        "settlement.treasury_address",
        &mut errors,
    );

    if url::Url::parse(&config.backend.base_url).is_err() {
        errors.push(ValidationError::new(
            "backend.base_url",
            format!("invalid URL '{}'", config.backend.base_url),
        ));
    }

    if config.signer.kind == SignerKind::Extension {
        match &config.signer.extension_url {
            Some(url) if url::Url::parse(url).is_ok() => {}
            Some(url) => errors.push(ValidationError::new(
                "signer.extension_url",
                format!("invalid URL '{}'", url),
            )),
            None => errors.push(ValidationError::new(
                "signer.extension_url",
                "required when signer.kind = \"extension\"",
            )),
        }
    }

    if config.settlement.hit_reward == 0 || config.settlement.miss_penalty == 0 {
        errors.push(ValidationError::new(
            "settlement",
            "hit_reward and miss_penalty must be non-zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a 0x-prefixed hex chain id, case-insensitively.
pub fn parse_hex_chain_id(hex: &str) -> Option<u64> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

fn check_optional_address(value: &str, field: &'static str, errors: &mut Vec<ValidationError>) {
    if !value.is_empty() && value.parse::<Address>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn test_chain_id_disagreement() {
        let mut config = BridgeConfig::default();
        config.chain.chain_id = 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "chain.chain_id_hex");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BridgeConfig::default();
        config.chain.rpc_urls.clear();
        config.chain.rpc_timeout_secs = 0;
        config.token.contract_address = "0x1234".into();
        config.signer.kind = SignerKind::Extension;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_request_timeout_must_outlast_confirmation_wait() {
        let mut config = BridgeConfig::default();
        config.listener.request_timeout_secs = config.chain.confirmation_timeout_secs;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "listener.request_timeout_secs");

        config.listener.request_timeout_secs = config.chain.confirmation_timeout_secs + 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_parse_hex_chain_id() {
        assert_eq!(parse_hex_chain_id("0xA869"), Some(43113));
        assert_eq!(parse_hex_chain_id("0xa869"), Some(43113));
        assert_eq!(parse_hex_chain_id("43113"), None);
    }
}
