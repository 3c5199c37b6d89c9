//! Required chain identity, in the shape wallets expect for `wallet_addEthereumChain`.

use serde::{Deserialize, Serialize};

use crate::config::validation::parse_hex_chain_id;
use crate::config::{ChainConfig, NativeCurrencyConfig};
use crate::error::ConfigurationError;

/// Native currency descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl From<&NativeCurrencyConfig> for NativeCurrency {
    fn from(config: &NativeCurrencyConfig) -> Self {
        Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
        }
    }
}

/// The chain a signer must be on before anything is signed.
///
/// Serializes to the EIP-3085 parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainIdentity {
    #[serde(rename = "chainId")]
    pub chain_id_hex: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainIdentity {
    /// Build from validated chain configuration.
    pub fn from_config(config: &ChainConfig) -> Result<Self, ConfigurationError> {
        if parse_hex_chain_id(&config.chain_id_hex) != Some(config.chain_id) {
            return Err(ConfigurationError::InvalidValue {
                field: "chain.chain_id_hex".to_string(),
                reason: format!(
                    "{} does not match chain id {}",
                    config.chain_id_hex, config.chain_id
                ),
            });
        }
        Ok(Self {
            chain_id_hex: canonical_hex(config.chain_id),
            chain_name: config.chain_name.clone(),
            native_currency: NativeCurrency::from(&config.native_currency),
            rpc_urls: config.rpc_urls.clone(),
            block_explorer_urls: config.explorer_urls.clone(),
        })
    }

    /// Numeric chain id. Construction guarantees the hex form parses.
    pub fn chain_id(&self) -> u64 {
        parse_hex_chain_id(&self.chain_id_hex).unwrap_or_default()
    }

    /// True when `chain_id` refers to this chain.
    pub fn matches(&self, chain_id: u64) -> bool {
        self.chain_id() == chain_id
    }
}

/// Lowercase 0x-prefixed hex without leading zeros, as wallets report it.
pub fn canonical_hex(chain_id: u64) -> String {
    format!("{:#x}", chain_id)
}
