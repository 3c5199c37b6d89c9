//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reward bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Required chain identity and RPC settings.
    pub chain: ChainConfig,

    /// Token contract bound by the EERC mechanism.
    pub token: TokenConfig,

    /// Scoring service location.
    pub backend: BackendConfig,

    /// Which signing authority to bind.
    pub signer: SignerConfig,

    /// Reward policy and consent behaviour.
    pub settlement: SettlementConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds. Must exceed `chain.confirmation_timeout_secs`
    /// so a settling request outlives the receipt wait.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 180,
        }
    }
}

/// Native currency advertised when adding the chain to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NativeCurrencyConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrencyConfig {
    fn default() -> Self {
        Self {
            name: "AVAX".to_string(),
            symbol: "AVAX".to_string(),
            decimals: 18,
        }
    }
}

/// Chain identity and RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain ID as a 0x-prefixed hex string (e.g., "0xa869").
    pub chain_id_hex: String,

    /// Chain ID in decimal; must agree with `chain_id_hex`.
    pub chain_id: u64,

    /// Human-readable chain name.
    pub chain_name: String,

    pub native_currency: NativeCurrencyConfig,

    /// Ordered JSON-RPC endpoints; the first reachable one answers.
    pub rpc_urls: Vec<String>,

    /// Ordered block explorer URLs.
    pub explorer_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Blocks on top of the inclusion block before a receipt is final.
    pub confirmation_blocks: u32,

    /// How long a settlement waits for its receipt.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id_hex: "0xa869".to_string(),
            chain_id: 43113,
            chain_name: "Avalanche Fuji C-Chain".to_string(),
            native_currency: NativeCurrencyConfig::default(),
            rpc_urls: vec!["https://api.avax-test.network/ext/bc/C/rpc".to_string()],
            explorer_urls: vec!["https://testnet.snowtrace.io".to_string()],
            rpc_timeout_secs: 10,
            confirmation_blocks: 0,
            confirmation_timeout_secs: 120,
            poll_interval_ms: 2000,
        }
    }
}

/// Token contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TokenConfig {
    /// ERC-20 contract address. Empty means "not configured".
    pub contract_address: String,
}

/// Scoring service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the scoring service.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5051".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Signing authority selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignerKind {
    /// Prepare-only; `sendPrepared` fails with `NoSigningAuthority`.
    #[default]
    None,
    /// Server-held key read from `BRIDGE_PRIVATE_KEY`.
    ServerKey,
    /// EIP-1193 wallet reachable over JSON-RPC.
    Extension,
}

/// Signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SignerConfig {
    pub kind: SignerKind,

    /// Wallet JSON-RPC endpoint, required when `kind = "extension"`.
    pub extension_url: Option<String>,
}

/// Reward policy and consent gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Whole tokens credited on a positive outcome.
    pub hit_reward: u64,

    /// Whole tokens debited on a negative outcome.
    pub miss_penalty: u64,

    /// Recipient of debits. Empty disables on-chain debits.
    pub treasury_address: String,

    /// Always ask for an explicit decision, even if the scoring
    /// response does not request one.
    pub require_consent: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            hit_reward: 10,
            miss_penalty: 5,
            treasury_address: String::new(),
            require_consent: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
