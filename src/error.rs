//! Error taxonomy shared by every subsystem.
//!
//! # Categories
//! - `Configuration`: missing wallet endpoint, missing contract address. Fatal, never retried.
//! - `Validation`: caller mistakes (`MissingParameter`, `InvalidAddress`, `MalformedCall`).
//! - `ChainMismatch`: reconciliation failed; the current signing attempt is abandoned.
//! - `Network`: read/broadcast failures and unreachable endpoints. No retry in the core.
//! - `SettlementConflict`: a decision addressed to a cycle that is no longer current.
//!
//! All errors are values. The only unrecoverable condition is a missing signing
//! authority when `sendPrepared` is invoked, reported as `NoSigningAuthority`.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Deployment is missing something it needs to operate.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Caller supplied bad input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Signer could not be brought onto the required chain.
    #[error("Chain mismatch: required {required}, signer is on {actual}")]
    ChainMismatch { required: u64, actual: u64 },

    /// RPC, wallet transport or broadcast failure.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Wallet rejected a request with a JSON-RPC error object.
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletRpcError),

    /// A mechanism was used before `init` completed.
    #[error("Mechanism '{0}' is not initialized")]
    NotInitialized(String),

    /// No signer is bound to the mechanism.
    #[error("No signing authority configured")]
    NoSigningAuthority,

    /// Decision or evaluation addressed to a stale or busy cycle.
    #[error("Settlement conflict: {0}")]
    SettlementConflict(String),

    /// Scoring service returned something that is not a scoring response.
    #[error("Backend decode error: {0}")]
    BackendDecode(String),

    /// Reward-preparation service returned a transaction without `to`/`data`.
    #[error("Malformed prepared transaction: {0}")]
    MalformedPreparedTx(String),
}

impl BridgeError {
    /// Stable machine-readable kind used in HTTP error bodies and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "configuration_error",
            BridgeError::Validation(_) => "validation_error",
            BridgeError::ChainMismatch { .. } => "chain_mismatch",
            BridgeError::Network(_) => "network_error",
            BridgeError::Wallet(_) => "wallet_error",
            BridgeError::NotInitialized(_) => "not_initialized",
            BridgeError::NoSigningAuthority => "no_signing_authority",
            BridgeError::SettlementConflict(_) => "settlement_conflict",
            BridgeError::BackendDecode(_) => "backend_decode_error",
            BridgeError::MalformedPreparedTx(_) => "malformed_prepared_tx",
        }
    }
}

/// Missing or unusable deployment configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The wallet extension endpoint is not configured or not reachable.
    #[error("wallet extension not detected")]
    MissingExtension,

    /// The token contract address is not configured.
    #[error("contract address not configured for mechanism '{0}'")]
    MissingContractAddress(String),

    /// A configured value could not be parsed.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Caller mistakes, reported synchronously and never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid amount '{0}': expected a non-negative integer in base units")]
    InvalidAmount(String),

    #[error("malformed call: {0}")]
    MalformedCall(String),
}

/// Transport and chain failures.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// A read-only call reverted or could not be answered.
    #[error("read failure: {0}")]
    ReadFailure(String),

    /// Every configured endpoint failed.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The signer or RPC refused the transaction.
    #[error("broadcast failure: {0}")]
    BroadcastFailure(String),

    /// Remote HTTP service answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// No receipt within the caller's timeout. The transaction stays outstanding.
    #[error("transaction {tx_hash} not confirmed after {waited_secs}s; poll again or resubmit with higher fees")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },
}

/// EIP-1193 provider error object returned by a wallet.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("code {code}: {message}")]
pub struct WalletRpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl WalletRpcError {
    /// The requested chain has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested account is not authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The wallet does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the wallet does not know the requested chain.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}
