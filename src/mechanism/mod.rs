//! Mechanisms: named units that prepare (and optionally send) contract calls.
//!
//! # Data Flow
//! ```text
//! execute(action, params)
//!     → Action::parse (unknown names become Action::Unknown, never an error)
//!     → params.rs (address / amount validation, no I/O)
//!     → eerc.rs (encode via abi, read via ChainReader, send via SigningAuthority)
//!     → ActionOutput
//! ```
//!
//! # Design Decisions
//! - Mechanisms never hold key material; signing is an injected capability
//! - `registry.rs` is owned by the composition root, not a global
//! - `init` must succeed before any `execute`, including `info`

pub mod eerc;
pub mod params;
pub mod registry;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::chain::types::PreparedTransaction;
use crate::error::BridgeResult;

pub use eerc::EercMechanism;
pub use registry::MechanismRegistry;

/// A pluggable unit that prepares and/or executes on-chain actions for one contract.
#[async_trait]
pub trait Mechanism: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// One-time resolution of configuration. Calling it again after success is a no-op.
    async fn init(&self) -> BridgeResult<()>;

    /// Dispatch `action` with JSON `params`.
    async fn execute(&self, action: &str, params: Value) -> BridgeResult<ActionOutput>;
}

/// Actions understood by the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Info,
    PrepareTransfer,
    BalanceOf,
    SendPrepared,
    Unknown(String),
}

impl Action {
    pub fn parse(action: &str) -> Self {
        match action {
            "info" => Action::Info,
            "prepareTransfer" => Action::PrepareTransfer,
            "balanceOf" => Action::BalanceOf,
            "sendPrepared" => Action::SendPrepared,
            other => Action::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Info => "info",
            Action::PrepareTransfer => "prepareTransfer",
            Action::BalanceOf => "balanceOf",
            Action::SendPrepared => "sendPrepared",
            Action::Unknown(name) => name.as_str(),
        }
    }

    /// Names of every known action.
    pub const KNOWN: [&'static str; 4] = ["info", "prepareTransfer", "balanceOf", "sendPrepared"];
}

/// Static description returned by `info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanismInfo {
    pub name: String,
    pub contract_address: Option<Address>,
    /// Canonical signatures of the callable functions.
    pub abi_surface: Vec<String>,
    pub actions: Vec<String>,
    pub can_send: bool,
}

/// Result of one `execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    Info(MechanismInfo),
    Prepared(PreparedTransaction),
    Balance {
        address: Address,
        balance: U256,
    },
    #[serde(rename_all = "camelCase")]
    Sent {
        tx_hash: TxHash,
    },
    /// Soft result for an action this mechanism does not know.
    Unknown {
        action: String,
        message: String,
    },
}
