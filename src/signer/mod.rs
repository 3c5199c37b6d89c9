//! Signing authorities.
//!
//! # Data Flow
//! ```text
//! WalletProvider (extension.rs: EIP-1193 over JSON-RPC | local.rs: server key)
//!     → session.rs connect(): reconcile chain, then request accounts
//!     → Session (the SigningAuthority handed to mechanisms)
//!     → submit(): re-check chain, sign + broadcast, return tx hash
//! ```
//!
//! # Security Constraints
//! - Mechanisms never see key material; they hold an `Arc<dyn SigningAuthority>`
//! - The server key is read ONLY from the environment and never logged
//! - A `Session` cannot exist without a successful reconciliation

pub mod extension;
pub mod local;
pub mod session;

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;

use crate::chain::identity::ChainIdentity;
use crate::chain::types::PreparedTransaction;
use crate::error::BridgeResult;

pub use extension::ExtensionWallet;
pub use local::LocalKeySigner;
pub use session::{connect, Session};

/// Wallet capability: accounts, chain control, and sign+broadcast.
///
/// Provider-level rejections surface as `BridgeError::Wallet` carrying the
/// EIP-1193 error code.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short label for logs ("extension", "server_key").
    fn kind(&self) -> &'static str;

    async fn request_accounts(&self) -> BridgeResult<Vec<Address>>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> BridgeResult<u64>;

    async fn switch_chain(&self, chain_id_hex: &str) -> BridgeResult<()>;

    async fn add_chain(&self, identity: &ChainIdentity) -> BridgeResult<()>;

    /// Sign and broadcast; returns as soon as the wallet accepted the transaction.
    async fn send_transaction(&self, from: Address, tx: &PreparedTransaction) -> BridgeResult<TxHash>;
}

/// Injected capability that turns a prepared transaction into a broadcast one.
#[async_trait]
pub trait SigningAuthority: Send + Sync {
    /// Account transactions are sent from.
    fn account(&self) -> Address;

    /// Sign and submit. Non-blocking with respect to mining.
    async fn submit(&self, tx: &PreparedTransaction) -> BridgeResult<TxHash>;
}
