//! Chain access: identity, reads, reconciliation and broadcast.
//!
//! # Data Flow
//! ```text
//! ChainConfig
//!     → identity.rs (ChainIdentity: the chain every signature must target)
//!     → client.rs (BlockchainClient: ordered RPC failover, implements ChainReader)
//!     → token.rs (ERC-20 balance/decimals/symbol over ChainReader)
//!
//! Signing path:
//!     reconcile.rs (switch, 4902 → add + one retry, verify)
//!     → broadcast.rs (submit via SigningAuthority, await receipt with timeout)
//! ```
//!
//! # Design Decisions
//! - Reads go through the `ChainReader` trait so mechanisms and tests can swap the transport
//! - Receipts are converted into crate types at the boundary; alloy RPC types stay inside client.rs

pub mod broadcast;
pub mod client;
pub mod identity;
pub mod reconcile;
pub mod token;
pub mod types;

pub use broadcast::Broadcaster;
pub use client::{BlockchainClient, ChainReader};
pub use identity::{ChainIdentity, NativeCurrency};
pub use reconcile::{reconcile, Reconciled};
pub use token::{format_units, to_base_units, TokenMeta, TokenReader};
pub use types::{PendingTransaction, PreparedTransaction, ReceiptStatus, TransactionReceipt};
