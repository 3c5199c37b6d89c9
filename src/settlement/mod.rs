//! Settlement of scoring outcomes.
//!
//! # Data Flow
//! ```text
//! ScoringResponse
//!     → outcome.rs (RewardPolicy: +hit_reward / -miss_penalty whole tokens)
//!     → gate.rs (Idle → AwaitingDecision → Settling → Settled)
//!     → settler.rs on accept (prepareTransfer → sendPrepared → receipt)
//!     → history.rs (every terminal record)
//! ```
//!
//! # Design Decisions
//! - The fixed policy decides the amount; the scoring service's gas figure is kept
//!   for display only and the recorded gas cost comes from the receipt
//! - Negative deltas go to the configured treasury; without one they stay off-chain

pub mod gate;
pub mod history;
pub mod outcome;
pub mod settler;

pub use gate::{GateSnapshot, GateStatus, SettlementGate};
pub use history::SettlementHistory;
pub use outcome::{
    Decision, RewardPolicy, SettlementEffect, SettlementOutcome, SettlementRecord, UserDecision,
};
pub use settler::{ChainSettler, SettlementExecutor};
