//! Reward preparation.
//!
//! # Data Flow
//! ```text
//! server side:  POST /icm/prepare {owner, song}
//!     → preparer.rs (token decimals, mechanism prepareTransfer)
//!     → {preparedTx}
//!
//! client side:  client.rs RewardPrepClient
//!     → accepts preparedTx | prepared | tx
//!     → PreparedTransaction or MalformedPreparedTx
//! ```

pub mod client;
pub mod preparer;
pub mod types;

pub use client::{extract_prepared, RewardPrepClient};
pub use preparer::RewardPreparer;
pub use types::{PrepareRequest, PrepareResponse, SongSubmission};
