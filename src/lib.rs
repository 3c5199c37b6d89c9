//! Reward bridge library.
//!
//! Turns off-chain scoring outcomes into consented on-chain token settlements.

// Core subsystems
pub mod abi;
pub mod chain;
pub mod config;
pub mod error;
pub mod http;
pub mod mechanism;
pub mod signer;

// Application flow
pub mod rewards;
pub mod scoring;
pub mod settlement;

// Cross-cutting concerns
pub mod observability;

pub use config::schema::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use http::HttpServer;
