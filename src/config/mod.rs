//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: CHAIN_ID_HEX, RPC_URLS, ...)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → handed to the composition root in main.rs
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The server private key is never read from the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, BridgeConfig, ChainConfig, ListenerConfig, NativeCurrencyConfig,
    ObservabilityConfig, SettlementConfig, SignerConfig, SignerKind, TokenConfig,
};
