//! Contract interface encoding.
//!
//! # Data Flow
//! ```text
//! FunctionSignature + typed arguments
//!     → encoder.rs (json_abi Function, arity/type check, selector + ABI params)
//!     → opaque call data (Bytes) placed in a PreparedTransaction
//! ```

pub mod encoder;
pub mod erc20;

pub use encoder::FunctionSignature;
pub use erc20::{IERC20, ERC20_ABI};
