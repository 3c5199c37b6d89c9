//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request id, trace, timeout)
//!     → handlers.rs (parse body, call mechanism registry / scoring / gate)
//!     → error.rs (BridgeError → status code + {"error", "message"})
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
