//! HTTP client for the reward bridge API.

pub mod client;

pub use client::{ApiError, BridgeClient, PredictResult, SdkError};
