//! Scoring service boundary.
//!
//! The scoring model is an external collaborator; this module only knows its
//! request (named numeric features) and response shapes.

pub mod client;
pub mod types;

pub use client::ScoringClient;
pub use types::{FeatureVector, GasReport, Notification, ScoringResponse, FEATURE_DEFAULTS};
