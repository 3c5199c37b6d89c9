//! Reward-preparation request and response shapes.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::chain::types::PreparedTransaction;
use crate::scoring::FeatureVector;

/// Song submitted alongside a reward request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongSubmission {
    #[serde(default)]
    pub features: FeatureVector,
    #[serde(default)]
    pub title: String,
}

/// `POST /icm/prepare` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub owner: Address,
    #[serde(default)]
    pub song: SongSubmission,
}

/// `POST /icm/prepare` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    pub prepared_tx: PreparedTransaction,
}
