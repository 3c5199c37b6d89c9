//! Client for a remote reward-preparation service.

use alloy::primitives::Address;
use serde_json::Value;
use std::time::Duration;

use crate::chain::types::PreparedTransaction;
use crate::error::{BridgeError, BridgeResult, NetworkError};
use crate::rewards::types::{PrepareRequest, SongSubmission};
use crate::scoring::FeatureVector;

/// Field names the prepared transaction may arrive under, in order of preference.
const PREPARED_FIELDS: [&str; 3] = ["preparedTx", "prepared", "tx"];

#[derive(Debug, Clone)]
pub struct RewardPrepClient {
    client: reqwest::Client,
    base_url: String,
}

impl RewardPrepClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Ask the service to prepare the reward transfer for `owner`.
    pub async fn prepare(
        &self,
        owner: Address,
        features: FeatureVector,
        title: impl Into<String>,
    ) -> BridgeResult<PreparedTransaction> {
        let url = format!("{}/icm/prepare", self.base_url);
        let request = PrepareRequest {
            owner,
            song: SongSubmission {
                features,
                title: title.into(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("{}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(NetworkError::Status {
                status: response.status().as_u16(),
                url,
            }
            .into());
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::MalformedPreparedTx(e.to_string()))?;
        extract_prepared(&body)
    }
}

/// Pull the prepared transaction out of a service response.
///
/// Missing `to` or `data` is `MalformedPreparedTx`.
pub fn extract_prepared(body: &Value) -> BridgeResult<PreparedTransaction> {
    let prepared = PREPARED_FIELDS
        .iter()
        .find_map(|field| body.get(*field).filter(|v| v.is_object()))
        .ok_or_else(|| BridgeError::MalformedPreparedTx("no preparedTx in response".to_string()))?;

    for field in ["to", "data"] {
        if prepared.get(field).map_or(true, Value::is_null) {
            return Err(BridgeError::MalformedPreparedTx(format!("missing '{}'", field)));
        }
    }

    let tx: PreparedTransaction = serde_json::from_value(prepared.clone())
        .map_err(|e| BridgeError::MalformedPreparedTx(e.to_string()))?;
    tx.validate()
        .map_err(|e| BridgeError::MalformedPreparedTx(e.to_string()))?;
    Ok(tx)
}
