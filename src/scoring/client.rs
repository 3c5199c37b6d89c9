//! HTTP client for the scoring service.

use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{BridgeError, BridgeResult, NetworkError};
use crate::scoring::types::{FeatureVector, ScoringResponse};

const PREDICT_PATH: &str = "/api/predict";

/// Scoring service client. Treats the service as an opaque request/response boundary.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    pub fn new(config: &BackendConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Score a feature vector. Missing known features are filled with defaults.
    pub async fn predict(&self, features: FeatureVector) -> BridgeResult<ScoringResponse> {
        let url = format!("{}{}", self.base_url, PREDICT_PATH);
        let features = features.with_defaults();

        let response = self
            .client
            .post(&url)
            .json(&features)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("{}: {}", url, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::ReadFailure(format!("{}: {}", url, e)))?;

        if !status.is_success() {
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Scoring service returned error"
            );
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url,
            }
            .into());
        }

        let scored: ScoringResponse =
            serde_json::from_slice(&body).map_err(|e| BridgeError::BackendDecode(e.to_string()))?;
        tracing::info!(
            prediction = scored.prediction,
            is_hit = ?scored.is_hit,
            requests_confirmation = scored.requests_confirmation(),
            "Scoring result received"
        );
        Ok(scored)
    }

    /// Check the service is up; returns its informational message.
    pub async fn health(&self) -> BridgeResult<String> {
        let url = format!("{}{}", self.base_url, PREDICT_PATH);
        let response = self
            .client
            .get(&url)
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
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BridgeError::BackendDecode(e.to_string()))?;
        Ok(body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("ok")
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ScoringClient::new(&BackendConfig {
            base_url: "http://localhost:5051/".into(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:5051");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let client = ScoringClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 1,
        })
        .unwrap();
        let err = client.predict(FeatureVector::example()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::Unreachable(_))));
    }
}
