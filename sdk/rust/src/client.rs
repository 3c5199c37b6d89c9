use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Error body returned by the bridge: `{"error": kind, "message": text}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum SdkError {
    Http(reqwest::Error),
    Api { status: StatusCode, body: ApiError },
    Decode(String),
}

impl std::fmt::Display for SdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdkError::Http(e) => write!(f, "HTTP error: {}", e),
            SdkError::Api { status, body } => {
                write!(f, "bridge returned {} ({}): {}", status, body.error, body.message)
            }
            SdkError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for SdkError {}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Http(e)
    }
}

/// `POST /api/predict` result. `settlement` is the gate snapshot after evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResult {
    pub cycle: u64,
    pub scoring: Value,
    pub settlement: Value,
}

impl PredictResult {
    /// Gate status, e.g. `awaiting_decision` or `settled`.
    pub fn status(&self) -> Option<&str> {
        self.settlement.get("status").and_then(Value::as_str)
    }

    /// Signed whole-token delta of the evaluated outcome.
    pub fn delta(&self) -> Option<i64> {
        self.settlement
            .get("outcome")
            .and_then(|o| o.get("delta"))
            .and_then(Value::as_i64)
    }
}

pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<Value, SdkError> {
        self.get("/health").await
    }

    pub async fn mechanisms(&self) -> Result<Vec<Value>, SdkError> {
        self.get("/api/mechanisms").await
    }

    /// Run `action` on the named mechanism.
    pub async fn execute(&self, mechanism: &str, action: &str, params: Value) -> Result<Value, SdkError> {
        self.post(
            &format!("/api/mechanisms/{}/execute", mechanism),
            &json!({ "action": action, "params": params }),
        )
        .await
    }

    /// Ask the bridge to prepare the hit reward for `owner`.
    pub async fn prepare_reward(&self, owner: &str, title: &str, features: &BTreeMap<String, f64>) -> Result<Value, SdkError> {
        self.post(
            "/icm/prepare",
            &json!({ "owner": owner, "song": { "title": title, "features": features } }),
        )
        .await
    }

    pub async fn predict(&self, owner: &str, features: &BTreeMap<String, f64>) -> Result<PredictResult, SdkError> {
        self.post("/api/predict", &json!({ "owner": owner, "features": features }))
            .await
    }

    /// `decision` is `accept` or `decline`.
    pub async fn decide(&self, cycle: u64, decision: &str) -> Result<Value, SdkError> {
        self.post(
            "/api/settlement/decision",
            &json!({ "cycle": cycle, "decision": decision }),
        )
        .await
    }

    pub async fn settlement(&self) -> Result<Value, SdkError> {
        self.get("/api/settlement").await
    }

    pub async fn history(&self) -> Result<Vec<Value>, SdkError> {
        self.get("/api/settlement/history").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SdkError> {
        let resp = self.client.get(format!("{}{}", self.base_url, path)).send().await?;
        Self::decode(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, SdkError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SdkError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(ApiError {
                error: "unknown".to_string(),
                message: text,
            });
            return Err(SdkError::Api { status, body });
        }

        serde_json::from_str(&text).map_err(|e| SdkError::Decode(e.to_string()))
    }
}
