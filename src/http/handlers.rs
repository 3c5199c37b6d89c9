//! Route handlers.
//!
//! Handlers are thin: parse the body, call one subsystem, serialize the result.
//! Every failure goes through [`ApiError`].

use alloy::primitives::Address;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::mechanism::{ActionOutput, MechanismInfo};
use crate::rewards::{PrepareRequest, PrepareResponse};
use crate::scoring::{FeatureVector, ScoringResponse};
use crate::settlement::{Decision, GateSnapshot, SettlementRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub signer: &'static str,
    pub mechanisms: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        chain_id: state.chain.chain_id(),
        signer: state.signer,
        mechanisms: state.registry.len(),
    })
}

/// One registry entry; `error` is set when `info` fails (e.g. not initialized).
#[derive(Debug, Serialize)]
pub struct MechanismSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<MechanismInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn list_mechanisms(State(state): State<AppState>) -> Json<Vec<MechanismSummary>> {
    let mut summaries = Vec::new();
    for name in state.registry.names() {
        let Some(mechanism) = state.registry.get(&name) else {
            continue;
        };
        let summary = match mechanism.execute("info", Value::Object(Default::default())).await {
            Ok(ActionOutput::Info(info)) => MechanismSummary {
                name,
                info: Some(info),
                error: None,
            },
            Ok(other) => MechanismSummary {
                name,
                info: None,
                error: Some(format!("unexpected info result: {:?}", other)),
            },
            Err(e) => MechanismSummary {
                name,
                info: None,
                error: Some(e.to_string()),
            },
        };
        summaries.push(summary);
    }
    Json(summaries)
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

pub async fn execute_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ActionOutput>, ApiError> {
    let mechanism = state
        .registry
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("mechanism '{}' is not registered", name)))?;
    let params = match request.params {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let output = mechanism.execute(&request.action, params).await?;
    Ok(Json(output))
}

/// Prepare the configured hit reward for `owner`. Nothing is signed here.
pub async fn prepare_reward(
    State(state): State<AppState>,
    Json(request): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, ApiError> {
    tracing::info!(
        owner = %request.owner,
        title = %request.song.title,
        amount = state.hit_reward,
        "Preparing reward transfer"
    );
    let prepared_tx = state.preparer.prepare(request.owner, state.hit_reward).await?;
    Ok(Json(PrepareResponse { prepared_tx }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub owner: Address,
    #[serde(default)]
    pub features: FeatureVector,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub cycle: u64,
    pub scoring: ScoringResponse,
    pub settlement: GateSnapshot,
}

/// Start a new cycle, score the features and hand the result to the gate.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let cycle = state.gate.start_cycle().await;
    let scoring = state.scoring.predict(request.features).await?;
    let settlement = state.gate.evaluate(cycle, &scoring, request.owner).await?;
    Ok(Json(PredictResponse {
        cycle,
        scoring,
        settlement,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub cycle: u64,
    pub decision: Decision,
}

pub async fn decide(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<GateSnapshot>, ApiError> {
    let snapshot = state.gate.decide(request.cycle, request.decision).await?;
    Ok(Json(snapshot))
}

pub async fn settlement(State(state): State<AppState>) -> Json<GateSnapshot> {
    Json(state.gate.snapshot().await)
}

pub async fn history(State(state): State<AppState>) -> Json<Vec<SettlementRecord>> {
    Json(state.gate.history().list().await)
}
