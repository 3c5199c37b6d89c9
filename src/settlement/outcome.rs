//! Settlement outcomes, decisions and the reward policy.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chain::types::TransactionReceipt;
use crate::config::SettlementConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::scoring::{GasReport, ScoringResponse};

/// Decision recorded on an outcome. Moves away from `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDecision {
    Pending,
    Accepted,
    Declined,
}

/// Decision submitted by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Decline,
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" | "accepted" | "yes" => Ok(Decision::Accept),
            "decline" | "declined" | "no" => Ok(Decision::Decline),
            other => Err(format!("unknown decision '{}', expected accept or decline", other)),
        }
    }
}

/// Fixed token amounts credited or debited per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub hit_reward: u64,
    pub miss_penalty: u64,
}

impl RewardPolicy {
    /// Signed whole-token delta for an outcome.
    pub fn delta(&self, is_positive: bool) -> i64 {
        if is_positive {
            i64::try_from(self.hit_reward).unwrap_or(i64::MAX)
        } else {
            -i64::try_from(self.miss_penalty).unwrap_or(i64::MAX)
        }
    }
}

impl From<&SettlementConfig> for RewardPolicy {
    fn from(config: &SettlementConfig) -> Self {
        Self {
            hit_reward: config.hit_reward,
            miss_penalty: config.miss_penalty,
        }
    }
}

/// A scoring result turned into a pending token delta.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub cycle: u64,
    pub beneficiary: Address,
    pub prediction_value: f64,
    pub is_positive: bool,
    /// Whole tokens; positive credits the beneficiary, negative debits to the treasury.
    pub delta: i64,
    pub requires_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Gas figure the scoring service reported. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_gas: Option<GasReport>,
    user_decision: UserDecision,
}

impl SettlementOutcome {
    /// Derive an outcome deterministically from a scoring result.
    pub fn evaluate(
        cycle: u64,
        response: &ScoringResponse,
        beneficiary: Address,
        policy: RewardPolicy,
        require_consent: bool,
    ) -> Self {
        let is_positive = response.is_positive();
        Self {
            cycle,
            beneficiary,
            prediction_value: response.prediction,
            is_positive,
            delta: policy.delta(is_positive),
            requires_confirmation: require_consent || response.requests_confirmation(),
            message: response
                .notification
                .as_ref()
                .map(|n| n.message.clone())
                .filter(|m| !m.is_empty())
                .or_else(|| response.suggestion.clone()),
            reported_gas: response.gas_expenditure.clone(),
            user_decision: UserDecision::Pending,
        }
    }

    pub fn user_decision(&self) -> UserDecision {
        self.user_decision
    }

    /// Record the decision. Fails if one was already recorded.
    pub fn decide(&mut self, decision: Decision) -> BridgeResult<()> {
        if self.user_decision != UserDecision::Pending {
            return Err(BridgeError::SettlementConflict(format!(
                "cycle {} already {:?}",
                self.cycle, self.user_decision
            )));
        }
        self.user_decision = match decision {
            Decision::Accept => UserDecision::Accepted,
            Decision::Decline => UserDecision::Declined,
        };
        Ok(())
    }

    /// Whole tokens moved on-chain if accepted.
    pub fn magnitude(&self) -> u64 {
        self.delta.unsigned_abs()
    }
}

/// What the chain side produced for an accepted outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementEffect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionReceipt>,
    /// `gas_used * effective_gas_price` from the receipt, in wei.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_cost_wei: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SettlementEffect {
    pub fn confirmed(receipt: TransactionReceipt) -> Self {
        Self {
            tx_hash: Some(receipt.transaction_hash),
            gas_cost_wei: Some(receipt.gas_cost()),
            receipt: Some(receipt),
            note: None,
        }
    }

    pub fn pending(tx_hash: TxHash, note: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            note: Some(note.into()),
            ..Self::default()
        }
    }

    pub fn off_chain(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }
}

/// A terminal settlement. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: Uuid,
    pub outcome: SettlementOutcome,
    #[serde(flatten)]
    pub effect: SettlementEffect,
    /// Unix seconds.
    pub settled_at: u64,
}

impl SettlementRecord {
    pub fn new(outcome: SettlementOutcome, effect: SettlementEffect) -> Self {
        let settled_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            outcome,
            effect,
            settled_at,
        }
    }

    pub fn decision(&self) -> UserDecision {
        self.outcome.user_decision()
    }
}
