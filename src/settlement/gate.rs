//! Settlement gate: one scoring cycle, one outcome, one decision.
//!
//! ```text
//! start_cycle ──▶ Idle ──evaluate──┬──requires confirmation──▶ AwaitingDecision
//!                                  │                            │          │
//!                                  └──auto-accept──┐      accept │          │ decline
//!                                                  ▼            ▼          ▼
//!                                               Settling ──▶ Settled(accepted)  Settled(declined)
//! start_cycle from any state discards the current outcome and returns to Idle.
//! ```
//!
//! Evaluation and the step out of it happen under one lock, so an evaluated
//! outcome is only ever observed as `AwaitingDecision` or beyond.
//!
//! # Design Decisions
//! - A single state slot holds the outcome, so at most one is ever awaiting a decision
//! - The state lock is never held across chain calls; an `in_flight` lock serializes
//!   settlements so two transfers are never signed concurrently for the signer's account
//! - Settlement runs on its own task; a caller that stops waiting does not strand
//!   the gate in `Settling` or lose the record
//! - A failure before broadcast returns the outcome to `AwaitingDecision`
//! - A settlement that completes after its cycle was discarded is kept in history only

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::SettlementConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::observability::metrics;
use crate::scoring::ScoringResponse;
use crate::settlement::history::SettlementHistory;
use crate::settlement::outcome::{
    Decision, RewardPolicy, SettlementEffect, SettlementOutcome, SettlementRecord,
};
use crate::settlement::settler::SettlementExecutor;
use alloy::primitives::Address;

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Idle,
    AwaitingDecision,
    Settling,
    Settled,
}

#[derive(Debug, Clone)]
enum GateState {
    Idle,
    AwaitingDecision(SettlementOutcome),
    /// Holds the undecided outcome so a pre-broadcast failure can restore it.
    Settling(SettlementOutcome),
    Settled(SettlementRecord),
}

#[derive(Debug)]
struct GateInner {
    cycle: u64,
    state: GateState,
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateSnapshot {
    pub cycle: u64,
    pub status: GateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SettlementOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<SettlementRecord>,
}

impl GateSnapshot {
    fn of(inner: &GateInner) -> Self {
        let (status, outcome, record) = match &inner.state {
            GateState::Idle => (GateStatus::Idle, None, None),
            GateState::AwaitingDecision(o) => (GateStatus::AwaitingDecision, Some(o.clone()), None),
            GateState::Settling(o) => (GateStatus::Settling, Some(o.clone()), None),
            GateState::Settled(r) => (GateStatus::Settled, Some(r.outcome.clone()), Some(r.clone())),
        };
        Self {
            cycle: inner.cycle,
            status,
            outcome,
            record,
        }
    }

    fn settled(cycle: u64, record: SettlementRecord) -> Self {
        Self {
            cycle,
            status: GateStatus::Settled,
            outcome: Some(record.outcome.clone()),
            record: Some(record),
        }
    }
}

/// Consent gate between scoring results and on-chain settlement.
pub struct SettlementGate {
    inner: Arc<Mutex<GateInner>>,
    settlement: Settlement,
    policy: RewardPolicy,
    require_consent: bool,
}

/// What a settlement task owns: everything but the policy.
#[derive(Clone)]
struct Settlement {
    inner: Arc<Mutex<GateInner>>,
    in_flight: Arc<Mutex<()>>,
    executor: Arc<dyn SettlementExecutor>,
    history: Arc<SettlementHistory>,
}

impl SettlementGate {
    pub fn new(
        config: &SettlementConfig,
        executor: Arc<dyn SettlementExecutor>,
        history: Arc<SettlementHistory>,
    ) -> Self {
        let inner = Arc::new(Mutex::new(GateInner {
            cycle: 0,
            state: GateState::Idle,
        }));
        Self {
            inner: inner.clone(),
            settlement: Settlement {
                inner,
                in_flight: Arc::new(Mutex::new(())),
                executor,
                history,
            },
            policy: RewardPolicy::from(config),
            require_consent: config.require_consent,
        }
    }

    pub fn history(&self) -> &Arc<SettlementHistory> {
        &self.settlement.history
    }

    pub async fn snapshot(&self) -> GateSnapshot {
        GateSnapshot::of(&*self.inner.lock().await)
    }

    /// Begin a new prediction cycle, discarding whatever the current one holds.
    pub async fn start_cycle(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        match &inner.state {
            GateState::AwaitingDecision(outcome) => {
                tracing::warn!(cycle = inner.cycle, delta = outcome.delta, "Discarding outcome awaiting decision");
                metrics::record_settlement("discarded");
            }
            GateState::Settling(_) => {
                tracing::warn!(cycle = inner.cycle, "New cycle while settlement in flight; result goes to history only");
            }
            GateState::Idle | GateState::Settled(_) => {}
        }
        inner.cycle += 1;
        inner.state = GateState::Idle;
        tracing::debug!(cycle = inner.cycle, "Prediction cycle started");
        inner.cycle
    }

    /// Turn a scoring result into this cycle's outcome.
    ///
    /// Waits for a decision when consent is required; otherwise settles as accepted.
    pub async fn evaluate(
        &self,
        cycle: u64,
        response: &ScoringResponse,
        beneficiary: Address,
    ) -> BridgeResult<GateSnapshot> {
        let mut inner = self.inner.lock().await;
        Self::check_cycle(&inner, cycle)?;
        if !matches!(inner.state, GateState::Idle) {
            return Err(BridgeError::SettlementConflict(format!(
                "cycle {} was already evaluated",
                cycle
            )));
        }

        let outcome = SettlementOutcome::evaluate(cycle, response, beneficiary, self.policy, self.require_consent);
        tracing::info!(
            cycle,
            prediction = outcome.prediction_value,
            is_positive = outcome.is_positive,
            delta = outcome.delta,
            requires_confirmation = outcome.requires_confirmation,
            "Outcome evaluated"
        );

        if outcome.requires_confirmation {
            inner.state = GateState::AwaitingDecision(outcome);
            return Ok(GateSnapshot::of(&inner));
        }

        inner.state = GateState::Settling(outcome.clone());
        drop(inner);
        self.settle(cycle, outcome).await
    }

    /// Apply the user's decision to the outcome awaiting one.
    pub async fn decide(&self, cycle: u64, decision: Decision) -> BridgeResult<GateSnapshot> {
        let mut inner = self.inner.lock().await;
        Self::check_cycle(&inner, cycle)?;

        let pending = match &inner.state {
            GateState::AwaitingDecision(outcome) => outcome.clone(),
            GateState::Idle => {
                return Err(BridgeError::SettlementConflict(format!(
                    "cycle {} has no outcome awaiting a decision",
                    cycle
                )))
            }
            GateState::Settling(_) => {
                return Err(BridgeError::SettlementConflict(format!(
                    "cycle {} is already settling",
                    cycle
                )))
            }
            GateState::Settled(_) => {
                return Err(BridgeError::SettlementConflict(format!(
                    "cycle {} is already settled",
                    cycle
                )))
            }
        };

        match decision {
            Decision::Decline => {
                let mut declined = pending;
                declined.decide(Decision::Decline)?;
                let record = SettlementRecord::new(declined, SettlementEffect::off_chain("declined by user"));
                inner.state = GateState::Settled(record.clone());
                self.settlement.history.append(record.clone()).await;
                drop(inner);

                metrics::record_settlement("declined");
                tracing::info!(cycle, "Outcome declined, no chain call made");
                Ok(GateSnapshot::settled(cycle, record))
            }
            Decision::Accept => {
                inner.state = GateState::Settling(pending.clone());
                drop(inner);
                self.settle(cycle, pending).await
            }
        }
    }

    fn check_cycle(inner: &GateInner, cycle: u64) -> BridgeResult<()> {
        if inner.cycle != cycle {
            return Err(BridgeError::SettlementConflict(format!(
                "cycle {} is stale; current cycle is {}",
                cycle, inner.cycle
            )));
        }
        Ok(())
    }

    /// Settle on a detached task and wait for it.
    async fn settle(&self, cycle: u64, pending: SettlementOutcome) -> BridgeResult<GateSnapshot> {
        let task = tokio::spawn(self.settlement.clone().run(cycle, pending));
        task.await.map_err(|e| {
            tracing::error!(cycle, error = %e, "Settlement task did not complete");
            BridgeError::SettlementConflict(format!("settlement of cycle {} aborted: {}", cycle, e))
        })?
    }
}

impl Settlement {
    async fn run(self, cycle: u64, pending: SettlementOutcome) -> BridgeResult<GateSnapshot> {
        let _one_at_a_time = self.in_flight.lock().await;

        let mut accepted = pending.clone();
        accepted.decide(Decision::Accept)?;
        let result = self.executor.execute(&accepted).await;

        let mut inner = self.inner.lock().await;
        let still_current = inner.cycle == cycle && matches!(inner.state, GateState::Settling(_));

        match result {
            Ok(effect) => {
                let record = SettlementRecord::new(accepted, effect);
                self.history.append(record.clone()).await;
                metrics::record_settlement("accepted");
                if still_current {
                    inner.state = GateState::Settled(record.clone());
                } else {
                    tracing::warn!(cycle, current = inner.cycle, "Settlement finished after its cycle was discarded");
                }
                Ok(GateSnapshot::settled(cycle, record))
            }
            Err(e) => {
                metrics::record_settlement("failed");
                tracing::warn!(cycle, error = %e, "Settlement failed before broadcast");
                if still_current {
                    inner.state = GateState::AwaitingDecision(pending);
                }
                Err(e)
            }
        }
    }
}
