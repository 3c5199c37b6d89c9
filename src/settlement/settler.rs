//! On-chain execution of accepted outcomes.
//!
//! prepareTransfer → sendPrepared → await receipt, all through the token
//! mechanism. Once a transaction is broadcast the result is always `Ok`: a
//! timeout or polling failure is reported as a pending effect so the gate
//! never offers the same outcome for signing twice.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::broadcast::Broadcaster;
use crate::chain::types::PendingTransaction;
use crate::error::{BridgeError, BridgeResult};
use crate::mechanism::ActionOutput;
use crate::rewards::RewardPreparer;
use crate::settlement::outcome::{SettlementEffect, SettlementOutcome};

/// Executes the chain side of an accepted outcome.
#[async_trait]
pub trait SettlementExecutor: Send + Sync {
    async fn execute(&self, outcome: &SettlementOutcome) -> BridgeResult<SettlementEffect>;
}

/// Settles through the token mechanism and the broadcaster.
pub struct ChainSettler {
    preparer: Arc<RewardPreparer>,
    broadcaster: Broadcaster,
    treasury: Option<Address>,
    confirmation_timeout: Duration,
}

impl ChainSettler {
    pub fn new(
        preparer: Arc<RewardPreparer>,
        broadcaster: Broadcaster,
        treasury: Option<Address>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            preparer,
            broadcaster,
            treasury,
            confirmation_timeout,
        }
    }

    fn recipient(&self, outcome: &SettlementOutcome) -> Option<Address> {
        if outcome.delta >= 0 {
            Some(outcome.beneficiary)
        } else {
            self.treasury
        }
    }
}

#[async_trait]
impl SettlementExecutor for ChainSettler {
    async fn execute(&self, outcome: &SettlementOutcome) -> BridgeResult<SettlementEffect> {
        let Some(recipient) = self.recipient(outcome) else {
            tracing::info!(cycle = outcome.cycle, delta = outcome.delta, "No treasury configured, debit kept off-chain");
            return Ok(SettlementEffect::off_chain("no treasury configured; debit recorded off-chain"));
        };

        let tx = self.preparer.prepare(recipient, outcome.magnitude()).await?;
        let sent = self
            .preparer
            .mechanism()
            .execute("sendPrepared", json!({ "tx": tx }))
            .await?;
        let tx_hash = match sent {
            ActionOutput::Sent { tx_hash } => tx_hash,
            other => {
                tracing::warn!(output = ?other, "Mechanism cannot send transactions");
                return Err(BridgeError::NoSigningAuthority);
            }
        };

        let pending = PendingTransaction::new(tx_hash);
        match self
            .broadcaster
            .await_confirmation(&pending, self.confirmation_timeout)
            .await
        {
            Ok(receipt) => {
                tracing::info!(
                    cycle = outcome.cycle,
                    tx_hash = %tx_hash,
                    recipient = %recipient,
                    delta = outcome.delta,
                    status = ?receipt.status,
                    "Settlement confirmed"
                );
                Ok(SettlementEffect::confirmed(receipt))
            }
            Err(e) => {
                tracing::warn!(cycle = outcome.cycle, tx_hash = %tx_hash, error = %e, "Settlement broadcast but unconfirmed");
                Ok(SettlementEffect::pending(tx_hash, e.to_string()))
            }
        }
    }
}
