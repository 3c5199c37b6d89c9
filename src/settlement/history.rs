//! In-memory settlement history. Transient; lost on restart.

use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::settlement::outcome::SettlementRecord;

/// Records kept before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

#[derive(Debug)]
pub struct SettlementHistory {
    records: RwLock<VecDeque<SettlementRecord>>,
    limit: usize,
}

impl Default for SettlementHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl SettlementHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }

    pub async fn append(&self, record: SettlementRecord) {
        let mut records = self.records.write().await;
        if records.len() == self.limit {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Oldest first.
    pub async fn list(&self) -> Vec<SettlementRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringResponse;
    use crate::settlement::outcome::{RewardPolicy, SettlementEffect, SettlementOutcome};
    use alloy::primitives::Address;

    fn record(cycle: u64) -> SettlementRecord {
        let response: ScoringResponse = serde_json::from_str(r#"{"prediction":0.9}"#).unwrap();
        let outcome = SettlementOutcome::evaluate(
            cycle,
            &response,
            Address::ZERO,
            RewardPolicy {
                hit_reward: 10,
                miss_penalty: 5,
            },
            true,
        );
        SettlementRecord::new(outcome, SettlementEffect::off_chain("test"))
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let history = SettlementHistory::default();
        assert!(history.is_empty().await);
        history.append(record(1)).await;
        history.append(record(2)).await;
        let cycles: Vec<u64> = history.list().await.iter().map(|r| r.outcome.cycle).collect();
        assert_eq!(cycles, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_oldest_dropped_at_limit() {
        let history = SettlementHistory::with_limit(2);
        for cycle in 1..=3 {
            history.append(record(cycle)).await;
        }
        assert_eq!(history.len().await, 2);
        assert_eq!(history.list().await[0].outcome.cycle, 2);
    }
}
