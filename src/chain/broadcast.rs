//! Transaction submission and confirmation monitoring.
//!
//! # Responsibilities
//! - Hand a prepared transaction to a signing authority and return at once
//! - Poll for the receipt until it is final or the caller's timeout elapses
//!
//! A timeout is a value, not a cancellation: the transaction stays outstanding
//! and the caller may poll again with the same [`PendingTransaction`].

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::chain::client::ChainReader;
use crate::chain::types::{PendingTransaction, PreparedTransaction, TransactionReceipt};
use crate::error::{BridgeResult, NetworkError};
use crate::observability::metrics;
use crate::signer::SigningAuthority;

/// Submits through a signer and watches the chain for the outcome.
#[derive(Clone)]
pub struct Broadcaster {
    reader: Arc<dyn ChainReader>,
    confirmation_blocks: u32,
    poll_interval: Duration,
}

impl Broadcaster {
    pub fn new(reader: Arc<dyn ChainReader>, confirmation_blocks: u32, poll_interval: Duration) -> Self {
        Self {
            reader,
            confirmation_blocks,
            poll_interval,
        }
    }

    /// Sign and broadcast without waiting for mining.
    pub async fn submit(
        &self,
        authority: &dyn SigningAuthority,
        tx: &PreparedTransaction,
    ) -> BridgeResult<PendingTransaction> {
        tx.validate()?;
        let tx_hash = authority.submit(tx).await?;
        tracing::info!(tx_hash = %tx_hash, from = %authority.account(), to = %tx.to, "Transaction submitted");
        Ok(PendingTransaction::new(tx_hash))
    }

    /// Wait for the receipt of `pending`.
    ///
    /// Reverted transactions are terminal and returned as a receipt with
    /// `ReceiptStatus::Reverted`. Read errors while polling are logged and
    /// polling continues until `wait` elapses.
    pub async fn await_confirmation(
        &self,
        pending: &PendingTransaction,
        wait: Duration,
    ) -> BridgeResult<TransactionReceipt> {
        let tx_hash = pending.tx_hash;
        let required = u64::from(self.confirmation_blocks);

        let result = timeout(wait, async {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let receipt = match self.reader.transaction_receipt(tx_hash).await {
                    Ok(Some(r)) => r,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                        continue;
                    }
                };

                if !receipt.succeeded() || required == 0 {
                    return receipt;
                }

                match self.reader.block_number().await {
                    Ok(current) if current.saturating_sub(receipt.block_number) >= required => {
                        return receipt;
                    }
                    Ok(current) => tracing::debug!(
                        tx_hash = %tx_hash,
                        confirmations = current.saturating_sub(receipt.block_number),
                        required,
                        "Waiting for confirmations"
                    ),
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number poll failed"),
                }
            }
        })
        .await;

        match result {
            Ok(receipt) => {
                metrics::record_confirmation(pending.submitted_at.elapsed());
                tracing::info!(
                    tx_hash = %tx_hash,
                    block_number = receipt.block_number,
                    status = ?receipt.status,
                    "Transaction confirmed"
                );
                Ok(receipt)
            }
            Err(_) => {
                tracing::warn!(tx_hash = %tx_hash, waited_secs = wait.as_secs(), "Confirmation timed out");
                Err(NetworkError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: wait.as_secs(),
                }
                .into())
            }
        }
    }
}
