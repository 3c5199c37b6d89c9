//! Reward transfer preparation through the token mechanism.

use alloy::primitives::Address;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::chain::client::ChainReader;
use crate::chain::token::{to_base_units, TokenReader};
use crate::chain::types::PreparedTransaction;
use crate::error::{BridgeError, BridgeResult};
use crate::mechanism::{ActionOutput, Mechanism};

/// Turns "N whole tokens to X" into a prepared transfer.
///
/// Token decimals are read once and cached; the transfer itself is encoded by
/// the mechanism's `prepareTransfer`.
pub struct RewardPreparer {
    mechanism: Arc<dyn Mechanism>,
    reader: Arc<dyn ChainReader>,
    decimals: OnceCell<u8>,
}

impl RewardPreparer {
    pub fn new(mechanism: Arc<dyn Mechanism>, reader: Arc<dyn ChainReader>) -> Self {
        Self {
            mechanism,
            reader,
            decimals: OnceCell::new(),
        }
    }

    /// Pre-seed the decimals, skipping the chain read.
    pub fn with_decimals(self, decimals: u8) -> Self {
        let _ = self.decimals.set(decimals);
        self
    }

    pub fn mechanism(&self) -> &Arc<dyn Mechanism> {
        &self.mechanism
    }

    /// Contract the mechanism is bound to.
    pub async fn contract(&self) -> BridgeResult<Address> {
        match self.mechanism.execute("info", json!({})).await? {
            ActionOutput::Info(info) => info
                .contract_address
                .ok_or_else(|| BridgeError::NotInitialized(self.mechanism.name().to_string())),
            other => Err(BridgeError::NotInitialized(format!(
                "{}: unexpected info result {:?}",
                self.mechanism.name(),
                other
            ))),
        }
    }

    pub async fn decimals(&self) -> BridgeResult<u8> {
        self.decimals
            .get_or_try_init(|| async {
                let contract = self.contract().await?;
                TokenReader::new(self.reader.clone(), contract).decimals().await
            })
            .await
            .copied()
    }

    /// Prepare a transfer of `whole_tokens` (scaled by the token's decimals) to `recipient`.
    pub async fn prepare(&self, recipient: Address, whole_tokens: u64) -> BridgeResult<PreparedTransaction> {
        let decimals = self.decimals().await?;
        let amount = to_base_units(whole_tokens, decimals)?;
        let output = self
            .mechanism
            .execute(
                "prepareTransfer",
                json!({ "to": recipient.to_string(), "amount": amount.to_string() }),
            )
            .await?;
        match output {
            ActionOutput::Prepared(tx) => Ok(tx),
            other => Err(BridgeError::MalformedPreparedTx(format!(
                "prepareTransfer returned {:?}",
                other
            ))),
        }
    }
}
