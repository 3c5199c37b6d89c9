//! Chain reconciliation: bring a wallet onto the required chain before signing.
//!
//! ```text
//! switch ──ok──────────────────────────────┐
//!    │                                     ▼
//!    └─4902─▶ add(identity) ─▶ switch ─▶ verify active == required ─▶ Reconciled
//! any other error ─▶ surfaced unchanged
//! ```

use crate::chain::identity::ChainIdentity;
use crate::error::{BridgeError, BridgeResult};
use crate::observability::metrics;
use crate::signer::WalletProvider;

/// Proof that a wallet was confirmed on a chain. Only [`reconcile`] creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    chain: ChainIdentity,
}

impl Reconciled {
    pub fn chain(&self) -> &ChainIdentity {
        &self.chain
    }
}

/// Switch the wallet to `required`, adding the chain if the wallet does not know it.
///
/// The add-chain fallback retries the switch exactly once. Succeeds only when the
/// wallet then reports the required chain id.
pub async fn reconcile(
    wallet: &dyn WalletProvider,
    required: &ChainIdentity,
) -> BridgeResult<Reconciled> {
    match wallet.switch_chain(&required.chain_id_hex).await {
        Ok(()) => {}
        Err(BridgeError::Wallet(e)) if e.is_unrecognized_chain() => {
            tracing::info!(
                chain_id = %required.chain_id_hex,
                chain_name = %required.chain_name,
                "Chain unknown to wallet, adding it"
            );
            if let Err(e) = add_then_switch(wallet, required).await {
                metrics::record_reconciliation("failed");
                return Err(e);
            }
        }
        Err(e) => {
            tracing::warn!(wallet = wallet.kind(), error = %e, "Chain switch rejected");
            metrics::record_reconciliation("failed");
            return Err(e);
        }
    }

    let actual = wallet.chain_id().await?;
    if !required.matches(actual) {
        metrics::record_reconciliation("mismatch");
        return Err(BridgeError::ChainMismatch {
            required: required.chain_id(),
            actual,
        });
    }

    metrics::record_reconciliation("ok");
    tracing::debug!(wallet = wallet.kind(), chain_id = actual, "Chain reconciled");
    Ok(Reconciled {
        chain: required.clone(),
    })
}

async fn add_then_switch(wallet: &dyn WalletProvider, required: &ChainIdentity) -> BridgeResult<()> {
    wallet.add_chain(required).await?;
    wallet.switch_chain(&required.chain_id_hex).await
}
