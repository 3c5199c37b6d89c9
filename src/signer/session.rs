//! Reconciled signing session.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chain::identity::ChainIdentity;
use crate::chain::reconcile::{reconcile, Reconciled};
use crate::chain::types::PreparedTransaction;
use crate::error::{BridgeResult, WalletRpcError};
use crate::signer::{SigningAuthority, WalletProvider};

/// A wallet account that has been brought onto the required chain.
///
/// Only [`connect`] builds one, so holding a `Session` means reconciliation
/// succeeded at least once for its chain. Submissions for the account are
/// serialized so two sends never race for the same nonce.
pub struct Session {
    wallet: Arc<dyn WalletProvider>,
    account: Address,
    reconciled: Reconciled,
    sending: Mutex<()>,
}

/// Reconcile the wallet onto `required`, then acquire its first account.
pub async fn connect(wallet: Arc<dyn WalletProvider>, required: &ChainIdentity) -> BridgeResult<Session> {
    let reconciled = reconcile(wallet.as_ref(), required).await?;

    let accounts = wallet.request_accounts().await?;
    let account = accounts.first().copied().ok_or_else(|| {
        WalletRpcError::new(WalletRpcError::UNAUTHORIZED, "wallet returned no accounts")
    })?;

    tracing::info!(
        wallet = wallet.kind(),
        account = %account,
        chain_id = reconciled.chain().chain_id(),
        "Signing session established"
    );

    Ok(Session {
        wallet,
        account,
        reconciled,
        sending: Mutex::new(()),
    })
}

impl Session {
    pub fn chain(&self) -> &ChainIdentity {
        self.reconciled.chain()
    }
}

#[async_trait]
impl SigningAuthority for Session {
    fn account(&self) -> Address {
        self.account
    }

    /// Re-reconciles if the wallet drifted off the chain since `connect`.
    async fn submit(&self, tx: &PreparedTransaction) -> BridgeResult<TxHash> {
        tx.validate()?;
        let _sending = self.sending.lock().await;
        let active = self.wallet.chain_id().await?;
        if !self.chain().matches(active) {
            tracing::warn!(
                active,
                required = self.chain().chain_id(),
                "Wallet left the required chain, reconciling again"
            );
            reconcile(self.wallet.as_ref(), self.chain()).await?;
        }
        self.wallet.send_transaction(self.account, tx).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("wallet", &self.wallet.kind())
            .field("account", &self.account)
            .field("chain_id", &self.chain().chain_id())
            .finish()
    }
}
