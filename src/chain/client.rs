//! Blockchain RPC client with ordered failover.
//!
//! # Responsibilities
//! - Connect to the configured JSON-RPC endpoints, in order
//! - Answer read-only calls, receipts and chain state
//! - Handle timeouts and network errors per endpoint; first reachable wins

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::chain::identity::ChainIdentity;
use crate::chain::types::TransactionReceipt;
use crate::config::ChainConfig;
use crate::error::{BridgeError, BridgeResult, ConfigurationError, NetworkError};
use crate::observability::metrics;

/// Read access to the chain. Implemented by [`BlockchainClient`] and by test fakes.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn chain_id(&self) -> BridgeResult<u64>;

    async fn block_number(&self) -> BridgeResult<u64>;

    /// `eth_call` against `to`. Reverts surface as `NetworkError::ReadFailure`.
    async fn call(&self, to: Address, data: Bytes) -> BridgeResult<Bytes>;

    /// `None` while the transaction is unknown or not yet mined.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> BridgeResult<Option<TransactionReceipt>>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Providers in configured order.
    providers: Vec<DynProvider>,
    urls: Vec<String>,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a client over the ordered RPC list.
    ///
    /// Invalid URLs are skipped with a warning; at least one must parse.
    pub fn new(config: &ChainConfig) -> BridgeResult<Self> {
        let mut providers = Vec::new();
        let mut urls = Vec::new();

        for url_str in &config.rpc_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => {
                    providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
                    urls.push(url_str.clone());
                }
                Err(e) => tracing::warn!(url = %url_str, error = %e, "Ignoring invalid RPC URL"),
            }
        }

        if providers.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "chain.rpc_urls".to_string(),
                reason: "no usable RPC URL".to_string(),
            }
            .into());
        }

        tracing::info!(
            rpc_urls = ?urls,
            chain_id = config.chain_id,
            "Blockchain client initialized"
        );

        Ok(Self::from_providers(
            providers,
            urls,
            Duration::from_secs(config.rpc_timeout_secs),
        ))
    }

    fn from_providers(providers: Vec<DynProvider>, urls: Vec<String>, timeout_duration: Duration) -> Self {
        Self {
            providers,
            urls,
            timeout_duration,
        }
    }

    /// Verify the RPC chain matches the required identity.
    pub async fn verify_chain_id(&self, required: &ChainIdentity) -> BridgeResult<()> {
        let actual = self.chain_id().await?;
        if !required.matches(actual) {
            return Err(BridgeError::ChainMismatch {
                required: required.chain_id(),
                actual,
            });
        }
        Ok(())
    }

    /// Primary RPC URL (used by the server-key signer).
    pub fn primary_url(&self) -> &str {
        &self.urls[0]
    }

    /// Run `op` against each provider in order until one answers.
    ///
    /// Execution reverts are answers, not outages, and end the walk. Returns
    /// the last error text when no provider answered.
    async fn with_failover<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, String>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no providers");
        for (i, provider) in self.providers.iter().enumerate() {
            let remaining = self.providers.len() - i - 1;
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if is_execution_revert(&e) => {
                    tracing::debug!(provider_idx = i, op, error = %e, "Execution reverted");
                    return Err(e.to_string());
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, op, remaining, error = %e, "RPC error");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, op, remaining, "RPC timeout");
                    last_error = format!("timeout after {}s", self.timeout_duration.as_secs());
                }
            }
            if remaining > 0 {
                metrics::record_rpc_failover();
            }
        }
        Err(last_error)
    }
}

/// A node answered and the EVM reverted; another node would answer the same.
fn is_execution_revert(error: &TransportError) -> bool {
    error
        .as_error_resp()
        .is_some_and(|payload| payload.code == 3 || payload.message.contains("revert"))
}

#[async_trait]
impl ChainReader for BlockchainClient {
    async fn chain_id(&self) -> BridgeResult<u64> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map_err(|e| NetworkError::Unreachable(format!("All RPC providers failed: {}", e)).into())
    }

    async fn block_number(&self) -> BridgeResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
            .map_err(|e| NetworkError::Unreachable(format!("All RPC providers failed: {}", e)).into())
    }

    async fn call(&self, to: Address, data: Bytes) -> BridgeResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.with_failover("eth_call", |p| {
            let request = request.clone();
            async move { p.call(request).await }
        })
        .await
        .map_err(|e| NetworkError::ReadFailure(e).into())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BridgeResult<Option<TransactionReceipt>> {
        let receipt = self
            .with_failover("eth_getTransactionReceipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await
            .map_err(NetworkError::Unreachable)?;
        Ok(receipt.as_ref().and_then(TransactionReceipt::from_rpc))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_urls", &self.urls)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::mock::Asserter;
    use alloy::transports::TransportErrorKind;

    fn mocked(asserters: &[Asserter]) -> BlockchainClient {
        let providers = asserters
            .iter()
            .map(|a| {
                let provider = ProviderBuilder::new()
                    .disable_recommended_fillers()
                    .connect_mocked_client(a.clone());
                Arc::new(provider) as DynProvider
            })
            .collect();
        let urls = (0..asserters.len()).map(|i| format!("mock://{}", i)).collect();
        BlockchainClient::from_providers(providers, urls, Duration::from_secs(1))
    }

    fn reverted() -> ErrorPayload {
        ErrorPayload {
            code: 3,
            message: "execution reverted: ERC20: transfer amount exceeds balance".into(),
            data: None,
        }
    }

    fn test_config() -> ChainConfig {
        ChainConfig {
            rpc_urls: vec!["http://127.0.0.1:1".to_string()],
            chain_id: 31337, // Anvil default
            chain_id_hex: "0x7a69".to_string(),
            rpc_timeout_secs: 2,
            ..ChainConfig::default()
        }
    }

    #[test]
    fn test_client_creation_does_not_touch_network() {
        let client = BlockchainClient::new(&test_config()).unwrap();
        assert_eq!(client.primary_url(), "http://127.0.0.1:1");
    }

    #[test]
    fn test_invalid_urls_skipped() {
        let mut config = test_config();
        config.rpc_urls.insert(0, "not a url".to_string());
        let client = BlockchainClient::new(&config).unwrap();
        assert_eq!(client.providers.len(), 1);

        config.rpc_urls = vec!["still not a url".to_string()];
        assert!(BlockchainClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = test_config();
        config.rpc_urls.push("http://127.0.0.1:2".to_string());

        let client = BlockchainClient::new(&config).unwrap();
        let result = client.chain_id().await;
        let err = result.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::Unreachable(_))));
        assert!(err.to_string().contains("All RPC providers failed"));
    }

    #[tokio::test]
    async fn test_unreachable_call_is_read_failure() {
        let client = BlockchainClient::new(&test_config()).unwrap();
        let err = client.call(Address::ZERO, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::ReadFailure(_))));
    }

    #[test]
    fn test_revert_is_not_an_outage() {
        assert!(is_execution_revert(&TransportError::err_resp(reverted())));
        assert!(!is_execution_revert(&TransportErrorKind::custom_str("connection refused")));
        assert!(!is_execution_revert(&TransportError::err_resp(
            ErrorPayload::internal_error_message("header not found".into())
        )));
    }

    #[tokio::test]
    async fn test_error_hands_off_to_next_provider() {
        let primary = Asserter::new();
        let backup = Asserter::new();
        primary.push_failure_msg("upstream unavailable");
        backup.push_success(&alloy::primitives::U64::from(43113));

        let client = mocked(&[primary, backup.clone()]);
        assert_eq!(client.chain_id().await.unwrap(), 43113);
        assert!(backup.read_q().is_empty());
    }

    #[tokio::test]
    async fn test_revert_stops_at_first_provider() {
        let primary = Asserter::new();
        let backup = Asserter::new();
        primary.push_failure(reverted());
        backup.push_success(&Bytes::from(vec![0x01]));

        let client = mocked(&[primary, backup.clone()]);
        let err = client.call(Address::ZERO, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::ReadFailure(_))));
        assert!(err.to_string().contains("reverted"));
        // The backup was never asked
        assert_eq!(backup.read_q().len(), 1);
    }
}
