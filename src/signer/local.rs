//! Server-held key signer.
//!
//! # Security
//! - The private key is loaded ONLY from the `BRIDGE_PRIVATE_KEY` environment variable
//! - Keys are never logged or serialized; parse errors do not echo the input
//! - Bound to the chain its RPC endpoint serves; it cannot switch or add chains

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::Arc;

use crate::chain::identity::ChainIdentity;
use crate::chain::types::PreparedTransaction;
use crate::config::validation::parse_hex_chain_id;
use crate::error::{BridgeResult, ConfigurationError, NetworkError, ValidationError, WalletRpcError};
use crate::signer::WalletProvider;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "BRIDGE_PRIVATE_KEY";

/// Wallet backed by a local private key and a filling RPC provider.
///
/// Nonce, gas and chain id are filled by the provider at send time.
pub struct LocalKeySigner {
    address: Address,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl LocalKeySigner {
    /// Create a signer from a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str, rpc_url: &str) -> BridgeResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex.parse().map_err(|_| ConfigurationError::InvalidValue {
            field: PRIVATE_KEY_ENV_VAR.to_string(),
            reason: "invalid private key format".to_string(),
        })?;

        let url = rpc_url
            .parse::<url::Url>()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "chain.rpc_urls".to_string(),
                reason: e.to_string(),
            })?;

        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        tracing::info!(address = %address, rpc_url, "Server key signer initialized");

        Ok(Self {
            address,
            provider: Arc::new(provider),
        })
    }

    /// Load the key from `BRIDGE_PRIVATE_KEY`.
    pub fn from_env(rpc_url: &str) -> BridgeResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| ConfigurationError::InvalidValue {
            field: PRIVATE_KEY_ENV_VAR.to_string(),
            reason: "environment variable not set".to_string(),
        })?;
        Self::from_private_key(&private_key, rpc_url)
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl WalletProvider for LocalKeySigner {
    fn kind(&self) -> &'static str {
        "server_key"
    }

    async fn request_accounts(&self) -> BridgeResult<Vec<Address>> {
        Ok(vec![self.address])
    }

    async fn chain_id(&self) -> BridgeResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()).into())
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> BridgeResult<()> {
        let requested = parse_hex_chain_id(chain_id_hex)
            .ok_or_else(|| ValidationError::MalformedCall(format!("bad chain id '{}'", chain_id_hex)))?;
        let current = self.chain_id().await?;
        if current == requested {
            return Ok(());
        }
        Err(WalletRpcError::new(
            WalletRpcError::UNSUPPORTED_METHOD,
            format!("server key is bound to chain {}, cannot switch to {}", current, requested),
        )
        .into())
    }

    async fn add_chain(&self, _identity: &ChainIdentity) -> BridgeResult<()> {
        Err(WalletRpcError::new(
            WalletRpcError::UNSUPPORTED_METHOD,
            "server key cannot add chains",
        )
        .into())
    }

    async fn send_transaction(&self, from: Address, tx: &PreparedTransaction) -> BridgeResult<TxHash> {
        if from != self.address {
            return Err(WalletRpcError::new(
                WalletRpcError::UNAUTHORIZED,
                format!("account {} is not held by this signer", from),
            )
            .into());
        }
        let pending = self
            .provider
            .send_transaction(tx.to_request(Some(from)))
            .await
            .map_err(|e| NetworkError::BroadcastFailure(e.to_string()))?;
        Ok(*pending.tx_hash())
    }
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::error::BridgeError;
    use alloy::primitives::Bytes;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const UNREACHABLE_RPC: &str = "http://127.0.0.1:1";

    #[test]
    fn test_signer_from_private_key() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY, UNREACHABLE_RPC).unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_signer_with_0x_prefix() {
        let signer =
            LocalKeySigner::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), UNREACHABLE_RPC).unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key_is_not_echoed() {
        let err = LocalKeySigner::from_private_key("deadbeef_not_a_key", UNREACHABLE_RPC).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("invalid private key"));
        assert!(!text.contains("deadbeef"));
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY, UNREACHABLE_RPC).unwrap();
        assert!(!format!("{:?}", signer).contains(TEST_PRIVATE_KEY));
    }

    #[tokio::test]
    async fn test_cannot_add_chains() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY, UNREACHABLE_RPC).unwrap();
        let identity = ChainIdentity::from_config(&ChainConfig::default()).unwrap();
        let err = signer.add_chain(&identity).await.unwrap_err();
        assert!(matches!(err, BridgeError::Wallet(ref e) if e.code == WalletRpcError::UNSUPPORTED_METHOD));
    }

    #[tokio::test]
    async fn test_refuses_foreign_account() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY, UNREACHABLE_RPC).unwrap();
        let tx = PreparedTransaction::call(Address::ZERO, Bytes::new());
        let err = signer
            .send_transaction(Address::repeat_byte(9), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Wallet(ref e) if e.code == WalletRpcError::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_chain_id_unreachable() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY, UNREACHABLE_RPC).unwrap();
        let err = signer.chain_id().await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::Unreachable(_))));
    }
}
