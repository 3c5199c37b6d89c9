//! EIP-1193 wallet reached over JSON-RPC.
//!
//! The endpoint speaks the wallet request methods (`eth_requestAccounts`,
//! `wallet_switchEthereumChain`, ...) as plain JSON-RPC 2.0 over HTTP, the way
//! Frame and similar desktop wallets expose them. Error objects keep their
//! EIP-1193 codes so reconciliation can recognise 4902.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::chain::identity::ChainIdentity;
use crate::chain::types::PreparedTransaction;
use crate::config::validation::parse_hex_chain_id;
use crate::error::{BridgeError, BridgeResult, ConfigurationError, NetworkError, WalletRpcError};
use crate::signer::WalletProvider;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<WalletRpcError>,
}

/// Wallet extension client.
#[derive(Debug)]
pub struct ExtensionWallet {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl ExtensionWallet {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Connect only if a wallet answers at `endpoint`.
    ///
    /// A missing endpoint or one that does not respond is reported as
    /// `ConfigurationError::MissingExtension` before anything else is attempted.
    pub async fn detect(endpoint: Option<&str>, timeout: Duration) -> BridgeResult<Self> {
        let endpoint = endpoint
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigurationError::MissingExtension)?;
        let wallet = Self::new(endpoint, timeout)?;
        match wallet.chain_id().await {
            Ok(chain_id) => {
                tracing::info!(endpoint, chain_id, "Wallet extension detected");
                Ok(wallet)
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "Wallet extension not reachable");
                Err(ConfigurationError::MissingExtension.into())
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> BridgeResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("{}: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            }
            .into());
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::ReadFailure(format!("{}: {}", method, e)))?;

        if let Some(error) = envelope.error {
            tracing::debug!(method, code = error.code, message = %error.message, "Wallet returned error");
            return Err(BridgeError::Wallet(error));
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| NetworkError::ReadFailure(format!("{}: {}", method, e)).into())
    }
}

#[async_trait]
impl WalletProvider for ExtensionWallet {
    fn kind(&self) -> &'static str {
        "extension"
    }

    async fn request_accounts(&self) -> BridgeResult<Vec<Address>> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn chain_id(&self) -> BridgeResult<u64> {
        let hex: String = self.request("eth_chainId", json!([])).await?;
        parse_hex_chain_id(&hex)
            .ok_or_else(|| NetworkError::ReadFailure(format!("eth_chainId: bad value '{}'", hex)).into())
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> BridgeResult<()> {
        let _: Value = self
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_id_hex }]))
            .await?;
        Ok(())
    }

    async fn add_chain(&self, identity: &ChainIdentity) -> BridgeResult<()> {
        let _: Value = self.request("wallet_addEthereumChain", json!([identity])).await?;
        Ok(())
    }

    async fn send_transaction(&self, from: Address, tx: &PreparedTransaction) -> BridgeResult<TxHash> {
        let mut params = serde_json::to_value(tx)
            .map_err(|e| NetworkError::BroadcastFailure(e.to_string()))?;
        if let Value::Object(ref mut map) = params {
            map.insert("from".to_string(), json!(from));
        }
        self.request("eth_sendTransaction", json!([params])).await
    }
}
