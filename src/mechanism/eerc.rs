//! EERC token mechanism: ERC-20 transfer preparation bound to one contract.
//!
//! # Responsibilities
//! - Resolve the contract address once at `init`
//! - `prepareTransfer`: validate and encode `transfer(to, amount)`; no I/O
//! - `balanceOf`: read-only call through the chain reader
//! - `sendPrepared`: pass-through to the injected signing authority

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::abi::{erc20, ERC20_ABI};
use crate::chain::broadcast::Broadcaster;
use crate::chain::client::ChainReader;
use crate::chain::token::TokenReader;
use crate::chain::types::PreparedTransaction;
use crate::error::{BridgeError, BridgeResult, ConfigurationError};
use crate::mechanism::params::{parse_address, parse_amount, parse_prepared, required};
use crate::mechanism::{Action, ActionOutput, Mechanism, MechanismInfo};
use crate::observability::metrics;
use crate::signer::SigningAuthority;

/// Registry name of the EERC mechanism.
pub const EERC_NAME: &str = "EERC";

/// ERC-20 transfer mechanism.
pub struct EercMechanism {
    configured_address: Option<String>,
    reader: Arc<dyn ChainReader>,
    broadcaster: Broadcaster,
    authority: Option<Arc<dyn SigningAuthority>>,
    contract: OnceLock<Address>,
    /// One `sendPrepared` at a time for the bound account.
    sending: Mutex<()>,
}

impl EercMechanism {
    /// `contract_address` is resolved at `init`; `None` or blank makes `init` fail.
    pub fn new(
        contract_address: Option<String>,
        reader: Arc<dyn ChainReader>,
        broadcaster: Broadcaster,
        authority: Option<Arc<dyn SigningAuthority>>,
    ) -> Self {
        Self {
            configured_address: contract_address.filter(|a| !a.trim().is_empty()),
            reader,
            broadcaster,
            authority,
            contract: OnceLock::new(),
            sending: Mutex::new(()),
        }
    }

    /// Bound contract, once initialized.
    pub fn contract(&self) -> Option<Address> {
        self.contract.get().copied()
    }

    fn bound(&self) -> BridgeResult<Address> {
        self.contract()
            .ok_or_else(|| BridgeError::NotInitialized(EERC_NAME.to_string()))
    }

    fn info(&self, contract: Address) -> MechanismInfo {
        MechanismInfo {
            name: EERC_NAME.to_string(),
            contract_address: Some(contract),
            abi_surface: ERC20_ABI.iter().map(|s| s.to_string()).collect(),
            actions: Action::KNOWN.iter().map(|s| s.to_string()).collect(),
            can_send: self.authority.is_some(),
        }
    }

    fn prepare_transfer(&self, contract: Address, params: &Value) -> BridgeResult<PreparedTransaction> {
        let to = required(params, "to")?;
        let amount = required(params, "amount")?;
        let to = parse_address(to)?;
        let amount = parse_amount(amount)?;

        let data = erc20::transfer().encode(&[DynSolValue::Address(to), DynSolValue::Uint(amount, 256)])?;
        tracing::debug!(contract = %contract, to = %to, amount = %amount, "Prepared transfer");
        Ok(PreparedTransaction::call(contract, data))
    }

    async fn balance_of(&self, contract: Address, params: &Value) -> BridgeResult<ActionOutput> {
        let address = parse_address(required(params, "address")?)?;
        let balance = TokenReader::new(self.reader.clone(), contract)
            .balance_of(address)
            .await?;
        Ok(ActionOutput::Balance { address, balance })
    }

    async fn send_prepared(&self, params: &Value) -> BridgeResult<ActionOutput> {
        let authority = self.authority.as_ref().ok_or(BridgeError::NoSigningAuthority)?;
        let tx = parse_prepared(required(params, "tx")?)?;
        let _sending = self.sending.lock().await;
        let pending = self.broadcaster.submit(authority.as_ref(), &tx).await?;
        Ok(ActionOutput::Sent {
            tx_hash: pending.tx_hash,
        })
    }
}

#[async_trait]
impl Mechanism for EercMechanism {
    fn name(&self) -> &str {
        EERC_NAME
    }

    async fn init(&self) -> BridgeResult<()> {
        if self.contract.get().is_some() {
            return Ok(());
        }
        let raw = self
            .configured_address
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingContractAddress(EERC_NAME.to_string()))?;
        let address = raw
            .trim()
            .parse::<Address>()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "token.contract_address".to_string(),
                reason: e.to_string(),
            })?;
        // A concurrent init may have won; both resolved the same address.
        let _ = self.contract.set(address);
        tracing::info!(mechanism = EERC_NAME, contract = %address, "Mechanism initialized");
        Ok(())
    }

    async fn execute(&self, action: &str, params: Value) -> BridgeResult<ActionOutput> {
        let action = Action::parse(action);
        let contract = self.bound()?;

        let result = match &action {
            Action::Info => Ok(ActionOutput::Info(self.info(contract))),
            Action::PrepareTransfer => self.prepare_transfer(contract, &params).map(ActionOutput::Prepared),
            Action::BalanceOf => self.balance_of(contract, &params).await,
            Action::SendPrepared => self.send_prepared(&params).await,
            Action::Unknown(name) => {
                tracing::debug!(mechanism = EERC_NAME, action = %name, "Unknown action");
                Ok(ActionOutput::Unknown {
                    action: name.clone(),
                    message: format!(
                        "action '{}' is not supported by {}; known actions: {}",
                        name,
                        EERC_NAME,
                        Action::KNOWN.join(", ")
                    ),
                })
            }
        };

        let label = match action {
            Action::Unknown(_) => "unknown",
            ref known => known.as_str(),
        };
        metrics::record_mechanism_action(EERC_NAME, label, result.is_ok());
        if let Err(e) = &result {
            tracing::debug!(mechanism = EERC_NAME, action = label, error = %e, "Action failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::TransactionReceipt;
    use crate::error::{NetworkError, ValidationError};
    use alloy::primitives::{address, Bytes, TxHash, U256};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TOKEN: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const HOLDER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    /// Chain reader that counts every call and returns a fixed balance.
    #[derive(Default)]
    struct CountingReader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ChainReader for CountingReader {
        async fn chain_id(&self) -> BridgeResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(43113)
        }
        async fn block_number(&self) -> BridgeResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }
        async fn call(&self, _to: Address, _data: Bytes) -> BridgeResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NetworkError::ReadFailure("execution reverted".into()).into());
            }
            Ok(DynSolValue::Uint(U256::from(1234), 256).abi_encode().into())
        }
        async fn transaction_receipt(&self, _tx_hash: TxHash) -> BridgeResult<Option<TransactionReceipt>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingSigner {
        submits: AtomicUsize,
    }

    #[async_trait]
    impl SigningAuthority for CountingSigner {
        fn account(&self) -> Address {
            Address::repeat_byte(0x11)
        }
        async fn submit(&self, _tx: &PreparedTransaction) -> BridgeResult<TxHash> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(TxHash::repeat_byte(0xab))
        }
    }

    /// Signer that records the largest number of submits in flight at once.
    #[derive(Default)]
    struct OverlapSigner {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl SigningAuthority for OverlapSigner {
        fn account(&self) -> Address {
            Address::repeat_byte(0x22)
        }
        async fn submit(&self, _tx: &PreparedTransaction) -> BridgeResult<TxHash> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TxHash::repeat_byte(0xcd))
        }
    }

    fn mechanism(
        reader: Arc<CountingReader>,
        authority: Option<Arc<dyn SigningAuthority>>,
    ) -> EercMechanism {
        let broadcaster = Broadcaster::new(reader.clone(), 0, Duration::from_millis(5));
        EercMechanism::new(Some(TOKEN.to_string()), reader, broadcaster, authority)
    }

    async fn ready(reader: Arc<CountingReader>) -> EercMechanism {
        let m = mechanism(reader, None);
        m.init().await.unwrap();
        m
    }

    #[tokio::test]
    async fn test_execute_before_init_fails() {
        let m = mechanism(Arc::new(CountingReader::default()), None);
        for action in ["info", "prepareTransfer", "balanceOf", "sendPrepared", "mint"] {
            let err = m.execute(action, json!({})).await.unwrap_err();
            assert!(matches!(err, BridgeError::NotInitialized(_)), "{}", action);
        }
    }

    #[tokio::test]
    async fn test_init_without_contract_is_configuration_error() {
        let reader = Arc::new(CountingReader::default());
        let broadcaster = Broadcaster::new(reader.clone(), 0, Duration::from_millis(5));
        let m = EercMechanism::new(Some("  ".into()), reader, broadcaster, None);
        let err = m.init().await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Configuration(ConfigurationError::MissingContractAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let m = ready(Arc::new(CountingReader::default())).await;
        m.init().await.unwrap();
        assert_eq!(m.contract(), Some(address!("0x5FbDB2315678afecb367f032d93F642f64180aa3")));
    }

    #[tokio::test]
    async fn test_info_is_stable_and_offline() {
        let reader = Arc::new(CountingReader::default());
        let m = ready(reader.clone()).await;
        let first = m.execute("info", json!({})).await.unwrap();
        let second = m.execute("info", json!({"ignored": true})).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
        match first {
            ActionOutput::Info(info) => {
                assert_eq!(info.name, "EERC");
                assert!(!info.can_send);
                assert_eq!(info.abi_surface.len(), 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_transfer_round_trip() {
        let m = ready(Arc::new(CountingReader::default())).await;
        let output = m
            .execute("prepareTransfer", json!({"to": HOLDER, "amount": "10000000000000000000"}))
            .await
            .unwrap();
        let ActionOutput::Prepared(tx) = output else {
            panic!("expected prepared transaction");
        };
        assert_eq!(tx.to, TOKEN.parse::<Address>().unwrap());
        assert!(tx.value.is_none());

        let decoded = erc20::transfer().decode(&tx.data).unwrap();
        assert_eq!(decoded[0], DynSolValue::Address(HOLDER.parse().unwrap()));
        assert_eq!(
            decoded[1],
            DynSolValue::Uint(U256::from(10_000_000_000_000_000_000u128), 256)
        );
    }

    #[tokio::test]
    async fn test_missing_amount_makes_no_network_calls() {
        let reader = Arc::new(CountingReader::default());
        let signer = Arc::new(CountingSigner::default());
        let m = mechanism(reader.clone(), Some(signer.clone()));
        m.init().await.unwrap();

        let err = m
            .execute("prepareTransfer", json!({"to": HOLDER}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::MissingParameter(ref f)) if f == "amount"
        ));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(signer.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prepare_transfer_validation() {
        let m = ready(Arc::new(CountingReader::default())).await;
        let err = m
            .execute("prepareTransfer", json!({"amount": 1}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::MissingParameter(ref f)) if f == "to"
        ));

        let err = m
            .execute("prepareTransfer", json!({"to": "0xnope", "amount": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(ValidationError::InvalidAddress(_))));

        let err = m
            .execute("prepareTransfer", json!({"to": HOLDER, "amount": -3}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(ValidationError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_balance_of() {
        let reader = Arc::new(CountingReader::default());
        let m = ready(reader.clone()).await;
        let output = m.execute("balanceOf", json!({"address": HOLDER})).await.unwrap();
        assert_eq!(
            output,
            ActionOutput::Balance {
                address: HOLDER.parse().unwrap(),
                balance: U256::from(1234)
            }
        );
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_balance_of_read_failure() {
        let reader = Arc::new(CountingReader {
            fail: true,
            ..Default::default()
        });
        let m = ready(reader).await;
        let err = m.execute("balanceOf", json!({"address": HOLDER})).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(NetworkError::ReadFailure(_))));
    }

    #[tokio::test]
    async fn test_send_prepared_without_signer() {
        let m = ready(Arc::new(CountingReader::default())).await;
        let err = m
            .execute("sendPrepared", json!({"tx": {"to": TOKEN, "data": "0x"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NoSigningAuthority));
    }

    #[tokio::test]
    async fn test_send_prepared_delegates_to_signer() {
        let reader = Arc::new(CountingReader::default());
        let signer = Arc::new(CountingSigner::default());
        let m = mechanism(reader, Some(signer.clone()));
        m.init().await.unwrap();

        let prepared = m
            .execute("prepareTransfer", json!({"to": HOLDER, "amount": 5}))
            .await
            .unwrap();
        let ActionOutput::Prepared(tx) = prepared else {
            panic!("expected prepared transaction");
        };
        let sent = m
            .execute("sendPrepared", json!({ "tx": serde_json::to_value(&tx).unwrap() }))
            .await
            .unwrap();
        assert_eq!(
            sent,
            ActionOutput::Sent {
                tx_hash: TxHash::repeat_byte(0xab)
            }
        );
        assert_eq!(signer.submits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_action_is_soft() {
        let m = ready(Arc::new(CountingReader::default())).await;
        let output = m.execute("mint", json!({})).await.unwrap();
        match output {
            ActionOutput::Unknown { action, message } => {
                assert_eq!(action, "mint");
                assert!(message.contains("prepareTransfer"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_send_prepared_never_overlap() {
        let signer = Arc::new(OverlapSigner::default());
        let m = mechanism(Arc::new(CountingReader::default()), Some(signer.clone()));
        m.init().await.unwrap();

        let tx = json!({"tx": {"to": TOKEN, "data": "0x"}});
        let (a, b) = tokio::join!(
            m.execute("sendPrepared", tx.clone()),
            m.execute("sendPrepared", tx.clone())
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(signer.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
