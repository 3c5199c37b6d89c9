//! Transaction descriptors and receipts exchanged between preparer, signer and chain.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::{TransactionReceipt as RpcReceipt, TransactionRequest};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValidationError;

/// Unsigned transaction ready for a signer.
///
/// Token transfers leave `value` unset. Gas hints are optional and either
/// legacy (`gasPrice`) or EIP-1559 (`maxFeePerGas` + `maxPriorityFeePerGas`),
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    pub to: Address,
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Fee model carried by a prepared transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeHint {
    /// Signer chooses fees.
    Unspecified,
    Legacy { gas_price: U256 },
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl PreparedTransaction {
    /// A call with no native value and no gas hints.
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            value: None,
            gas: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }

    /// Check the fee fields form one consistent model.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_legacy = self.gas_price.is_some();
        let has_1559 = self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some();
        if has_legacy && has_1559 {
            return Err(ValidationError::MalformedCall(
                "gasPrice cannot be combined with EIP-1559 fee fields".to_string(),
            ));
        }
        if has_1559 && (self.max_fee_per_gas.is_none() || self.max_priority_fee_per_gas.is_none()) {
            return Err(ValidationError::MalformedCall(
                "maxFeePerGas and maxPriorityFeePerGas must be given together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fee_hint(&self) -> FeeHint {
        match (self.gas_price, self.max_fee_per_gas, self.max_priority_fee_per_gas) {
            (Some(gas_price), _, _) => FeeHint::Legacy { gas_price },
            (None, Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => FeeHint::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
            _ => FeeHint::Unspecified,
        }
    }

    /// Build an alloy request; unset fields are left for provider fillers.
    pub fn to_request(&self, from: Option<Address>) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_to(self.to)
            .with_input(self.data.clone());
        if let Some(from) = from {
            request = request.with_from(from);
        }
        if let Some(value) = self.value {
            request = request.with_value(value);
        }
        if let Some(gas) = self.gas {
            request = request.with_gas_limit(gas.saturating_to::<u64>());
        }
        match self.fee_hint() {
            FeeHint::Legacy { gas_price } => {
                request = request.with_gas_price(gas_price.saturating_to::<u128>());
            }
            FeeHint::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                request = request
                    .with_max_fee_per_gas(max_fee_per_gas.saturating_to::<u128>())
                    .with_max_priority_fee_per_gas(max_priority_fee_per_gas.saturating_to::<u128>());
            }
            FeeHint::Unspecified => {}
        }
        request
    }
}

/// Terminal status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Receipt of a mined transaction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
    pub gas_used: u128,
    pub effective_gas_price: u128,
}

impl TransactionReceipt {
    /// Convert an RPC receipt; `None` while the transaction is not yet in a block.
    pub fn from_rpc(receipt: &RpcReceipt) -> Option<Self> {
        let block_number = receipt.block_number?;
        Some(Self {
            transaction_hash: receipt.transaction_hash,
            block_number,
            status: if receipt.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            },
            gas_used: u128::from(receipt.gas_used),
            effective_gas_price: u128::from(receipt.effective_gas_price),
        })
    }

    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Native-currency cost of the transaction in wei.
    pub fn gas_cost(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

/// A submitted transaction whose receipt has not been observed yet.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub submitted_at: Instant,
}

impl PendingTransaction {
    pub fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            submitted_at: Instant::now(),
        }
    }
}
