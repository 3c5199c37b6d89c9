//! Read-only ERC-20 queries.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::sync::Arc;

use crate::abi::{erc20, FunctionSignature};
use crate::chain::client::ChainReader;
use crate::error::{BridgeResult, NetworkError, ValidationError};

/// Largest decimals value whose scale factor fits in a uint256.
pub const MAX_DECIMALS: u8 = 77;

/// Decimals and symbol of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMeta {
    pub decimals: u8,
    pub symbol: String,
}

/// ERC-20 reads against one contract.
#[derive(Clone)]
pub struct TokenReader {
    reader: Arc<dyn ChainReader>,
    contract: Address,
}

impl TokenReader {
    pub fn new(reader: Arc<dyn ChainReader>, contract: Address) -> Self {
        Self { reader, contract }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Raw balance in base units.
    pub async fn balance_of(&self, holder: Address) -> BridgeResult<U256> {
        let value = self
            .read_one(&erc20::balance_of(), &[DynSolValue::Address(holder)])
            .await?;
        value
            .as_uint()
            .map(|(v, _)| v)
            .ok_or_else(|| unexpected("balanceOf", &value))
    }

    pub async fn decimals(&self) -> BridgeResult<u8> {
        let value = self.read_one(&erc20::decimals(), &[]).await?;
        value
            .as_uint()
            .and_then(|(v, _)| u8::try_from(v.saturating_to::<u64>()).ok())
            .filter(|d| *d <= MAX_DECIMALS)
            .ok_or_else(|| unexpected("decimals", &value))
    }

    pub async fn symbol(&self) -> BridgeResult<String> {
        let value = self.read_one(&erc20::symbol(), &[]).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| unexpected("symbol", &value))
    }

    /// Decimals and symbol, read concurrently.
    pub async fn metadata(&self) -> BridgeResult<TokenMeta> {
        let (decimals, symbol) = futures_util::try_join!(self.decimals(), self.symbol())?;
        Ok(TokenMeta { decimals, symbol })
    }

    async fn read_one(
        &self,
        function: &FunctionSignature,
        args: &[DynSolValue],
    ) -> BridgeResult<DynSolValue> {
        let data = function.encode(args)?;
        let output = self.reader.call(self.contract, data).await?;
        let mut values = function
            .decode_output(&output)
            .map_err(|e| NetworkError::ReadFailure(format!("{}: {}", function.name(), e)))?;
        if values.len() != 1 {
            return Err(NetworkError::ReadFailure(format!(
                "{} returned {} values",
                function.name(),
                values.len()
            ))
            .into());
        }
        Ok(values.remove(0))
    }
}

fn unexpected(function: &str, value: &DynSolValue) -> crate::error::BridgeError {
    NetworkError::ReadFailure(format!("{} returned unexpected {:?}", function, value)).into()
}

/// Whole-token amount scaled to base units.
pub fn to_base_units(whole_tokens: u64, decimals: u8) -> Result<U256, ValidationError> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .and_then(|scale| U256::from(whole_tokens).checked_mul(scale))
        .ok_or_else(|| {
            ValidationError::InvalidAmount(format!(
                "{} tokens at {} decimals overflows uint256",
                whole_tokens, decimals
            ))
        })
}

/// Render base units with `decimals` fractional digits, trimming trailing zeros.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}
