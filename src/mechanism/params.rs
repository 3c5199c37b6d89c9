//! Parameter extraction for mechanism actions. Pure; never touches the network.

use alloy::primitives::{Address, U256};
use serde_json::Value;

use crate::chain::types::PreparedTransaction;
use crate::error::ValidationError;

/// Fetch a required field, treating JSON `null` as absent.
pub fn required<'a>(params: &'a Value, field: &str) -> Result<&'a Value, ValidationError> {
    match params.get(field) {
        Some(Value::Null) | None => Err(ValidationError::MissingParameter(field.to_string())),
        Some(value) => Ok(value),
    }
}

/// Parse a 0x-prefixed, 40-hex-digit address.
///
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(value: &Value) -> Result<Address, ValidationError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::InvalidAddress(value.to_string()))?
        .trim();
    let invalid = || ValidationError::InvalidAddress(raw.to_string());

    let hex = raw.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let mixed_case = hex.chars().any(|c| c.is_ascii_lowercase()) && hex.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case {
        Address::parse_checksummed(raw, None).map_err(|_| invalid())
    } else {
        raw.parse::<Address>().map_err(|_| invalid())
    }
}

/// Parse a non-negative integer amount in base units.
///
/// Accepts a JSON integer, a decimal string, or a 0x-prefixed hex string.
pub fn parse_amount(value: &Value) -> Result<U256, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(value.to_string());
    match value {
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
                return Err(invalid());
            }
            s.parse::<U256>().map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Decode a prepared transaction passed back by a caller.
pub fn parse_prepared(value: &Value) -> Result<PreparedTransaction, ValidationError> {
    let tx: PreparedTransaction = serde_json::from_value(value.clone())
        .map_err(|e| ValidationError::MalformedCall(format!("tx: {}", e)))?;
    tx.validate()?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_treats_null_as_missing() {
        let params = json!({"to": null, "amount": 5});
        assert_eq!(
            required(&params, "to").unwrap_err(),
            ValidationError::MissingParameter("to".into())
        );
        assert!(required(&params, "amount").is_ok());
        assert!(required(&json!(null), "amount").is_err());
    }

    #[test]
    fn test_parse_address() {
        let lower = json!("0x5fbdb2315678afecb367f032d93f642f64180aa3");
        let checksummed = json!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        assert_eq!(parse_address(&lower).unwrap(), parse_address(&checksummed).unwrap());

        // Bad checksum
        assert!(parse_address(&json!("0x5FBdB2315678afecb367f032d93F642f64180aa3")).is_err());
        // No prefix, short, non-hex, not a string
        assert!(parse_address(&json!("5fbdb2315678afecb367f032d93f642f64180aa3")).is_err());
        assert!(parse_address(&json!("0x1234")).is_err());
        assert!(parse_address(&json!("0xzzzdb2315678afecb367f032d93f642f64180aa3")).is_err());
        assert!(parse_address(&json!(42)).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(0)).unwrap(), U256::ZERO);
        assert_eq!(parse_amount(&json!(1000)).unwrap(), U256::from(1000));
        assert_eq!(
            parse_amount(&json!("10000000000000000000")).unwrap(),
            U256::from(10_000_000_000_000_000_000u128)
        );
        assert_eq!(parse_amount(&json!("0x10")).unwrap(), U256::from(16));

        assert!(parse_amount(&json!(-1)).is_err());
        assert!(parse_amount(&json!(1.5)).is_err());
        assert!(parse_amount(&json!("-5")).is_err());
        assert!(parse_amount(&json!("")).is_err());
        assert!(parse_amount(&json!("1e18")).is_err());
        assert!(parse_amount(&json!(true)).is_err());
    }

    #[test]
    fn test_parse_prepared() {
        let tx = parse_prepared(&json!({
            "to": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "data": "0xa9059cbb"
        }))
        .unwrap();
        assert_eq!(tx.data.len(), 4);

        assert!(matches!(
            parse_prepared(&json!({"data": "0x"})),
            Err(ValidationError::MalformedCall(_))
        ));
    }
}
