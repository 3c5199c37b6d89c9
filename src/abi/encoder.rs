//! Typed function calls to opaque call data and back.
//!
//! Signatures are accepted in human-readable form
//! (`function transfer(address to, uint256 amount) returns (bool)`) or in
//! canonical form (`transfer(address,uint256)`) and parsed by
//! `alloy::json_abi`. Encoding is a pure function of the signature and
//! arguments; arity and type mismatches are rejected with `MalformedCall`
//! before anything touches the network.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, Param, StateMutability};
use alloy::primitives::{Bytes, Selector};

use crate::error::ValidationError;

/// A callable function with its input and output types resolved.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    function: Function,
    inputs: Vec<DynSolType>,
    outputs: Vec<DynSolType>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, inputs: Vec<DynSolType>) -> Self {
        let function = Function {
            name: name.into(),
            inputs: inputs.iter().map(param_for).collect(),
            outputs: Vec::new(),
            state_mutability: StateMutability::NonPayable,
        };
        Self {
            function,
            inputs,
            outputs: Vec::new(),
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<DynSolType>) -> Self {
        self.function.outputs = outputs.iter().map(param_for).collect();
        self.outputs = outputs;
        self
    }

    /// Parse a human-readable or canonical signature.
    pub fn parse(signature: &str) -> Result<Self, ValidationError> {
        let function = Function::parse(signature.trim())
            .map_err(|e| malformed(format!("cannot parse '{}': {}", signature, e)))?;
        let inputs = resolve_all(&function.inputs)?;
        let outputs = resolve_all(&function.outputs)?;
        Ok(Self {
            function,
            inputs,
            outputs,
        })
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn inputs(&self) -> &[DynSolType] {
        &self.inputs
    }

    /// Canonical form used for selector hashing, e.g. `transfer(address,uint256)`.
    pub fn canonical(&self) -> String {
        self.function.signature()
    }

    pub fn selector(&self) -> Selector {
        self.function.selector()
    }

    /// Encode a call: selector followed by the ABI-encoded arguments.
    pub fn encode(&self, args: &[DynSolValue]) -> Result<Bytes, ValidationError> {
        if args.len() != self.inputs.len() {
            return Err(malformed(format!(
                "{} expects {} argument(s), got {}",
                self.canonical(),
                self.inputs.len(),
                args.len()
            )));
        }
        for (i, (ty, arg)) in self.inputs.iter().zip(args).enumerate() {
            if !ty.matches(arg) {
                return Err(malformed(format!(
                    "argument {} of {} is not a {}",
                    i,
                    self.name(),
                    ty.sol_type_name()
                )));
            }
        }

        self.function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| malformed(format!("encode failed: {}", e)))
    }

    /// Decode call data produced by [`encode`](Self::encode).
    pub fn decode(&self, data: &[u8]) -> Result<Vec<DynSolValue>, ValidationError> {
        let params = data
            .strip_prefix(self.selector().as_slice())
            .ok_or_else(|| malformed(format!("call data is not a {} call", self.canonical())))?;
        self.function
            .abi_decode_input(params)
            .map_err(|e| malformed(format!("decode failed: {}", e)))
    }

    /// Decode the return data of an `eth_call`.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>, ValidationError> {
        self.function
            .abi_decode_output(data)
            .map_err(|e| malformed(format!("decode failed: {}", e)))
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())?;
        if !self.outputs.is_empty() {
            let types: Vec<_> = self.outputs.iter().map(|t| t.sol_type_name()).collect();
            write!(f, " returns ({})", types.join(","))?;
        }
        Ok(())
    }
}

fn resolve_all(params: &[Param]) -> Result<Vec<DynSolType>, ValidationError> {
    params
        .iter()
        .map(|p| {
            p.resolve()
                .map_err(|e| malformed(format!("unknown type '{}': {}", p.ty, e)))
        })
        .collect()
}

// Unnamed json-abi parameter; tuples are spelled `tuple` with components.
fn param_for(ty: &DynSolType) -> Param {
    let (ty, components) = param_shape(ty);
    Param {
        ty,
        name: String::new(),
        components,
        internal_type: None,
    }
}

fn param_shape(ty: &DynSolType) -> (String, Vec<Param>) {
    match ty {
        DynSolType::Tuple(members) => ("tuple".to_string(), members.iter().map(param_for).collect()),
        DynSolType::Array(inner) => {
            let (base, components) = param_shape(inner);
            (format!("{}[]", base), components)
        }
        DynSolType::FixedArray(inner, len) => {
            let (base, components) = param_shape(inner);
            (format!("{}[{}]", base, len), components)
        }
        other => (other.sol_type_name().into_owned(), Vec::new()),
    }
}

fn malformed(message: String) -> ValidationError {
    ValidationError::MalformedCall(message)
}
