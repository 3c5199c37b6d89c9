//! ERC-20 call surface.

use alloy::dyn_abi::DynSolType;
use alloy::sol;

use crate::abi::encoder::FunctionSignature;

sol! {
    /// Subset of ERC-20 the bridge reads and writes.
    #[derive(Debug)]
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

/// Human-readable form of the surface, reported by `info`.
pub const ERC20_ABI: &[&str] = &[
    "function transfer(address to, uint256 amount) returns (bool)",
    "function balanceOf(address account) view returns (uint256)",
    "function decimals() view returns (uint8)",
    "function symbol() view returns (string)",
];

pub fn transfer() -> FunctionSignature {
    FunctionSignature::new("transfer", vec![DynSolType::Address, DynSolType::Uint(256)])
        .with_outputs(vec![DynSolType::Bool])
}

pub fn balance_of() -> FunctionSignature {
    FunctionSignature::new("balanceOf", vec![DynSolType::Address])
        .with_outputs(vec![DynSolType::Uint(256)])
}

pub fn decimals() -> FunctionSignature {
    FunctionSignature::new("decimals", Vec::new()).with_outputs(vec![DynSolType::Uint(8)])
}

pub fn symbol() -> FunctionSignature {
    FunctionSignature::new("symbol", Vec::new()).with_outputs(vec![DynSolType::String])
}
