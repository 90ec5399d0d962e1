// Prepared calls and transaction submission primitives
use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of call, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    SlowRelay,
    SpeedUp,
    InstantRelay,
    Dispute,
    Settle,
    Multicall,
    Finalization,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::SlowRelay => "slow_relay",
            CallKind::SpeedUp => "speed_up",
            CallKind::InstantRelay => "instant_relay",
            CallKind::Dispute => "dispute",
            CallKind::Settle => "settle",
            CallKind::Multicall => "multicall",
            CallKind::Finalization => "finalization",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded contract call ready to be signed and sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedCall {
    pub kind: CallKind,
    /// Destination contract
    pub target: Address,
    pub calldata: Bytes,
    /// Short headline logged on success, e.g. "Slow Relay executed"
    pub message: String,
    /// Longer human readable description of what the call does
    pub description: String,
}

/// EIP-1559 style gas price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GasPrice {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Sender and pricing applied to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    pub from: Address,
    pub gas_price: GasPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
}
