// Error types for the relayer
use alloy_primitives::utils::UnitsError;
use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Failure reading state from either ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Ledger query failed: {0}")]
    Query(String),

    #[error("No bridge pool registered for L1 token {0}")]
    UnknownPool(Address),
}

/// Failure sending a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Transaction reverted: {0}")]
    Reverted(String),
}

/// Fatal batching errors. These indicate a caller bug, not a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch transaction processing error! Can't specify multiple `to` fields within batch (expected {expected}, found {found})")]
    MixedTargets { expected: Address, found: Address },
}

/// Top-level error for relayer operations
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Formatting error: {0}")]
    Units(#[from] UnitsError),

    #[error("No deployment info configured for L1 token {0}")]
    MissingDeployment(Address),

    #[error("No deposit found for relay with deposit hash {0}")]
    DepositNotFound(B256),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = RelayerError> = std::result::Result<T, E>;
