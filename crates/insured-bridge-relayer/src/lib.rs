// Insured Bridge Relayer Library
// This module structure exposes the relayer components for testing and external use

pub mod chains;
pub mod config;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod service;
pub mod utils;

// Re-export commonly used types for convenience
pub use chains::{
    CanonicalBridgeAdapter, Deposit, GasEstimator, InMemoryLedger, LedgerSnapshot, OriginLedger, Relay,
    SettlementLedger, TransactionSubmitter,
};
pub use config::RelayerConfig;
pub use error::{RelayerError, Result};
pub use metrics::RelayerMetrics;
pub use relay::{CrossDomainFinalizer, Relayer, RelayerSettings, SweepReport};
pub use service::RelayerService;
