// Finalize L2 -> L1 canonical bridge messages once they are relayable
use alloy_primitives::{Address, B256};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use super::batcher::{BatchReport, TransactionBatcher};
use crate::chains::{CanonicalBridgeAdapter, GasEstimator, TransactionSubmitter};
use crate::error::BatchError;
use crate::metrics::RelayerMetrics;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizationReport {
    /// Messages whose finalization call was sent, with its outcome in `batches`
    pub finalized: Vec<B256>,
    /// Messages still inside their challenge period
    pub not_ready: Vec<B256>,
    pub failures: Vec<(B256, String)>,
    pub batches: Vec<BatchReport>,
}

/// Sends the L1 finalization call for each L2 transaction whose bridge
/// message has cleared the canonical bridge's challenge period.
pub struct CrossDomainFinalizer {
    adapter: Arc<dyn CanonicalBridgeAdapter>,
    submitter: Arc<dyn TransactionSubmitter>,
    gas_estimator: Arc<dyn GasEstimator>,
    account: Address,
    metrics: Arc<RelayerMetrics>,
}

impl CrossDomainFinalizer {
    pub fn new(
        adapter: Arc<dyn CanonicalBridgeAdapter>,
        submitter: Arc<dyn TransactionSubmitter>,
        gas_estimator: Arc<dyn GasEstimator>,
        account: Address,
        metrics: Arc<RelayerMetrics>,
    ) -> Self {
        Self { adapter, submitter, gas_estimator, account, metrics }
    }

    /// Each finalization is sent on its own: messenger contracts do not
    /// support multicall.
    pub async fn finalize(&self, l2_transaction_hashes: &[B256]) -> Result<FinalizationReport, BatchError> {
        let batcher = TransactionBatcher::new(
            self.submitter.as_ref(),
            self.gas_estimator.as_ref(),
            self.account,
            &self.metrics,
        );
        let mut report = FinalizationReport::default();

        for &l2_transaction_hash in l2_transaction_hashes {
            match self.adapter.construct_finalization_transaction(l2_transaction_hash).await {
                Ok(Some(call)) => {
                    debug!(
                        at = "Relayer#CrossDomainFinalizer",
                        adapter = self.adapter.name(),
                        %l2_transaction_hash,
                        "Finalizing cross domain message"
                    );
                    report.batches.push(batcher.process([Some(call)]).await?);
                    report.finalized.push(l2_transaction_hash);
                }
                Ok(None) => {
                    debug!(
                        at = "Relayer#CrossDomainFinalizer",
                        adapter = self.adapter.name(),
                        %l2_transaction_hash,
                        "Message is not confirmed yet"
                    );
                    report.not_ready.push(l2_transaction_hash);
                }
                Err(e) => {
                    error!(
                        at = "Relayer#CrossDomainFinalizer",
                        adapter = self.adapter.name(),
                        %l2_transaction_hash,
                        error = %e,
                        "Failed to construct finalization transaction"
                    );
                    self.metrics.sweep_item_errors.with_label_values(&["finalize"]).inc();
                    report.failures.push((l2_transaction_hash, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
