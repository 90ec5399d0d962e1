// Send prepared calls as one multicall, falling back to individual sends
use alloy_primitives::{Address, B256};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::calls;
use crate::chains::{CallKind, GasEstimator, PreparedCall, TransactionConfig, TransactionSubmitter};
use crate::error::BatchError;
use crate::metrics::RelayerMetrics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Sent { transaction_hash: B256 },
    Failed { error: String },
}

impl CallOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, CallOutcome::Sent { .. })
    }
}

/// Outcome of one call within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallReport {
    pub kind: CallKind,
    pub target: Address,
    pub message: String,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Outcome of the multicall, when more than one call was batched
    pub multicall: Option<CallOutcome>,
    /// Whether the calls were re-sent individually after the multicall failed
    pub fell_back: bool,
    /// One entry per input call, in order
    pub calls: Vec<CallReport>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn sent(&self) -> usize {
        self.calls.iter().filter(|call| call.outcome.is_sent()).count()
    }

    pub fn failed(&self) -> usize {
        self.calls.len() - self.sent()
    }
}

pub struct TransactionBatcher<'a> {
    submitter: &'a dyn TransactionSubmitter,
    gas_estimator: &'a dyn GasEstimator,
    account: Address,
    metrics: &'a RelayerMetrics,
}

impl<'a> TransactionBatcher<'a> {
    pub fn new(
        submitter: &'a dyn TransactionSubmitter,
        gas_estimator: &'a dyn GasEstimator,
        account: Address,
        metrics: &'a RelayerMetrics,
    ) -> Self {
        Self { submitter, gas_estimator, account, metrics }
    }

    /// Submit every present call. Several calls must share one target, they
    /// are wrapped in a `multicall` on it; if that fails each call is sent on
    /// its own, in order, and its outcome recorded independently.
    ///
    /// Mixed targets are rejected before anything is sent.
    pub async fn process<I>(&self, calls: I) -> Result<BatchReport, BatchError>
    where
        I: IntoIterator<Item = Option<PreparedCall>>,
    {
        let calls: Vec<PreparedCall> = calls.into_iter().flatten().collect();

        match calls.as_slice() {
            [] => Ok(BatchReport::default()),
            [call] => {
                debug!(at = "Relayer#TxProcessor", kind = %call.kind, "Sending transaction");
                let outcome = self.send(call).await;
                Ok(BatchReport { calls: vec![report(call, outcome)], ..Default::default() })
            }
            [first, rest @ ..] => {
                let target = first.target;
                if let Some(other) = rest.iter().find(|call| call.target != target) {
                    return Err(BatchError::MixedTargets { expected: target, found: other.target });
                }

                let batch = calls::multicall(target, &calls);
                let outcome = self.send(&batch).await;

                if let CallOutcome::Sent { transaction_hash } = outcome {
                    for call in &calls {
                        self.metrics.calls_submitted.with_label_values(&[call.kind.as_str()]).inc();
                    }
                    let reports = calls
                        .iter()
                        .map(|call| report(call, CallOutcome::Sent { transaction_hash }))
                        .collect();
                    return Ok(BatchReport { multicall: Some(outcome), fell_back: false, calls: reports });
                }

                self.metrics.batch_fallbacks.observe(calls.len() as f64);
                let mut reports = Vec::with_capacity(calls.len());
                for call in &calls {
                    info!(at = "Relayer#TxProcessor", kind = %call.kind, "Sending batched transactions individually 😷");
                    let individual = self.send(call).await;
                    reports.push(report(call, individual));
                }
                Ok(BatchReport { multicall: Some(outcome), fell_back: true, calls: reports })
            }
        }
    }

    async fn send(&self, call: &PreparedCall) -> CallOutcome {
        if let Err(e) = self.gas_estimator.update().await {
            return self.failed(call, e.to_string());
        }
        let config = TransactionConfig { from: self.account, gas_price: self.gas_estimator.fast_price() };

        match self.submitter.submit(call, &config).await {
            Ok(receipt) => {
                info!(
                    at = "Relayer#TxProcessor",
                    tx = %receipt.transaction_hash,
                    description = %call.description,
                    "{}",
                    call.message
                );
                // Batched calls are counted by their own kinds once the multicall lands
                if call.kind != CallKind::Multicall {
                    self.metrics.calls_submitted.with_label_values(&[call.kind.as_str()]).inc();
                }
                CallOutcome::Sent { transaction_hash: receipt.transaction_hash }
            }
            Err(e) => self.failed(call, e.to_string()),
        }
    }

    fn failed(&self, call: &PreparedCall, error: String) -> CallOutcome {
        if call.kind == CallKind::Multicall {
            warn!(at = "Relayer#TxProcessor", %error, "Multicall batch failed");
        } else {
            error!(at = "Relayer#TxProcessor", kind = %call.kind, %error, "Something errored sending a transaction");
        }
        self.metrics.transaction_failures.with_label_values(&[call.kind.as_str()]).inc();
        CallOutcome::Failed { error }
    }
}

fn report(call: &PreparedCall, outcome: CallOutcome) -> CallReport {
    CallReport { kind: call.kind, target: call.target, message: call.message.clone(), outcome }
}
