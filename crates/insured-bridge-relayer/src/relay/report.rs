// Per-sweep record of what the relayer did
use alloy_primitives::{Address, B256};
use serde::Serialize;
use std::fmt;

use super::batcher::BatchReport;
use crate::chains::CallKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sweep {
    Relay,
    Dispute,
    Settle,
}

impl Sweep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sweep::Relay => "relay",
            Sweep::Dispute => "dispute",
            Sweep::Settle => "settle",
        }
    }

    /// `at` field used in this sweep's log lines
    pub fn location(&self) -> &'static str {
        match self {
            Sweep::Relay => "Relayer#Relayer",
            Sweep::Dispute => "Relayer#Disputer",
            Sweep::Settle => "Relayer#Finalizer",
        }
    }
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call the sweep decided to make
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub kind: CallKind,
    pub l1_token: Address,
    pub deposit_hash: B256,
    pub detail: String,
}

/// An item the sweep looked at and deliberately left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub l1_token: Address,
    pub deposit_hash: B256,
    pub reason: String,
}

/// An item that errored. A missing hash means a whole token failed, a
/// missing token means the sweep could not list its items at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub l1_token: Option<Address>,
    pub deposit_hash: Option<B256>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sweep: Sweep,
    pub actions: Vec<PlannedAction>,
    pub skipped: Vec<SkippedItem>,
    pub failures: Vec<ItemFailure>,
    pub batches: Vec<BatchReport>,
}

impl SweepReport {
    pub fn new(sweep: Sweep) -> Self {
        Self { sweep, actions: Vec::new(), skipped: Vec::new(), failures: Vec::new(), batches: Vec::new() }
    }

    pub fn act(&mut self, kind: CallKind, l1_token: Address, deposit_hash: B256, detail: impl Into<String>) {
        self.actions.push(PlannedAction { kind, l1_token, deposit_hash, detail: detail.into() });
    }

    pub fn skip(&mut self, l1_token: Address, deposit_hash: B256, reason: impl Into<String>) {
        self.skipped.push(SkippedItem { l1_token, deposit_hash, reason: reason.into() });
    }

    pub fn fail(&mut self, l1_token: Option<Address>, deposit_hash: Option<B256>, error: impl ToString) {
        self.failures.push(ItemFailure { l1_token, deposit_hash, error: error.to_string() });
    }

    /// Record a batch unless nothing was in it
    pub fn push_batch(&mut self, batch: BatchReport) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    pub fn actions_of(&self, kind: CallKind) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter().filter(move |action| action.kind == kind)
    }

    /// Calls confirmed across all batches
    pub fn sent(&self) -> usize {
        self.batches.iter().map(BatchReport::sent).sum()
    }

    pub fn is_idle(&self) -> bool {
        self.actions.is_empty() && self.failures.is_empty()
    }
}
