// Locate the origin chain deposit a relay claims to honor
use alloy_primitives::B256;
use tracing::debug;

use crate::chains::{DeploymentInfo, Deposit, OriginLedger};
use crate::error::GatewayError;

/// Finds deposits by hash, falling back to a windowed block search from the
/// bridge pool deployment when the origin client's default search misses.
pub struct DepositMatcher<'a> {
    origin: &'a dyn OriginLedger,
    lookback: u64,
}

impl<'a> DepositMatcher<'a> {
    /// `lookback` is the number of blocks per search window; zero is treated
    /// as one.
    pub fn new(origin: &'a dyn OriginLedger, lookback: u64) -> Self {
        Self { origin, lookback: lookback.max(1) }
    }

    /// Deposit whose recomputed hash equals `deposit_hash`, or `None` once
    /// every block from deployment to head has been searched.
    pub async fn find_deposit(
        &self,
        deposit_hash: B256,
        deployment: &DeploymentInfo,
    ) -> Result<Option<Deposit>, GatewayError> {
        if let Some(deposit) = self.origin.deposit_by_hash(deposit_hash).await? {
            return Ok(Some(deposit));
        }

        let head = self.origin.latest_block().await?;
        let mut from_block = deployment.block_number;
        let mut to_block = from_block.saturating_add(self.lookback).min(head).max(from_block);

        loop {
            let events = self.origin.scan_deposit_events(from_block, to_block).await?;
            if let Some(event) = events.into_iter().find(|event| event.deposit_hash() == deposit_hash) {
                debug!(
                    at = "Relayer#DepositMatcher",
                    %deposit_hash,
                    from_block,
                    to_block,
                    "Matched deposit using block search from pool deployment"
                );
                return Ok(Some(event.into_deposit()));
            }

            // Checked after the scan so that at least one window is searched
            if to_block >= head {
                return Ok(None);
            }
            from_block = to_block + 1;
            to_block = to_block.saturating_add(self.lookback).min(head);
        }
    }
}
