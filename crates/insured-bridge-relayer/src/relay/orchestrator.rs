// Relay, dispute and settle sweeps over the whitelisted bridge pools
use alloy_primitives::{Address, B256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use super::batcher::TransactionBatcher;
use super::calls;
use super::decision::should_relay;
use super::dispute::{realized_fee_mismatch, relay_expiry, DisputeEvaluator, DisputeVerdict};
use super::matcher::DepositMatcher;
use super::report::{Sweep, SweepReport};
use super::requirement::relay_token_requirement;
use crate::chains::{
    CallKind, ClientRelayState, DeploymentInfo, Deposit, GasEstimator, OriginLedger, PreparedCall, Relay,
    RelaySubmitType, SettleableRelay, SettlementLedger, TransactionSubmitter,
};
use crate::config::RelayerConfig;
use crate::error::{RelayerError, Result};
use crate::metrics::RelayerMetrics;

/// Static parameters of a relayer instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerSettings {
    /// Account that signs every transaction and holds relay capital
    pub account: Address,
    pub whitelisted_l1_tokens: Vec<Address>,
    /// Relays for chain IDs outside this list are disputed
    pub whitelisted_chain_ids: Vec<u64>,
    /// Bridge pool deployment per L1 token
    pub deployments: HashMap<Address, DeploymentInfo>,
    /// Blocks per window for the fallback deposit search
    pub l2_lookback_window: u64,
}

impl From<&RelayerConfig> for RelayerSettings {
    fn from(config: &RelayerConfig) -> Self {
        Self {
            account: config.relayer.account,
            whitelisted_l1_tokens: config.relayer.whitelisted_l1_tokens.clone(),
            whitelisted_chain_ids: config.relayer.whitelisted_chain_ids.clone(),
            deployments: config.deployment_map(),
            l2_lookback_window: config.relayer.l2_lookback_window,
        }
    }
}

/// A deposit that has not been finalized on the settlement chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayableDeposit {
    pub status: ClientRelayState,
    pub deposit: Deposit,
}

/// Relayable deposits keyed by L1 token, rebuilt on every relay sweep
pub type RelayableDeposits = BTreeMap<Address, Vec<RelayableDeposit>>;

pub struct Relayer {
    /// Origin chain deposit client
    origin: Arc<dyn OriginLedger>,
    /// Settlement chain bridge pool client
    settlement: Arc<dyn SettlementLedger>,
    submitter: Arc<dyn TransactionSubmitter>,
    gas_estimator: Arc<dyn GasEstimator>,
    settings: RelayerSettings,
    metrics: Arc<RelayerMetrics>,
}

impl Relayer {
    pub fn new(
        origin: Arc<dyn OriginLedger>,
        settlement: Arc<dyn SettlementLedger>,
        submitter: Arc<dyn TransactionSubmitter>,
        gas_estimator: Arc<dyn GasEstimator>,
        settings: RelayerSettings,
        metrics: Arc<RelayerMetrics>,
    ) -> Self {
        Self { origin, settlement, submitter, gas_estimator, settings, metrics }
    }

    pub fn settings(&self) -> &RelayerSettings {
        &self.settings
    }

    pub fn metrics(&self) -> Arc<RelayerMetrics> {
        self.metrics.clone()
    }

    /// Run the relay, dispute and settle sweeps in that order
    pub async fn run_sweeps(&self) -> Result<Vec<SweepReport>> {
        Ok(vec![
            self.check_for_pending_deposits_and_relay().await?,
            self.check_for_pending_relays_and_dispute().await?,
            self.check_for_settleable_relays_and_settle().await?,
        ])
    }

    /// Relay every profitable, unfinalized deposit of each whitelisted token.
    /// Calls for a token are sent as one batch to its bridge pool.
    pub async fn check_for_pending_deposits_and_relay(&self) -> Result<SweepReport> {
        let _timer = self.metrics.sweep_duration.with_label_values(&[Sweep::Relay.as_str()]).start_timer();
        let mut report = SweepReport::new(Sweep::Relay);
        debug!(at = "Relayer#Relayer", "Checking for pending deposits and relaying");

        let relayable_deposits = self.relayable_deposits(&mut report).await;
        if relayable_deposits.is_empty() {
            debug!(at = "Relayer#Relayer", "No relayable deposits for any whitelisted tokens");
            return Ok(report);
        }

        for (l1_token, deposits) in &relayable_deposits {
            debug!(
                at = "Relayer#Relayer",
                %l1_token,
                count = deposits.len(),
                "Processing relayable deposits for L1 token"
            );
            let Some(deployment) = self.settings.deployments.get(l1_token) else {
                self.record_failure(&mut report, Some(*l1_token), None, RelayerError::MissingDeployment(*l1_token));
                continue;
            };

            let mut relay_calls = Vec::with_capacity(deposits.len());
            for relayable in deposits {
                let deposit = &relayable.deposit;
                // Pricing cannot be queried before the pool existed
                if deposit.quote_timestamp < deployment.timestamp {
                    debug!(
                        at = "Relayer#Relayer",
                        deposit_hash = %deposit.deposit_hash,
                        quote_timestamp = deposit.quote_timestamp,
                        deployment_time = deployment.timestamp,
                        "Deposit quote time < bridge pool deployment for L1 token, skipping"
                    );
                    report.skip(*l1_token, deposit.deposit_hash, "quote time before bridge pool deployment");
                    continue;
                }

                match self.relay_call_for_deposit(*l1_token, relayable, &mut report).await {
                    Ok(call) => relay_calls.push(call),
                    Err(e) => self.record_failure(&mut report, Some(*l1_token), Some(deposit.deposit_hash), e),
                }
            }

            let batch = self.batcher().process(relay_calls).await?;
            report.push_batch(batch);
        }

        Ok(report)
    }

    /// Dispute every pending relay that is invalid and still inside its
    /// dispute window. Disputes are batched per bridge pool.
    pub async fn check_for_pending_relays_and_dispute(&self) -> Result<SweepReport> {
        let _timer = self.metrics.sweep_duration.with_label_values(&[Sweep::Dispute.as_str()]).start_timer();
        let mut report = SweepReport::new(Sweep::Dispute);
        debug!(at = "Relayer#Disputer", "Checking for pending relays and disputing");

        let pending_relays = match self.settlement.pending_relays().await {
            Ok(relays) => relays,
            Err(e) => {
                self.record_failure(&mut report, None, None, e);
                return Ok(report);
            }
        };
        if pending_relays.is_empty() {
            debug!(at = "Relayer#Disputer", "No pending relays");
            return Ok(report);
        }
        debug!(at = "Relayer#Disputer", count = pending_relays.len(), "Processing pending relays");

        let evaluator = DisputeEvaluator::new(
            self.origin.as_ref(),
            self.settlement.as_ref(),
            &self.settings.whitelisted_chain_ids,
            &self.settings.deployments,
            self.settings.l2_lookback_window,
        );

        let mut disputes: BTreeMap<Address, Vec<Option<PreparedCall>>> = BTreeMap::new();
        for relay in &pending_relays {
            match self.dispute_call_for_relay(&evaluator, relay, &mut report).await {
                Ok(Some(call)) => disputes.entry(call.target).or_default().push(Some(call)),
                Ok(None) => {}
                Err(e) => self.record_failure(&mut report, Some(relay.l1_token), Some(relay.deposit_hash), e),
            }
        }

        for (_, calls) in disputes {
            let batch = self.batcher().process(calls).await?;
            report.push_batch(batch);
        }

        Ok(report)
    }

    /// Settle relays past their dispute window: any relay open to everyone,
    /// plus relays still reserved for their slow relayer when that is us.
    pub async fn check_for_settleable_relays_and_settle(&self) -> Result<SweepReport> {
        let _timer = self.metrics.sweep_duration.with_label_values(&[Sweep::Settle.as_str()]).start_timer();
        let mut report = SweepReport::new(Sweep::Settle);
        debug!(at = "Relayer#Finalizer", "Checking for settleable relays and settling");

        for l1_token in &self.settings.whitelisted_l1_tokens {
            debug!(at = "Relayer#Finalizer", %l1_token, "Checking settleable relays for token");

            let relays = match self.settlement.settleable_relays(*l1_token).await {
                Ok(relays) => relays,
                Err(e) => {
                    self.record_failure(&mut report, Some(*l1_token), None, e);
                    continue;
                }
            };
            let settleable: Vec<Relay> = relays
                .into_iter()
                .filter(|relay| {
                    (relay.settleable == SettleableRelay::SlowRelayerCanSettle
                        && relay.slow_relayer == self.settings.account)
                        || relay.settleable == SettleableRelay::AnyoneCanSettle
                })
                .collect();

            if settleable.is_empty() {
                debug!(at = "Relayer#Finalizer", %l1_token, "No settleable relays");
                continue;
            }

            let mut settle_calls = Vec::with_capacity(settleable.len());
            for relay in &settleable {
                match self.settle_call_for_relay(*l1_token, relay).await {
                    Ok(call) => {
                        report.act(CallKind::Settle, *l1_token, relay.deposit_hash, call.description.clone());
                        settle_calls.push(Some(call));
                    }
                    Err(e) => self.record_failure(&mut report, Some(*l1_token), Some(relay.deposit_hash), e),
                }
            }

            let batch = self.batcher().process(settle_calls).await?;
            report.push_batch(batch);
        }

        Ok(report)
    }

    async fn relayable_deposits(&self, report: &mut SweepReport) -> RelayableDeposits {
        let mut relayable_deposits = RelayableDeposits::new();

        for l1_token in &self.settings.whitelisted_l1_tokens {
            debug!(at = "Relayer#Relayer", %l1_token, "Checking relays for token");
            let deposits = match self.origin.deposits_for_token(*l1_token).await {
                Ok(deposits) => deposits,
                Err(e) => {
                    self.record_failure(report, Some(*l1_token), None, e);
                    continue;
                }
            };

            for deposit in deposits {
                match self.settlement.deposit_relay_state(&deposit).await {
                    Ok(ClientRelayState::Finalized) => {}
                    Ok(status) => relayable_deposits
                        .entry(*l1_token)
                        .or_default()
                        .push(RelayableDeposit { status, deposit }),
                    Err(e) => self.record_failure(report, Some(*l1_token), Some(deposit.deposit_hash), e),
                }
            }
        }

        relayable_deposits
    }

    async fn relay_call_for_deposit(
        &self,
        l1_token: Address,
        relayable: &RelayableDeposit,
        report: &mut SweepReport,
    ) -> Result<Option<PreparedCall>> {
        let deposit = &relayable.deposit;
        let realized_lp_fee_pct = self.settlement.calculate_realized_lp_fee_pct(deposit).await?;

        // Only a pending relay that is neither expired nor invalid is worth speeding up
        let pending_relay = self.settlement.relay_for_deposit(l1_token, deposit).await?;
        if let Some(relay) = &pending_relay {
            let expiry = relay_expiry(self.settlement.as_ref(), relay).await?;
            if expiry.is_expired {
                debug!(
                    at = "Relayer#Relayer",
                    deposit_hash = %deposit.deposit_hash,
                    expiration_time = expiry.expiration_time,
                    contract_time = expiry.contract_time,
                    "Pending relay has expired, ignoring"
                );
                report.skip(l1_token, deposit.deposit_hash, "pending relay has expired");
                return Ok(None);
            }
            if let Some(reason) = realized_fee_mismatch(relay, realized_lp_fee_pct) {
                debug!(at = "Relayer#Relayer", deposit_hash = %deposit.deposit_hash, %reason, "Pending relay is invalid");
                report.skip(l1_token, deposit.deposit_hash, format!("pending relay is invalid: {}", reason));
                return Ok(None);
            }
        }

        let has_instant_relayer = self
            .settlement
            .has_instant_relayer(l1_token, deposit.deposit_hash, realized_lp_fee_pct)
            .await?;
        if has_instant_relayer && relayable.status == ClientRelayState::Pending {
            debug!(at = "Relayer#Relayer", deposit_hash = %deposit.deposit_hash, "Relay pending and already sped up 😖");
            report.skip(l1_token, deposit.deposit_hash, "relay pending and already sped up");
            return Ok(None);
        }

        let (balance, proposer_bond_pct) = futures::try_join!(
            self.settlement.token_balance(self.settings.account, l1_token),
            self.settlement.proposer_bond_pct(),
        )?;
        let requirement = relay_token_requirement(deposit, proposer_bond_pct, realized_lp_fee_pct);
        let decision = should_relay(deposit, relayable.status, has_instant_relayer, balance, &requirement);
        debug!(
            at = "Relayer#Relayer",
            deposit_hash = %deposit.deposit_hash,
            submit_type = ?decision.submit_type,
            profit = %decision.profit,
            %balance,
            realized_lp_fee_pct,
            "Relay decision"
        );

        let kind = match decision.submit_type {
            RelaySubmitType::Ignore => {
                debug!(
                    at = "Relayer#Relayer",
                    deposit_hash = %deposit.deposit_hash,
                    "Not relaying potentially unprofitable deposit, or insufficient balance"
                );
                report.skip(l1_token, deposit.deposit_hash, "unprofitable or insufficient balance");
                return Ok(None);
            }
            RelaySubmitType::Slow => CallKind::SlowRelay,
            RelaySubmitType::SpeedUp => CallKind::SpeedUp,
            RelaySubmitType::Instant => CallKind::InstantRelay,
        };

        let pool = self.settlement.bridge_pool(l1_token).await?;
        let call = match (decision.submit_type, &pending_relay) {
            (RelaySubmitType::SpeedUp, Some(relay)) => calls::speed_up_call(&pool, deposit, relay)?,
            (RelaySubmitType::SpeedUp, None) => {
                self.record_failure(
                    report,
                    Some(l1_token),
                    Some(deposit.deposit_hash),
                    "speedUpRelay: undefined relay",
                );
                return Ok(None);
            }
            (RelaySubmitType::Instant, _) => calls::instant_relay_call(&pool, deposit, realized_lp_fee_pct)?,
            _ => calls::slow_relay_call(&pool, deposit, realized_lp_fee_pct)?,
        };

        report.act(kind, l1_token, deposit.deposit_hash, call.description.clone());
        Ok(Some(call))
    }

    async fn dispute_call_for_relay(
        &self,
        evaluator: &DisputeEvaluator<'_>,
        relay: &Relay,
        report: &mut SweepReport,
    ) -> Result<Option<PreparedCall>> {
        match evaluator.evaluate(relay).await? {
            DisputeVerdict::Expired(expiry) => {
                debug!(
                    at = "Relayer#Disputer",
                    deposit_hash = %relay.deposit_hash,
                    expiration_time = expiry.expiration_time,
                    contract_time = expiry.contract_time,
                    "Pending relay has expired, ignoring"
                );
                report.skip(relay.l1_token, relay.deposit_hash, "pending relay has expired");
                Ok(None)
            }
            DisputeVerdict::UnqueryableChain => {
                debug!(
                    at = "Relayer#Disputer",
                    chain_id = relay.chain_id,
                    origin_chain_id = self.origin.chain_id(),
                    "Relay chain ID is whitelisted but does not match origin chain ID"
                );
                report.skip(relay.l1_token, relay.deposit_hash, "whitelisted chain is not the origin chain");
                Ok(None)
            }
            DisputeVerdict::Valid => {
                debug!(
                    at = "Relayer#Disputer",
                    deposit_hash = %relay.deposit_hash,
                    "Skipping; relay matched with deposit and params are valid"
                );
                report.skip(relay.l1_token, relay.deposit_hash, "relay is valid");
                Ok(None)
            }
            DisputeVerdict::Dispute { deposit, reason } => {
                debug!(at = "Relayer#Disputer", deposit_hash = %relay.deposit_hash, %reason, "Disputing pending relay");
                let pool = self.settlement.bridge_pool(relay.l1_token).await?;
                let reason = reason.to_string();
                report.act(CallKind::Dispute, relay.l1_token, relay.deposit_hash, reason.clone());
                Ok(Some(calls::dispute_call(&pool, &deposit, relay, &reason)))
            }
        }
    }

    async fn settle_call_for_relay(&self, l1_token: Address, relay: &Relay) -> Result<PreparedCall> {
        let deployment = self
            .settings
            .deployments
            .get(&l1_token)
            .ok_or(RelayerError::MissingDeployment(l1_token))?;
        let matcher = DepositMatcher::new(self.origin.as_ref(), self.settings.l2_lookback_window);
        let deposit = matcher
            .find_deposit(relay.deposit_hash, deployment)
            .await?
            .ok_or(RelayerError::DepositNotFound(relay.deposit_hash))?;

        let instant_relayer = self
            .settlement
            .instant_relayer(l1_token, relay.deposit_hash, relay.realized_lp_fee_pct)
            .await?;
        let pool = self.settlement.bridge_pool(l1_token).await?;
        Ok(calls::settle_call(&pool, &deposit, relay, instant_relayer)?)
    }

    fn batcher(&self) -> TransactionBatcher<'_> {
        TransactionBatcher::new(
            self.submitter.as_ref(),
            self.gas_estimator.as_ref(),
            self.settings.account,
            &self.metrics,
        )
    }

    fn record_failure(
        &self,
        report: &mut SweepReport,
        l1_token: Option<Address>,
        deposit_hash: Option<B256>,
        error: impl fmt::Display,
    ) {
        let error = error.to_string();
        error!(
            at = report.sweep.location(),
            l1_token = ?l1_token,
            deposit_hash = ?deposit_hash,
            %error,
            "Unexpected error processing item"
        );
        self.metrics.sweep_item_errors.with_label_values(&[report.sweep.as_str()]).inc();
        report.fail(l1_token, deposit_hash, error);
    }
}
