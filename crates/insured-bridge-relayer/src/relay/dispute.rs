// Decide whether a pending relay is invalid and must be disputed
use alloy_primitives::Address;
use std::collections::HashMap;
use std::fmt;

use super::matcher::DepositMatcher;
use crate::chains::{DeploymentInfo, Deposit, OriginLedger, Relay, SettleableRelay, SettlementLedger};
use crate::error::{GatewayError, RelayerError};

/// Expiry status of a relay's dispute window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayExpiry {
    pub is_expired: bool,
    /// `price_request_time + liveness`
    pub expiration_time: u64,
    /// Bridge pool clock at the time of the check
    pub contract_time: u64,
}

/// A relay is expired once it is settleable by anyone, including its own slow
/// relayer. The times are reported for logging only.
pub async fn relay_expiry(
    settlement: &dyn SettlementLedger,
    relay: &Relay,
) -> Result<RelayExpiry, GatewayError> {
    let (liveness, contract_time) = futures::try_join!(
        settlement.optimistic_oracle_liveness(),
        settlement.current_time(relay.l1_token),
    )?;
    Ok(RelayExpiry {
        is_expired: relay.settleable != SettleableRelay::CannotSettle,
        expiration_time: u64::from(relay.price_request_time).saturating_add(liveness),
        contract_time,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeReason {
    /// Relay targets a chain the relayer does not support
    UnsupportedChain(u64),
    /// No deposit on the origin chain matches the relay
    MissingDeposit,
    /// Quote timestamp precedes the bridge pool deployment
    QuoteBeforeDeployment { quote_timestamp: u32, deployed_at: u32 },
    RealizedFeeMismatch { relayed: u64, expected: u64 },
}

impl fmt::Display for DisputeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisputeReason::UnsupportedChain(chain_id) => write!(f, "chain ID {} is not whitelisted", chain_id),
            DisputeReason::MissingDeposit => write!(f, "no matching deposit"),
            DisputeReason::QuoteBeforeDeployment { quote_timestamp, deployed_at } => write!(
                f,
                "quote time {} is before bridge pool deployment at {}",
                quote_timestamp, deployed_at
            ),
            DisputeReason::RealizedFeeMismatch { relayed, expected } => write!(
                f,
                "relayRealizedLpFeePct: {} != expectedRelayRealizedLpFeePct: {}",
                relayed, expected
            ),
        }
    }
}

/// Compare the realized LP fee recorded by a relay against the expected one
pub fn realized_fee_mismatch(relay: &Relay, expected_realized_lp_fee_pct: u64) -> Option<DisputeReason> {
    (relay.realized_lp_fee_pct != expected_realized_lp_fee_pct).then_some(DisputeReason::RealizedFeeMismatch {
        relayed: relay.realized_lp_fee_pct,
        expected: expected_realized_lp_fee_pct,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeVerdict {
    /// Past its dispute window, nothing to do but settle
    Expired(RelayExpiry),
    /// Whitelisted chain the origin client cannot query
    UnqueryableChain,
    Valid,
    /// Dispute against `deposit`, which is reconstructed from the relay when
    /// no matching deposit exists
    Dispute { deposit: Deposit, reason: DisputeReason },
}

pub struct DisputeEvaluator<'a> {
    origin: &'a dyn OriginLedger,
    settlement: &'a dyn SettlementLedger,
    whitelisted_chain_ids: &'a [u64],
    deployments: &'a HashMap<Address, DeploymentInfo>,
    lookback: u64,
}

impl<'a> DisputeEvaluator<'a> {
    pub fn new(
        origin: &'a dyn OriginLedger,
        settlement: &'a dyn SettlementLedger,
        whitelisted_chain_ids: &'a [u64],
        deployments: &'a HashMap<Address, DeploymentInfo>,
        lookback: u64,
    ) -> Self {
        Self { origin, settlement, whitelisted_chain_ids, deployments, lookback }
    }

    pub async fn evaluate(&self, relay: &Relay) -> Result<DisputeVerdict, RelayerError> {
        let expiry = relay_expiry(self.settlement, relay).await?;
        if expiry.is_expired {
            return Ok(DisputeVerdict::Expired(expiry));
        }

        if !self.whitelisted_chain_ids.contains(&relay.chain_id) {
            return self.dispute_claimed(relay, DisputeReason::UnsupportedChain(relay.chain_id)).await;
        }

        if relay.chain_id != self.origin.chain_id() {
            return Ok(DisputeVerdict::UnqueryableChain);
        }

        let deployment = self
            .deployments
            .get(&relay.l1_token)
            .ok_or(RelayerError::MissingDeployment(relay.l1_token))?;

        let matcher = DepositMatcher::new(self.origin, self.lookback);
        let deposit = match matcher.find_deposit(relay.deposit_hash, deployment).await? {
            Some(deposit) if relay.matches_deposit(&deposit) => deposit,
            _ => return self.dispute_claimed(relay, DisputeReason::MissingDeposit).await,
        };

        // The pricing oracle cannot quote before the pool existed
        if deposit.quote_timestamp < deployment.timestamp {
            let reason = DisputeReason::QuoteBeforeDeployment {
                quote_timestamp: deposit.quote_timestamp,
                deployed_at: deployment.timestamp,
            };
            return Ok(DisputeVerdict::Dispute { deposit, reason });
        }

        let expected = self.settlement.calculate_realized_lp_fee_pct(&deposit).await?;
        match realized_fee_mismatch(relay, expected) {
            Some(reason) => Ok(DisputeVerdict::Dispute { deposit, reason }),
            None => Ok(DisputeVerdict::Valid),
        }
    }

    async fn dispute_claimed(&self, relay: &Relay, reason: DisputeReason) -> Result<DisputeVerdict, RelayerError> {
        let deposit_contract = self.settlement.deposit_contract(relay.chain_id).await?;
        Ok(DisputeVerdict::Dispute { deposit: relay.claimed_deposit(deposit_contract), reason })
    }
}
