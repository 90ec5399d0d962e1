// Capital needed to perform each kind of relay
use alloy_primitives::U256;
use tracing::error;

use crate::chains::types::{fixed_point, Deposit, FIXED_POINT};

/// Token amounts the relayer must hold to slow relay or to speed up a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTokenRequirement {
    /// Proposer bond posted by a slow relay
    pub slow: U256,
    /// Amount forwarded to the recipient by an instant relayer
    pub instant: U256,
}

impl RelayTokenRequirement {
    /// Capital needed to slow relay and speed up in one transaction
    pub fn combined(&self) -> U256 {
        self.slow.saturating_add(self.instant)
    }
}

/// Multiply an amount by an 18-decimal fraction, rounding down.
///
/// An amount too large for the full-width product is logged as an error and
/// scaled down before multiplying instead, saturating at `U256::MAX`.
pub fn apply_pct(amount: U256, pct: u64) -> U256 {
    let fp = fixed_point();
    let pct_wide = U256::from(pct);
    match amount.checked_mul(pct_wide) {
        Some(product) => product / fp,
        None => {
            error!(
                at = "Relayer#RelayTokenRequirement",
                %amount,
                pct,
                "Token amount overflows fee multiplication, amount is implausible"
            );
            (amount / fp)
                .checked_mul(pct_wide)
                .and_then(|whole| whole.checked_add((amount % fp) * pct_wide / fp))
                .unwrap_or(U256::MAX)
        }
    }
}

/// slow = amount * proposer bond;
/// instant = amount * (1 - realized LP fee - slow relay fee - instant relay fee).
///
/// A fee sum above 100% leaves nothing for the recipient. That can only come
/// from inconsistent pricing upstream, so it is logged as an error and the
/// instant requirement floors at zero.
pub fn relay_token_requirement(
    deposit: &Deposit,
    proposer_bond_pct: u64,
    realized_lp_fee_pct: u64,
) -> RelayTokenRequirement {
    let slow = apply_pct(deposit.amount, proposer_bond_pct);

    let total_fee_pct = realized_lp_fee_pct as u128
        + deposit.slow_relay_fee_pct as u128
        + deposit.instant_relay_fee_pct as u128;

    let instant = match (FIXED_POINT as u128).checked_sub(total_fee_pct) {
        // Bounded by FIXED_POINT so it fits back in a u64
        Some(remaining_pct) => apply_pct(deposit.amount, remaining_pct as u64),
        None => {
            error!(
                at = "Relayer#RelayTokenRequirement",
                deposit_hash = %deposit.deposit_hash,
                realized_lp_fee_pct,
                slow_relay_fee_pct = deposit.slow_relay_fee_pct,
                instant_relay_fee_pct = deposit.instant_relay_fee_pct,
                "Fee percentages exceed 100%, pricing is inconsistent"
            );
            U256::ZERO
        }
    };

    RelayTokenRequirement { slow, instant }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::types::test_fixtures::*;

    #[test]
    fn test_requirement_matches_worked_example() {
        // 1000 tokens, 1% slow fee, 0.5% instant fee, 2% LP fee, 5% bond
        let deposit = deposit_event(1).into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, 2 * ONE_PCT);

        assert_eq!(requirement.slow, U256::from(50u64));
        assert_eq!(requirement.instant, U256::from(965u64));
        assert_eq!(requirement.combined(), U256::from(1015u64));
    }

    #[test]
    fn test_zero_fees_require_full_amount() {
        let mut event = deposit_event(1);
        event.slow_relay_fee_pct = 0;
        event.instant_relay_fee_pct = 0;
        let requirement = relay_token_requirement(&event.into_deposit(), 0, 0);

        assert_eq!(requirement.slow, U256::ZERO);
        assert_eq!(requirement.instant, U256::from(1000u64));
    }

    #[test]
    fn test_fees_above_one_floor_instant_at_zero() {
        let deposit = deposit_event(1).into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, FIXED_POINT);

        assert_eq!(requirement.instant, U256::ZERO);
        assert_eq!(requirement.slow, U256::from(50u64));
    }

    #[test]
    fn test_apply_pct_rounds_down() {
        assert_eq!(apply_pct(U256::from(999u64), ONE_PCT), U256::from(9u64));
        assert_eq!(apply_pct(U256::from(1000u64), FIXED_POINT), U256::from(1000u64));
    }

    #[test]
    fn test_apply_pct_on_overflowing_amount() {
        // MAX * 50% overflows the product but not the result
        assert_eq!(apply_pct(U256::MAX, FIXED_POINT / 2), U256::MAX / U256::from(2u64));
        assert_eq!(apply_pct(U256::MAX, FIXED_POINT), U256::MAX);
        assert_eq!(apply_pct(U256::MAX, 2 * FIXED_POINT), U256::MAX);
    }
}
