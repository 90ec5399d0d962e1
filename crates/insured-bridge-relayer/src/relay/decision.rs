// Profit-maximizing choice between slow, speed-up and instant relays
use alloy_primitives::U256;

use super::requirement::{apply_pct, RelayTokenRequirement};
use crate::chains::types::{ClientRelayState, Deposit, RelaySubmitType};

/// Outcome of [`should_relay`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayDecision {
    pub submit_type: RelaySubmitType,
    /// Fees earned by the chosen action, zero for `Ignore`
    pub profit: U256,
}

impl RelayDecision {
    fn ignore() -> Self {
        Self { submit_type: RelaySubmitType::Ignore, profit: U256::ZERO }
    }
}

/// Pick the relay action with the highest profit the balance can fund.
///
/// - Slow: balance covers the bond and nothing has been relayed yet.
/// - SpeedUp: no instant relayer yet, balance covers the instant amount and
///   the relay is not finalized.
/// - Instant: balance covers both and nothing has been relayed yet; earns
///   both fees.
///
/// Instant wins ties since it collects every fee in one transaction. SpeedUp
/// must strictly beat Slow.
pub fn should_relay(
    deposit: &Deposit,
    client_relay_state: ClientRelayState,
    has_instant_relayer: bool,
    balance: U256,
    requirement: &RelayTokenRequirement,
) -> RelayDecision {
    let mut slow_profit = U256::ZERO;
    let mut speed_up_profit = U256::ZERO;
    let mut instant_profit = U256::ZERO;

    if balance >= requirement.slow && client_relay_state == ClientRelayState::Uninitialized {
        slow_profit = apply_pct(deposit.amount, deposit.slow_relay_fee_pct);
    }

    if !has_instant_relayer
        && balance >= requirement.instant
        && client_relay_state != ClientRelayState::Finalized
    {
        speed_up_profit = apply_pct(deposit.amount, deposit.instant_relay_fee_pct);
    }

    if balance >= requirement.combined() && client_relay_state == ClientRelayState::Uninitialized {
        instant_profit = slow_profit + speed_up_profit;
    }

    if !instant_profit.is_zero() && instant_profit >= speed_up_profit && instant_profit >= slow_profit {
        return RelayDecision { submit_type: RelaySubmitType::Instant, profit: instant_profit };
    }
    if speed_up_profit > slow_profit {
        return RelayDecision { submit_type: RelaySubmitType::SpeedUp, profit: speed_up_profit };
    }
    if !slow_profit.is_zero() {
        return RelayDecision { submit_type: RelaySubmitType::Slow, profit: slow_profit };
    }
    RelayDecision::ignore()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::types::test_fixtures::*;
    use crate::relay::requirement::relay_token_requirement;

    fn decide(state: ClientRelayState, has_instant_relayer: bool, balance: u64) -> RelayDecision {
        let deposit = deposit_event(1).into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, 2 * ONE_PCT);
        should_relay(&deposit, state, has_instant_relayer, U256::from(balance), &requirement)
    }

    #[test]
    fn test_balance_below_combined_requirement_slow_relays() {
        let decision = decide(ClientRelayState::Uninitialized, false, 1000);
        assert_eq!(decision.submit_type, RelaySubmitType::Slow);
        assert_eq!(decision.profit, U256::from(10u64));
    }

    #[test]
    fn test_balance_above_combined_requirement_instant_relays() {
        let decision = decide(ClientRelayState::Uninitialized, false, 1100);
        assert_eq!(decision.submit_type, RelaySubmitType::Instant);
        assert_eq!(decision.profit, U256::from(15u64));
    }

    #[test]
    fn test_pending_relay_is_sped_up() {
        let decision = decide(ClientRelayState::Pending, false, 1000);
        assert_eq!(decision.submit_type, RelaySubmitType::SpeedUp);
        assert_eq!(decision.profit, U256::from(5u64));
    }

    #[test]
    fn test_pending_relay_with_instant_relayer_is_ignored() {
        let decision = decide(ClientRelayState::Pending, true, 10_000);
        assert_eq!(decision.submit_type, RelaySubmitType::Ignore);
        assert_eq!(decision.profit, U256::ZERO);
    }

    #[test]
    fn test_finalized_relay_is_ignored() {
        let decision = decide(ClientRelayState::Finalized, false, 10_000);
        assert_eq!(decision.submit_type, RelaySubmitType::Ignore);
    }

    #[test]
    fn test_insufficient_balance_is_ignored() {
        let decision = decide(ClientRelayState::Uninitialized, false, 49);
        assert_eq!(decision.submit_type, RelaySubmitType::Ignore);
    }

    #[test]
    fn test_instant_dominates_whenever_affordable() {
        for balance in [1015u64, 2000, 1_000_000] {
            let decision = decide(ClientRelayState::Uninitialized, false, balance);
            assert_eq!(decision.submit_type, RelaySubmitType::Instant, "balance {}", balance);
        }
    }

    #[test]
    fn test_instant_wins_tie_with_speed_up() {
        // No slow fee: instant profit equals speed-up profit
        let mut event = deposit_event(1);
        event.slow_relay_fee_pct = 0;
        let deposit = event.into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, 2 * ONE_PCT);

        let decision = should_relay(
            &deposit,
            ClientRelayState::Uninitialized,
            false,
            U256::from(2000u64),
            &requirement,
        );
        assert_eq!(decision.submit_type, RelaySubmitType::Instant);
        assert_eq!(decision.profit, U256::from(5u64));
    }

    #[test]
    fn test_equal_slow_and_speed_up_profit_favors_slow() {
        // Equal fees, balance covers each requirement but not both
        let mut event = deposit_event(1);
        event.slow_relay_fee_pct = ONE_PCT;
        event.instant_relay_fee_pct = ONE_PCT;
        let deposit = event.into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, 2 * ONE_PCT);
        assert!(U256::from(1000u64) < requirement.combined());

        let decision = should_relay(
            &deposit,
            ClientRelayState::Uninitialized,
            false,
            U256::from(1000u64),
            &requirement,
        );
        assert_eq!(decision.submit_type, RelaySubmitType::Slow);
        assert_eq!(decision.profit, U256::from(10u64));
    }

    #[test]
    fn test_chosen_action_never_exceeds_balance() {
        let deposit = deposit_event(1).into_deposit();
        let requirement = relay_token_requirement(&deposit, 5 * ONE_PCT, 2 * ONE_PCT);
        let states = [
            ClientRelayState::Uninitialized,
            ClientRelayState::Pending,
            ClientRelayState::Finalized,
        ];

        for balance in (0u64..=1100).step_by(25) {
            for state in states {
                for has_instant_relayer in [false, true] {
                    let balance = U256::from(balance);
                    let decision =
                        should_relay(&deposit, state, has_instant_relayer, balance, &requirement);
                    let needed = match decision.submit_type {
                        RelaySubmitType::Slow => requirement.slow,
                        RelaySubmitType::SpeedUp => requirement.instant,
                        RelaySubmitType::Instant => requirement.combined(),
                        RelaySubmitType::Ignore => U256::ZERO,
                    };
                    assert!(needed <= balance, "{:?} needs {} > {}", decision, needed, balance);
                }
            }
        }
    }
}
