// Bridge pool and multicall ABI bindings plus call construction
use alloy_primitives::utils::UnitsError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::chains::{BridgePoolInfo, CallKind, Deposit, PreparedCall, Relay};
use crate::utils::{format_fixed, format_pct};

sol! {
    /// Deposit parameters as hashed and stored by the bridge pool
    #[derive(Debug, PartialEq, Eq)]
    struct DepositData {
        uint256 chainId;
        uint64 depositId;
        address l1Recipient;
        address l2Sender;
        uint256 amount;
        uint64 slowRelayFeePct;
        uint64 instantRelayFeePct;
        uint32 quoteTimestamp;
    }

    /// Relay parameters as stored by the bridge pool
    #[derive(Debug, PartialEq, Eq)]
    struct RelayData {
        uint8 relayState;
        address slowRelayer;
        uint32 relayId;
        uint64 realizedLpFeePct;
        uint32 priceRequestTime;
        uint256 proposerBond;
        uint256 finalFee;
    }

    interface IBridgePool {
        function relayDeposit(DepositData depositData, uint64 realizedLpFeePct) external;
        function relayAndSpeedUp(DepositData depositData, uint64 realizedLpFeePct) external;
        function speedUpRelay(DepositData depositData, RelayData relayData) external;
        function disputeRelay(DepositData depositData, RelayData relayData) external;
        function settleRelay(DepositData depositData, RelayData relayData) external;
    }

    interface IMultiCaller {
        function multicall(bytes[] data) external returns (bytes[] results);
    }
}

impl From<&Deposit> for DepositData {
    fn from(deposit: &Deposit) -> Self {
        Self {
            chainId: U256::from(deposit.chain_id),
            depositId: deposit.deposit_id,
            l1Recipient: deposit.l1_recipient,
            l2Sender: deposit.l2_sender,
            amount: deposit.amount,
            slowRelayFeePct: deposit.slow_relay_fee_pct,
            instantRelayFeePct: deposit.instant_relay_fee_pct,
            quoteTimestamp: deposit.quote_timestamp,
        }
    }
}

impl From<&Relay> for RelayData {
    fn from(relay: &Relay) -> Self {
        Self {
            relayState: relay.relay_state.as_u8(),
            slowRelayer: relay.slow_relayer,
            relayId: relay.relay_id,
            realizedLpFeePct: relay.realized_lp_fee_pct,
            priceRequestTime: relay.price_request_time,
            proposerBond: relay.proposer_bond,
            finalFee: relay.final_fee,
        }
    }
}

fn describe_relay(pool: &BridgePoolInfo, deposit: &Deposit, realized_lp_fee_pct: u64) -> Result<String, UnitsError> {
    Ok(format!(
        "Relayed deposit ID {} of size {} {} from {} to {}. slowRelayFeePct: {}, instantRelayFeePct: {}, realizedLpFeePct: {}.",
        deposit.deposit_id,
        format_fixed(deposit.amount, pool.collateral_decimals, 4)?,
        pool.collateral_symbol,
        deposit.l2_sender,
        deposit.l1_recipient,
        format_pct(deposit.slow_relay_fee_pct)?,
        format_pct(deposit.instant_relay_fee_pct)?,
        format_pct(realized_lp_fee_pct)?,
    ))
}

pub fn slow_relay_call(
    pool: &BridgePoolInfo,
    deposit: &Deposit,
    realized_lp_fee_pct: u64,
) -> Result<PreparedCall, UnitsError> {
    let call = IBridgePool::relayDepositCall {
        depositData: deposit.into(),
        realizedLpFeePct: realized_lp_fee_pct,
    };
    Ok(PreparedCall {
        kind: CallKind::SlowRelay,
        target: pool.address,
        calldata: Bytes::from(call.abi_encode()),
        message: "Slow Relay executed 🐌".to_string(),
        description: describe_relay(pool, deposit, realized_lp_fee_pct)?,
    })
}

pub fn speed_up_call(pool: &BridgePoolInfo, deposit: &Deposit, relay: &Relay) -> Result<PreparedCall, UnitsError> {
    let call = IBridgePool::speedUpRelayCall { depositData: deposit.into(), relayData: relay.into() };
    Ok(PreparedCall {
        kind: CallKind::SpeedUp,
        target: pool.address,
        calldata: Bytes::from(call.abi_encode()),
        message: "Slow relay sped up 🏇".to_string(),
        description: describe_relay(pool, deposit, relay.realized_lp_fee_pct)?,
    })
}

pub fn instant_relay_call(
    pool: &BridgePoolInfo,
    deposit: &Deposit,
    realized_lp_fee_pct: u64,
) -> Result<PreparedCall, UnitsError> {
    let call = IBridgePool::relayAndSpeedUpCall {
        depositData: deposit.into(),
        realizedLpFeePct: realized_lp_fee_pct,
    };
    Ok(PreparedCall {
        kind: CallKind::InstantRelay,
        target: pool.address,
        calldata: Bytes::from(call.abi_encode()),
        message: "Relay instantly sent 🚀".to_string(),
        description: describe_relay(pool, deposit, realized_lp_fee_pct)?,
    })
}

pub fn dispute_call(pool: &BridgePoolInfo, deposit: &Deposit, relay: &Relay, reason: &str) -> PreparedCall {
    let call = IBridgePool::disputeRelayCall { depositData: deposit.into(), relayData: relay.into() };
    PreparedCall {
        kind: CallKind::Dispute,
        target: pool.address,
        calldata: Bytes::from(call.abi_encode()),
        message: "Disputed pending relay. Relay was deleted. 🚓".to_string(),
        description: format!(
            "Disputed relay {} of deposit ID {} ({}) by slow relayer {}: {}.",
            relay.relay_id, deposit.deposit_id, deposit.deposit_hash, relay.slow_relayer, reason
        ),
    }
}

pub fn settle_call(
    pool: &BridgePoolInfo,
    deposit: &Deposit,
    relay: &Relay,
    instant_relayer: Option<Address>,
) -> Result<PreparedCall, UnitsError> {
    let call = IBridgePool::settleRelayCall { depositData: deposit.into(), relayData: relay.into() };
    let instant_relayer = instant_relayer.map(|relayer| relayer.to_string()).unwrap_or_default();
    Ok(PreparedCall {
        kind: CallKind::Settle,
        target: pool.address,
        calldata: Bytes::from(call.abi_encode()),
        message: "Relay settled 💸".to_string(),
        description: format!(
            "Settled deposit ID {} of size {} {} from {} to {}. slowRelayer: {} instantRelayer: {}.",
            deposit.deposit_id,
            format_fixed(deposit.amount, pool.collateral_decimals, 4)?,
            pool.collateral_symbol,
            deposit.l2_sender,
            deposit.l1_recipient,
            relay.slow_relayer,
            instant_relayer,
        ),
    })
}

/// Wrap calls sharing a target into a single `multicall` on that target.
/// The caller guarantees `calls` is non-empty and homogeneous.
pub fn multicall(target: Address, calls: &[PreparedCall]) -> PreparedCall {
    let call = IMultiCaller::multicallCall {
        data: calls.iter().map(|call| call.calldata.clone()).collect(),
    };

    let mut description = String::from("Transactions sent in batch:\n");
    for call in calls {
        description.push_str(&format!("  • {}:\n      ◦ {}\n", call.message, call.description));
    }

    PreparedCall {
        kind: CallKind::Multicall,
        target,
        calldata: Bytes::from(call.abi_encode()),
        message: "Multicall Transaction batch sent!🧙".to_string(),
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::types::test_fixtures::*;

    fn pool() -> BridgePoolInfo {
        BridgePoolInfo {
            address: DEPOSIT_BOX,
            collateral_symbol: "WETH".to_string(),
            collateral_decimals: 0,
        }
    }

    #[test]
    fn test_relay_calls_use_expected_selectors() {
        let deposit = deposit_event(1).into_deposit();
        let relay = relay_for(&deposit, 2 * ONE_PCT);

        let slow = slow_relay_call(&pool(), &deposit, 2 * ONE_PCT).unwrap();
        assert_eq!(slow.calldata[..4], IBridgePool::relayDepositCall::SELECTOR);
        assert_eq!(slow.target, DEPOSIT_BOX);

        let instant = instant_relay_call(&pool(), &deposit, 2 * ONE_PCT).unwrap();
        assert_eq!(instant.calldata[..4], IBridgePool::relayAndSpeedUpCall::SELECTOR);

        let speed_up = speed_up_call(&pool(), &deposit, &relay).unwrap();
        assert_eq!(speed_up.calldata[..4], IBridgePool::speedUpRelayCall::SELECTOR);

        let dispute = dispute_call(&pool(), &deposit, &relay, "bad fee");
        assert_eq!(dispute.calldata[..4], IBridgePool::disputeRelayCall::SELECTOR);
        assert!(dispute.description.contains("bad fee"));

        let settle = settle_call(&pool(), &deposit, &relay, None).unwrap();
        assert_eq!(settle.calldata[..4], IBridgePool::settleRelayCall::SELECTOR);
    }

    #[test]
    fn test_relay_description_is_human_readable() {
        let deposit = deposit_event(4).into_deposit();
        let call = slow_relay_call(&pool(), &deposit, 2 * ONE_PCT).unwrap();
        assert!(call.description.starts_with("Relayed deposit ID 4 of size 1,000 WETH"));
        assert!(call.description.contains("slowRelayFeePct: 1.00%"));
        assert!(call.description.contains("instantRelayFeePct: 0.50%"));
        assert!(call.description.contains("realizedLpFeePct: 2.00%"));
    }

    #[test]
    fn test_invalid_pool_decimals_fail_the_call() {
        let mut pool = pool();
        pool.collateral_decimals = 80;
        let deposit = deposit_event(1).into_deposit();
        let relay = relay_for(&deposit, 2 * ONE_PCT);

        assert!(matches!(slow_relay_call(&pool, &deposit, ONE_PCT), Err(UnitsError::InvalidUnit(_))));
        assert!(settle_call(&pool, &deposit, &relay, None).is_err());
    }

    #[test]
    fn test_multicall_wraps_each_calldata() {
        let first = slow_relay_call(&pool(), &deposit_event(1).into_deposit(), ONE_PCT).unwrap();
        let second = slow_relay_call(&pool(), &deposit_event(2).into_deposit(), ONE_PCT).unwrap();

        let batch = multicall(DEPOSIT_BOX, &[first.clone(), second.clone()]);
        assert_eq!(batch.kind, CallKind::Multicall);

        let decoded = IMultiCaller::multicallCall::abi_decode(&batch.calldata).unwrap();
        assert_eq!(decoded.data, vec![first.calldata, second.calldata]);
        assert!(batch.description.contains("Slow Relay executed"));
    }
}
