// Canonical bridge adapters
//
// Each L2 stack has its own way of proving an L2 -> L1 message. Adapters hide
// that behind a single capability: build the L1 call that finalizes a given
// L2 transaction's message, or report that it is not ready yet.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;

use super::{CallKind, PreparedCall};
use crate::error::GatewayError;

sol! {
    interface ICrossDomainMessenger {
        function finalizeMessage(bytes32 l2TransactionHash) external;
    }
}

#[async_trait]
pub trait CanonicalBridgeAdapter: Send + Sync {
    /// Name of the L2 stack, used in logs
    fn name(&self) -> &str;

    /// Finalization call for the message sent by `l2_transaction_hash`.
    ///
    /// Returns `Ok(None)` while the message is still inside its challenge
    /// period or otherwise not yet relayable.
    async fn construct_finalization_transaction(
        &self,
        l2_transaction_hash: B256,
    ) -> Result<Option<PreparedCall>, GatewayError>;
}

/// L1 messenger call finalizing the message sent by `l2_transaction_hash`
pub fn finalization_call(messenger: Address, l2_transaction_hash: B256) -> PreparedCall {
    let call = ICrossDomainMessenger::finalizeMessageCall { l2TransactionHash: l2_transaction_hash };
    PreparedCall {
        kind: CallKind::Finalization,
        target: messenger,
        calldata: Bytes::from(call.abi_encode()),
        message: "Canonical bridge message finalized 🪃".to_string(),
        description: format!("Finalized L2 -> L1 message sent by L2 transaction {}", l2_transaction_hash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalization_call_encodes_message_hash() {
        let hash = B256::repeat_byte(7);
        let call = finalization_call(Address::repeat_byte(1), hash);

        assert_eq!(call.kind, CallKind::Finalization);
        assert_eq!(call.calldata[..4], ICrossDomainMessenger::finalizeMessageCall::SELECTOR);
        assert_eq!(call.calldata[4..], hash[..]);
    }
}
