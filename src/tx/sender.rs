//! Transaction broadcast with synchronous-rejection classification

use super::builder::SignedTransaction;
use crate::chain::Rpc;
use crate::error::{EngineError, EngineResult};

use ethers::types::H256;
use tracing::{info, warn};

/// Node error fragments that mean the transaction itself was refused and
/// resubmitting the same bytes cannot succeed
const REJECTION_PHRASES: &[&str] = &[
    "insufficient funds",
    "nonce too low",
    "replacement transaction underpriced",
    "transaction underpriced",
    "already known",
    "invalid transaction",
    "exceeds block gas limit",
];

/// Submits signed transactions to the network
pub struct Broadcaster;

impl Broadcaster {
    pub fn new() -> Self {
        Self
    }

    /// Perform exactly one submission attempt
    ///
    /// A synchronous refusal from the node becomes [`EngineError::Rejected`];
    /// transport failures stay [`EngineError::Network`]. A later on-chain
    /// revert is not visible here, only via the receipt.
    pub async fn send(&self, rpc: &dyn Rpc, signed: &SignedTransaction) -> EngineResult<H256> {
        match rpc.send_raw_transaction(signed.raw.clone()).await {
            Ok(tx_hash) => {
                info!("Transaction sent: {:?}", tx_hash);
                Ok(tx_hash)
            }
            Err(EngineError::Network(message)) if is_rejection(&message) => {
                warn!("Transaction {:?} rejected by node: {}", signed.hash, message);
                Err(EngineError::Rejected(message))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn is_rejection(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    REJECTION_PHRASES.iter().any(|p| message.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stub::{network_error, StubRpc};
    use ethers::types::Bytes;
    use std::sync::atomic::Ordering;

    fn signed() -> SignedTransaction {
        SignedTransaction {
            raw: Bytes::from(vec![0x01, 0x02, 0x03]),
            hash: H256::from([0x11; 32]),
        }
    }

    #[tokio::test]
    async fn successful_send_is_a_single_submission() {
        let rpc = StubRpc::new();
        let expected = H256::from([0x22; 32]);
        rpc.push_send(Ok(expected));

        let hash = Broadcaster::new().send(&rpc, &signed()).await.unwrap();

        assert_eq!(hash, expected);
        assert_eq!(rpc.send_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn node_refusal_becomes_rejected() {
        for phrase in ["insufficient funds for gas * price + value", "Nonce too low"] {
            let rpc = StubRpc::new();
            rpc.push_send(Err(network_error(phrase)));

            let err = Broadcaster::new().send(&rpc, &signed()).await.unwrap_err();
            assert!(matches!(err, EngineError::Rejected(_)), "{}", phrase);
            // No retry after a refusal
            assert_eq!(rpc.send_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn transport_failure_stays_network() {
        let rpc = StubRpc::new();
        rpc.push_send(Err(network_error("connection reset by peer")));

        let err = Broadcaster::new().send(&rpc, &signed()).await.unwrap_err();
        assert!(matches!(err, EngineError::Network(_)));
    }
}
