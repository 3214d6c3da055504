//! Bounded-retry receipt polling
//!
//! Fixed inter-attempt delay, not exponential backoff: block production on
//! the target network has a roughly constant cadence, so a constant polling
//! rhythm is the right shape and the delay is just a tunable constant.

use crate::chain::Rpc;
use crate::config::Settings;
use crate::error::{EngineError, EngineResult};

use ethers::types::{TransactionReceipt, H256};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Polls the network for a transaction receipt with bounded retries
pub struct ConfirmationPoller {
    /// Maximum receipt-wait attempts before giving up
    max_attempts: u32,
    /// How long each attempt waits for a receipt to appear
    attempt_timeout: Duration,
    /// Fixed delay between attempts
    retry_delay: Duration,
    /// Cadence of receipt queries within one attempt
    poll_interval: Duration,
}

impl ConfirmationPoller {
    pub fn new(
        max_attempts: u32,
        attempt_timeout: Duration,
        retry_delay: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            max_attempts,
            attempt_timeout,
            retry_delay,
            poll_interval,
        }
    }

    pub fn from_config(settings: &Settings) -> Self {
        Self::new(
            settings.confirmation.max_attempts,
            settings.attempt_timeout(),
            settings.retry_delay(),
            settings.poll_interval(),
        )
    }

    /// Wait until the network reports a final outcome for the transaction
    ///
    /// Returns the receipt whether its status is success or revert; both are
    /// confirmed outcomes and the caller distinguishes them. Runs out of
    /// attempts with [`EngineError::ConfirmationTimeout`] carrying the
    /// attempt count and the last underlying error.
    pub async fn confirm(
        &self,
        rpc: &dyn Rpc,
        tx_hash: H256,
    ) -> EngineResult<TransactionReceipt> {
        let mut last_error = String::from("no receipt");

        for attempt in 1..=self.max_attempts {
            debug!(
                "Receipt attempt {}/{} for tx {:?}",
                attempt, self.max_attempts, tx_hash
            );

            match timeout(self.attempt_timeout, self.poll_until_receipt(rpc, tx_hash)).await {
                Ok(Ok(receipt)) => {
                    info!(
                        "Receipt for {:?} after {} attempt(s), status {:?}",
                        tx_hash, attempt, receipt.status
                    );
                    return Ok(receipt);
                }
                Ok(Err(e)) if e.is_retryable() => {
                    warn!("Attempt {} for {:?} failed: {}", attempt, tx_hash, e);
                    last_error = e.to_string();
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        "Attempt {} for {:?} timed out after {:?}",
                        attempt, tx_hash, self.attempt_timeout
                    );
                    last_error = format!("no receipt within {:?}", self.attempt_timeout);
                }
            }

            if attempt < self.max_attempts {
                sleep(self.retry_delay).await;
            }
        }

        Err(EngineError::ConfirmationTimeout {
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Query for the receipt until it exists or the query itself fails
    async fn poll_until_receipt(
        &self,
        rpc: &dyn Rpc,
        tx_hash: H256,
    ) -> EngineResult<TransactionReceipt> {
        loop {
            if let Some(receipt) = rpc.transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stub::{network_error, reverted_receipt, success_receipt, StubRpc};
    use std::sync::atomic::Ordering;

    fn tx_hash() -> H256 {
        H256::from([0x77; 32])
    }

    fn quick_poller() -> ConfirmationPoller {
        ConfirmationPoller::new(
            3,
            Duration::from_secs(2),
            Duration::from_secs(1),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_then_receipt_on_second_attempt() {
        let rpc = StubRpc::new();
        rpc.push_receipt(Err(network_error("rpc unreachable")));
        rpc.push_receipt(Ok(Some(success_receipt(tx_hash()))));

        let receipt = quick_poller().confirm(&rpc, tx_hash()).await.unwrap();

        assert_eq!(receipt.status, Some(1u64.into()));
        assert_eq!(rpc.receipt_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_receipt_within_one_attempt() {
        let rpc = StubRpc::new();
        rpc.push_receipt(Ok(None));
        rpc.push_receipt(Ok(None));
        rpc.push_receipt(Ok(Some(success_receipt(tx_hash()))));

        let receipt = quick_poller().confirm(&rpc, tx_hash()).await.unwrap();

        assert_eq!(receipt.transaction_hash, tx_hash());
        assert_eq!(rpc.receipt_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_is_still_a_confirmed_outcome() {
        let rpc = StubRpc::new();
        rpc.push_receipt(Ok(Some(reverted_receipt(tx_hash()))));

        // The poller reports what the chain says; status classification is
        // the caller's job
        let receipt = quick_poller().confirm(&rpc, tx_hash()).await.unwrap();
        assert_eq!(receipt.status, Some(0u64.into()));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_carries_attempt_count_and_bounded_time() {
        let poller = quick_poller();
        let rpc = StubRpc::new(); // never produces a receipt

        let started = tokio::time::Instant::now();
        let err = poller.confirm(&rpc, tx_hash()).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            EngineError::ConfirmationTimeout { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {}", other),
        }

        // 3 attempts x 2s timeout + 2 x 1s delay, with slack for the
        // granularity of the inner poll loop
        assert!(elapsed <= Duration::from_secs(9));
    }
}
