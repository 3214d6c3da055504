//! Gas pricing with a safety premium

use crate::chain::Rpc;
use crate::error::EngineResult;

use ethers::types::U256;
use tracing::debug;

/// Prices transactions above the node's suggestion to reduce the chance of
/// silent non-inclusion from underpricing
pub struct GasEstimator {
    /// Premium percentage on top of the suggested price (20 = +20%)
    price_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new(price_buffer_percent: u64) -> Self {
        Self {
            price_buffer_percent,
        }
    }

    /// Fetch the current suggested gas price and apply the premium
    ///
    /// Never substitutes a stale or default value: a failed query surfaces
    /// to the caller.
    pub async fn estimate(&self, rpc: &dyn Rpc) -> EngineResult<U256> {
        let base = rpc.gas_price().await?;
        let buffered = base + base * self.price_buffer_percent / 100;

        debug!("Gas price: base {} -> buffered {}", base, buffered);
        Ok(buffered)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stub::{network_error, StubRpc};
    use crate::error::EngineError;

    #[tokio::test]
    async fn premium_stays_within_bounds() {
        let estimator = GasEstimator::default();

        for base in [1u64, 3, 999, 1_000_000_007, 20_000_000_000] {
            let rpc = StubRpc::new();
            rpc.push_gas_price(Ok(U256::from(base)));

            let price = estimator.estimate(&rpc).await.unwrap();
            let base = U256::from(base);

            assert!(price >= base);
            // 1.21x upper bound from the spec'd rounding tolerance
            assert!(price * 100 <= base * 121);
        }
    }

    #[tokio::test]
    async fn repeated_estimates_are_stable() {
        let estimator = GasEstimator::default();
        let rpc = StubRpc::new();

        // Stub serves its fixed default price when nothing is queued
        let first = estimator.estimate(&rpc).await.unwrap();
        let second = estimator.estimate(&rpc).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(rpc.gas_price_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_failure_surfaces() {
        let estimator = GasEstimator::default();
        let rpc = StubRpc::new();
        rpc.push_gas_price(Err(network_error("rpc unreachable")));

        let err = estimator.estimate(&rpc).await.unwrap_err();
        assert!(matches!(err, EngineError::Network(_)));
    }
}
