//! HTTP chain provider with multi-RPC support and automatic failover

use crate::chain::Rpc;
use crate::config::NetworkConfig;
use crate::error::{EngineError, EngineResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Multi-provider wrapper with automatic failover on read paths
///
/// Transaction submission deliberately does not fail over: resubmitting the
/// same raw bytes to another node is harmless, but a second node may answer
/// "already known" and the caller would misclassify the outcome. One
/// submission attempt per call keeps that surface unambiguous.
pub struct ChainProvider {
    /// Chain configuration
    config: NetworkConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: NetworkConfig) -> EngineResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(EngineError::Network(
                "No valid RPC providers configured".to_string(),
            ));
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!(
            "Chain {} failover to provider {}",
            self.config.chain_id, next
        );
    }

    /// Run a read-only query, rotating through providers on failure
    async fn with_failover<T, F, Fut>(&self, what: &str, op: F) -> EngineResult<T>
    where
        F: Fn(Provider<Http>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            match op(self.http().clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} failed on chain {}: {}",
                        what, self.config.chain_id, e
                    );
                    last_error = Some(e);
                    self.failover();
                }
            }
        }

        Err(EngineError::Network(format!(
            "All providers failed for {}: {}",
            what,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[async_trait]
impl Rpc for ChainProvider {
    async fn gas_price(&self) -> EngineResult<U256> {
        self.with_failover("gas price query", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn transaction_count(&self, address: Address) -> EngineResult<u64> {
        let count = self
            .with_failover("transaction count query", move |p| async move {
                p.get_transaction_count(address, Some(BlockNumber::Latest.into()))
                    .await
            })
            .await?;
        Ok(count.as_u64())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EngineResult<H256> {
        // Single submission attempt, no failover: see struct docs
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> EngineResult<Option<TransactionReceipt>> {
        self.with_failover("receipt query", move |p| async move {
            p.get_transaction_receipt(hash).await
        })
        .await
    }

    async fn balance(&self, address: Address) -> EngineResult<U256> {
        self.with_failover("balance query", move |p| async move {
            p.get_balance(address, None).await
        })
        .await
    }

    async fn call(&self, to: Address, data: Bytes) -> EngineResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.with_failover("contract call", move |p| {
            let tx = tx.clone();
            async move { p.call(&tx, None).await }
        })
        .await
    }
}
