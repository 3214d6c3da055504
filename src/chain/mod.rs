//! Chain module - the network RPC capability and its HTTP implementation
//!
//! Everything downstream of here talks to the chain through the [`Rpc`]
//! trait, so the engine can be wired against a scripted stub in tests and
//! against [`ChainProvider`] in production.

pub mod provider;

#[cfg(test)]
pub mod stub;

pub use provider::ChainProvider;

use crate::error::EngineResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

/// Capability interface over the JSON-RPC node
#[async_trait]
pub trait Rpc: Send + Sync {
    /// Current suggested gas price (`eth_gasPrice`)
    async fn gas_price(&self) -> EngineResult<U256>;

    /// Latest confirmed transaction count for an account
    async fn transaction_count(&self, address: Address) -> EngineResult<u64>;

    /// Submit a signed, RLP-encoded transaction; returns its hash
    async fn send_raw_transaction(&self, raw: Bytes) -> EngineResult<H256>;

    /// Receipt for a transaction, or `None` while it is still pending
    async fn transaction_receipt(&self, hash: H256)
        -> EngineResult<Option<TransactionReceipt>>;

    /// Native currency balance of an account
    async fn balance(&self, address: Address) -> EngineResult<U256>;

    /// Read-only contract call (`eth_call` against latest)
    async fn call(&self, to: Address, data: Bytes) -> EngineResult<Bytes>;
}
