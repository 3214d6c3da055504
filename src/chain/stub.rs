//! Scripted in-memory [`Rpc`] implementation for tests
//!
//! Responses are queued per method; when a queue is empty the stub falls
//! back to a benign default (a stable gas price, no receipt yet, a hash
//! derived from the submitted bytes).

use crate::chain::Rpc;
use crate::error::{EngineError, EngineResult};

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256, U64};
use ethers::utils::keccak256;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct StubRpc {
    gas_prices: Mutex<VecDeque<EngineResult<U256>>>,
    default_gas_price: U256,
    nonce: Mutex<u64>,
    nonce_errors: Mutex<VecDeque<EngineError>>,
    send_results: Mutex<VecDeque<EngineResult<H256>>>,
    receipt_results: Mutex<VecDeque<EngineResult<Option<TransactionReceipt>>>>,
    balance: U256,
    call_result: Mutex<Bytes>,

    pub gas_price_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub receipt_calls: AtomicUsize,
}

impl StubRpc {
    pub fn new() -> Self {
        Self {
            gas_prices: Mutex::new(VecDeque::new()),
            default_gas_price: U256::from(2_000_000_000u64), // 2 gwei
            nonce: Mutex::new(0),
            nonce_errors: Mutex::new(VecDeque::new()),
            send_results: Mutex::new(VecDeque::new()),
            receipt_results: Mutex::new(VecDeque::new()),
            balance: U256::zero(),
            call_result: Mutex::new(Bytes::new()),
            gas_price_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            receipt_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_nonce(&self, nonce: u64) {
        *self.nonce.lock().unwrap() = nonce;
    }

    pub fn push_nonce_error(&self, error: EngineError) {
        self.nonce_errors.lock().unwrap().push_back(error);
    }

    pub fn push_gas_price(&self, result: EngineResult<U256>) {
        self.gas_prices.lock().unwrap().push_back(result);
    }

    pub fn push_send(&self, result: EngineResult<H256>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn push_receipt(&self, result: EngineResult<Option<TransactionReceipt>>) {
        self.receipt_results.lock().unwrap().push_back(result);
    }

    pub fn set_call_result(&self, data: Bytes) {
        *self.call_result.lock().unwrap() = data;
    }
}

impl Default for StubRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rpc for StubRpc {
    async fn gas_price(&self) -> EngineResult<U256> {
        self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        match self.gas_prices.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.default_gas_price),
        }
    }

    async fn transaction_count(&self, _address: Address) -> EngineResult<u64> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.nonce_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(*self.nonce.lock().unwrap())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EngineResult<H256> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        match self.send_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(H256::from(keccak256(&raw))),
        }
    }

    async fn transaction_receipt(
        &self,
        _hash: H256,
    ) -> EngineResult<Option<TransactionReceipt>> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        match self.receipt_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(None),
        }
    }

    async fn balance(&self, _address: Address) -> EngineResult<U256> {
        Ok(self.balance)
    }

    async fn call(&self, _to: Address, _data: Bytes) -> EngineResult<Bytes> {
        Ok(self.call_result.lock().unwrap().clone())
    }
}

/// Receipt with success status for a given transaction hash
pub fn success_receipt(hash: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(U64::from(1)),
        ..Default::default()
    }
}

/// Receipt for a transaction that was mined but reverted
pub fn reverted_receipt(hash: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(U64::from(0)),
        ..Default::default()
    }
}

/// Shorthand for a transient transport failure
pub fn network_error(message: &str) -> EngineError {
    EngineError::Network(message.to_string())
}
