//! Transaction assembly and signing

use crate::error::{EngineError, EngineResult};

use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::keccak256;
use tracing::debug;

/// Byte-exact signed encoding plus the hash it will be tracked by
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

/// Assembles legacy (gas-price) transactions for the configured chain
pub struct TxBuilder {
    chain_id: u64,
}

impl TxBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn build(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_limit: U256,
        gas_price: U256,
        nonce: u64,
    ) -> TypedTransaction {
        let tx = TransactionRequest::new()
            .to(to)
            .data(data)
            .value(value)
            .gas(gas_limit)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(self.chain_id);

        TypedTransaction::Legacy(tx)
    }
}

/// Signs transactions with a locally held key
///
/// The key is owned by the wallet and never logged or echoed back; signing
/// is deterministic (RFC 6979) so identical inputs produce identical bytes.
#[derive(Debug)]
pub struct TxSigner {
    wallet: LocalWallet,
}

impl TxSigner {
    /// Build a signer from a hex-encoded private key
    pub fn new(private_key: &str, chain_id: u64) -> EngineResult<Self> {
        let wallet = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| EngineError::Signing(format!("Invalid private key: {}", e)))?
            .with_chain_id(chain_id);

        Ok(Self { wallet })
    }

    /// Build a signer from a key stored in an environment variable
    pub fn from_env(var_name: &str, chain_id: u64) -> EngineResult<Self> {
        let key = std::env::var(var_name).map_err(|_| {
            EngineError::Signing(format!("No private key in environment ({})", var_name))
        })?;
        Self::new(&key, chain_id)
    }

    /// Signing address derived from the key
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Produce the signed, network-ready encoding of a transaction
    pub async fn sign(&self, tx: &TypedTransaction) -> EngineResult<SignedTransaction> {
        let signature = self
            .wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| EngineError::Signing(e.to_string()))?;

        let raw = tx.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        debug!("Signed transaction {:?} ({} bytes)", hash, raw.len());
        Ok(SignedTransaction { raw, hash })
    }
}
