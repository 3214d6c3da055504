//! Error types for the deposit engine

use ethers::types::H256;
use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction rejected by node: {0}")]
    Rejected(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Nonce error: {0}")]
    Nonce(String),

    #[error("No receipt after {attempts} attempts: {last_error}")]
    ConfirmationTimeout { attempts: u32, last_error: String },

    #[error("Transaction {tx_hash:?} was mined but reverted")]
    OnChainFailure { tx_hash: H256 },
}

impl EngineError {
    /// Check if error is retryable
    ///
    /// `Rejected` requires rebuilding the transaction, `Signing` is a
    /// configuration problem, and `OnChainFailure` is a final on-chain
    /// outcome; none of those can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Network(_) | EngineError::ConfirmationTimeout { .. }
        )
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
