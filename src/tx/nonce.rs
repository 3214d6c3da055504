//! Nonce management for reliable transaction submission
//!
//! The account's sequence state has a single authoritative owner: a local
//! counter seeded once from the chain and bumped on every reservation.
//! Fetching the count fresh per transaction would let two concurrent
//! submissions observe the same value and collide; serializing
//! reservations through one mutex-guarded counter closes that race.

use crate::chain::Rpc;
use crate::error::{EngineError, EngineResult};

use ethers::types::Address;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Authoritative nonce counter for one account
pub struct NonceManager {
    /// Account whose sequence this manager owns
    address: Address,
    /// Next nonce to hand out; `None` until seeded from the chain
    next: Mutex<Option<u64>>,
}

impl NonceManager {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            next: Mutex::new(None),
        }
    }

    /// Reserve the next nonce, seeding from the chain on first use
    pub async fn reserve(&self, rpc: &dyn Rpc) -> EngineResult<u64> {
        let mut next = self.next.lock().await;

        let nonce = match *next {
            Some(value) => value,
            None => {
                let on_chain = rpc.transaction_count(self.address).await?;
                debug!("Seeded nonce for {:?} from chain: {}", self.address, on_chain);
                on_chain
            }
        };

        *next = Some(nonce + 1);
        debug!("Reserved nonce {} for {:?}", nonce, self.address);
        Ok(nonce)
    }

    /// Return a nonce that never reached the chain (broadcast failed)
    ///
    /// Only the most recent reservation can be rolled back; anything older
    /// has been followed by later reservations and must not be reused.
    pub async fn release(&self, nonce: u64) -> EngineResult<()> {
        let mut next = self.next.lock().await;

        match *next {
            Some(value) if value == nonce + 1 => {
                *next = Some(nonce);
                debug!("Released nonce {} for {:?}", nonce, self.address);
                Ok(())
            }
            Some(_) => {
                warn!(
                    "Nonce {} for {:?} is not the latest reservation, not released",
                    nonce, self.address
                );
                Ok(())
            }
            None => Err(EngineError::Nonce(
                "Release before any reservation".to_string(),
            )),
        }
    }

    /// Re-seed the counter from the chain (recovery after a collision)
    pub async fn sync(&self, rpc: &dyn Rpc) -> EngineResult<()> {
        let on_chain = rpc.transaction_count(self.address).await?;
        let mut next = self.next.lock().await;

        if let Some(local) = *next {
            if on_chain > local {
                warn!(
                    "Nonce gap for {:?}: local {} behind chain {}",
                    self.address, local, on_chain
                );
            }
        }

        *next = Some(on_chain);
        Ok(())
    }
}
