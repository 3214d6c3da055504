//! Two-step approve-then-deposit workflow orchestration
//!
//! Each step only runs once the previous step's receipt shows on-chain
//! success. There is no rollback: a confirmed step is immutable history,
//! and any failure terminates the workflow where it stands.

use crate::chain::Rpc;
use crate::config::Settings;
use crate::contracts::{Erc20, LendingPool};
use crate::error::{EngineError, EngineResult};
use crate::tx::{Broadcaster, ConfirmationPoller, GasEstimator, NonceManager, TxBuilder, TxSigner};

use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use ethers::utils::format_units;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Workflow steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Approve,
    Deposit,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Approve => write!(f, "approve"),
            StepKind::Deposit => write!(f, "deposit"),
        }
    }
}

/// Orchestrator state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    NotStarted,
    ApprovingSubmitted,
    ApprovingConfirmed,
    DepositingSubmitted,
    DepositingConfirmed,
    Failed(String),
}

/// Outcome of a single step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: StepKind,
    pub tx_hash: Option<H256>,
    pub receipt: Option<TransactionReceipt>,
    pub failure: Option<String>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Ordered per-step outcomes; append-only, stops growing at the first
/// step that does not reach confirmed success
#[derive(Debug)]
pub struct WorkflowResult {
    pub steps: Vec<StepOutcome>,
    pub state: WorkflowState,
}

impl WorkflowResult {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            state: WorkflowState::NotStarted,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == WorkflowState::DepositingConfirmed
    }
}

/// A step that did not reach confirmed success, with whatever progress
/// information exists
struct StepFailure {
    tx_hash: Option<H256>,
    receipt: Option<TransactionReceipt>,
    error: EngineError,
}

impl StepFailure {
    /// Failure before the transaction was broadcast
    fn before_broadcast(error: EngineError) -> Self {
        Self {
            tx_hash: None,
            receipt: None,
            error,
        }
    }
}

/// Runs the approve-then-deposit workflow with explicitly injected
/// collaborators
pub struct DepositWorkflow {
    rpc: Arc<dyn Rpc>,
    signer: TxSigner,
    builder: TxBuilder,
    estimator: GasEstimator,
    nonces: NonceManager,
    broadcaster: Broadcaster,
    poller: ConfirmationPoller,
    token: Erc20,
    pool: LendingPool,
    amount: U256,
    token_decimals: u32,
    referral_code: u16,
    approve_gas_limit: U256,
    deposit_gas_limit: U256,
}

impl DepositWorkflow {
    pub fn new(rpc: Arc<dyn Rpc>, signer: TxSigner, settings: &Settings) -> EngineResult<Self> {
        let token = settings
            .token_address()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let pool = settings
            .pool_address()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let amount = settings
            .deposit_amount()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let account = signer.address();

        Ok(Self {
            rpc,
            signer,
            builder: TxBuilder::new(settings.network.chain_id),
            estimator: GasEstimator::new(settings.gas.price_buffer_percent),
            nonces: NonceManager::new(account),
            broadcaster: Broadcaster::new(),
            poller: ConfirmationPoller::from_config(settings),
            token: Erc20::new(token),
            pool: LendingPool::new(pool),
            amount,
            token_decimals: settings.deposit.token_decimals,
            referral_code: settings.deposit.referral_code,
            approve_gas_limit: U256::from(settings.gas.approve_gas_limit),
            deposit_gas_limit: U256::from(settings.gas.deposit_gas_limit),
        })
    }

    /// Override the poller (shorter timings in tests)
    #[cfg(test)]
    pub fn with_poller(mut self, poller: ConfirmationPoller) -> Self {
        self.poller = poller;
        self
    }

    /// Log the account's native and token balances
    pub async fn log_balances(&self) -> EngineResult<()> {
        let account = self.signer.address();

        let native = self.rpc.balance(account).await?;
        info!(
            "ETH balance: {}",
            format_units(native, "ether").unwrap_or_else(|_| native.to_string())
        );

        let raw = self
            .rpc
            .call(self.token.address, self.token.balance_of(account))
            .await?;
        let token_balance = decode_uint(&raw);
        info!(
            "Token balance: {}",
            format_units(token_balance, self.token_decimals)
                .unwrap_or_else(|_| token_balance.to_string())
        );

        Ok(())
    }

    /// Execute the ordered two-step workflow
    pub async fn run(&self) -> WorkflowResult {
        let mut result = WorkflowResult::new();

        info!(
            "Approving pool {:?} to spend {} token units",
            self.pool.address, self.amount
        );
        let approve_call = self.token.approve(self.pool.address, self.amount);
        if !self
            .run_step(
                StepKind::Approve,
                self.token.address,
                approve_call,
                self.approve_gas_limit,
                &mut result,
            )
            .await
        {
            return result;
        }

        info!(
            "Depositing {} units of {:?} into pool {:?}",
            self.amount, self.token.address, self.pool.address
        );
        let deposit_call = self.pool.deposit(
            self.token.address,
            self.amount,
            self.signer.address(),
            self.referral_code,
        );
        self.run_step(
            StepKind::Deposit,
            self.pool.address,
            deposit_call,
            self.deposit_gas_limit,
            &mut result,
        )
        .await;

        result
    }

    /// Run one step end to end, recording its outcome; returns whether the
    /// workflow may continue
    async fn run_step(
        &self,
        step: StepKind,
        target: Address,
        calldata: Bytes,
        gas_limit: U256,
        result: &mut WorkflowResult,
    ) -> bool {
        match self
            .submit_and_confirm(step, target, calldata, gas_limit, result)
            .await
        {
            Ok((tx_hash, receipt)) => {
                info!("Step {} confirmed: {:?}", step, tx_hash);
                result.steps.push(StepOutcome {
                    step,
                    tx_hash: Some(tx_hash),
                    receipt: Some(receipt),
                    failure: None,
                });
                result.state = match step {
                    StepKind::Approve => WorkflowState::ApprovingConfirmed,
                    StepKind::Deposit => WorkflowState::DepositingConfirmed,
                };
                true
            }
            Err(failure) => {
                error!("Step {} failed: {}", step, failure.error);
                let reason = format!("{} step failed: {}", step, failure.error);
                result.steps.push(StepOutcome {
                    step,
                    tx_hash: failure.tx_hash,
                    receipt: failure.receipt,
                    failure: Some(failure.error.to_string()),
                });
                result.state = WorkflowState::Failed(reason);
                false
            }
        }
    }

    /// Price, sequence, build, sign, broadcast, and confirm one transaction
    async fn submit_and_confirm(
        &self,
        step: StepKind,
        target: Address,
        calldata: Bytes,
        gas_limit: U256,
        result: &mut WorkflowResult,
    ) -> Result<(H256, TransactionReceipt), StepFailure> {
        let rpc = self.rpc.as_ref();

        let gas_price = self
            .estimator
            .estimate(rpc)
            .await
            .map_err(StepFailure::before_broadcast)?;

        let nonce = self
            .nonces
            .reserve(rpc)
            .await
            .map_err(StepFailure::before_broadcast)?;
        info!(
            "Using nonce {} for {} (calldata 0x{})",
            nonce,
            step,
            hex::encode(&calldata)
        );

        let tx = self
            .builder
            .build(target, calldata, U256::zero(), gas_limit, gas_price, nonce);

        let signed = match self.signer.sign(&tx).await {
            Ok(signed) => signed,
            Err(e) => {
                // The nonce never left the process
                let _ = self.nonces.release(nonce).await;
                return Err(StepFailure::before_broadcast(e));
            }
        };

        let tx_hash = match self.broadcaster.send(rpc, &signed).await {
            Ok(hash) => hash,
            Err(e) => {
                let stale_sequence = matches!(
                    &e,
                    EngineError::Rejected(msg) if msg.to_ascii_lowercase().contains("nonce")
                );
                if stale_sequence {
                    // Our view of the sequence is behind the chain
                    let _ = self.nonces.sync(rpc).await;
                } else {
                    let _ = self.nonces.release(nonce).await;
                }
                return Err(StepFailure::before_broadcast(e));
            }
        };

        result.state = match step {
            StepKind::Approve => WorkflowState::ApprovingSubmitted,
            StepKind::Deposit => WorkflowState::DepositingSubmitted,
        };

        let receipt = self
            .poller
            .confirm(rpc, tx_hash)
            .await
            .map_err(|e| StepFailure {
                tx_hash: Some(tx_hash),
                receipt: None,
                error: e,
            })?;

        if receipt.status == Some(1u64.into()) {
            Ok((tx_hash, receipt))
        } else {
            Err(StepFailure {
                tx_hash: Some(tx_hash),
                receipt: Some(receipt),
                error: EngineError::OnChainFailure { tx_hash },
            })
        }
    }
}

/// Big-endian uint256 from an `eth_call` return word
fn decode_uint(raw: &[u8]) -> U256 {
    if raw.len() >= 32 {
        U256::from_big_endian(&raw[..32])
    } else {
        U256::from_big_endian(raw)
    }
}
