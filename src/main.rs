//! aave-depositor - ERC-20 approval + Aave v3 pool deposit workflow
//!
//! Submits the two dependent transactions (approve the pool's allowance,
//! then deposit into the pool) and waits for each to confirm on chain
//! before moving on.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

mod chain;
mod config;
mod contracts;
mod error;
mod tx;
mod workflow;

use chain::ChainProvider;
use config::Settings;
use tx::TxSigner;
use workflow::{DepositWorkflow, WorkflowState};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting aave-depositor v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Configured for chain {} with {} RPC endpoint(s)",
        settings.network.chain_id,
        settings.network.rpc_urls.len()
    );

    let provider = Arc::new(ChainProvider::new(settings.network.clone())?);
    let signer = TxSigner::from_env(&settings.wallet.private_key_env, settings.network.chain_id)?;
    info!("Signing account: {:?}", signer.address());

    let workflow = DepositWorkflow::new(provider, signer, &settings)?;

    // Balance display is a debugging aid, not a precondition
    if let Err(e) = workflow.log_balances().await {
        warn!("Could not fetch balances: {}", e);
    }

    let result = workflow.run().await;

    for outcome in &result.steps {
        if outcome.is_success() {
            info!("{}: confirmed, tx {:?}", outcome.step, outcome.tx_hash);
        } else {
            error!(
                "{}: {} (tx {:?})",
                outcome.step,
                outcome.failure.as_deref().unwrap_or("failed"),
                outcome.tx_hash
            );
        }
    }

    if result.succeeded() {
        info!("Deposit workflow complete");
        return Ok(());
    }

    match result.state {
        WorkflowState::Failed(reason) => anyhow::bail!("Workflow failed: {}", reason),
        other => anyhow::bail!("Workflow ended in unexpected state: {:?}", other),
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aave_depositor=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
