//! Configuration management for the deposit engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub contracts: ContractsConfig,
    pub gas: GasConfig,
    pub confirmation: ConfirmationConfig,
    pub deposit: DepositConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    /// ERC-20 token to deposit (USDC on Sepolia in the default config)
    pub token: String,
    /// Aave v3 pool that pulls the approved tokens
    pub pool: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    /// Premium applied on top of the node's suggested gas price
    pub price_buffer_percent: u64,
    pub approve_gas_limit: u64,
    pub deposit_gas_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    pub retry_delay_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositConfig {
    /// Amount in token base units, decimal string
    pub amount: String,
    pub token_decimals: u32,
    pub referral_code: u16,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("DEPOSITOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings = toml::from_str(&config_str)
            .with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_urls.is_empty() {
            anyhow::bail!("At least one RPC URL must be configured");
        }
        if self.gas.approve_gas_limit == 0 || self.gas.deposit_gas_limit == 0 {
            anyhow::bail!("Gas limits must be non-zero");
        }
        if self.confirmation.max_attempts == 0 {
            anyhow::bail!("confirmation.max_attempts must be at least 1");
        }

        // Fail fast on values that would otherwise only break mid-workflow
        self.token_address()
            .with_context(|| "Invalid token contract address")?;
        self.pool_address()
            .with_context(|| "Invalid pool contract address")?;
        self.deposit_amount()
            .with_context(|| "Invalid deposit amount")?;

        Ok(())
    }

    pub fn token_address(&self) -> Result<Address> {
        self.contracts
            .token
            .parse()
            .with_context(|| format!("Cannot parse address: {}", self.contracts.token))
    }

    pub fn pool_address(&self) -> Result<Address> {
        self.contracts
            .pool
            .parse()
            .with_context(|| format!("Cannot parse address: {}", self.contracts.pool))
    }

    pub fn deposit_amount(&self) -> Result<U256> {
        U256::from_dec_str(&self.deposit.amount)
            .with_context(|| format!("Cannot parse amount: {}", self.deposit.amount))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation.attempt_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.confirmation.retry_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation.poll_interval_ms)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
