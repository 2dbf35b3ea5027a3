use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::slippage::{DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS};

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    pub url: String,
    /// Blocks to wait before a receipt counts as confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
}

fn default_confirmations() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chain {
    pub chain_id: u64,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}
fn default_native_decimals() -> u8 {
    18
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    pub router: Address,
    pub factory: Address,
    pub wrapped_native: Address,
    /// Canonical multi-hop intermediary; falls back to `wrapped_native`
    #[serde(default)]
    pub intermediary: Option<Address>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Swap {
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    #[serde(default = "default_deadline_minutes")]
    pub deadline_minutes: u64,
    /// Approve `U256::MAX` instead of the exact required amount
    #[serde(default = "default_false")]
    pub max_approval: bool,
}

fn default_slippage_bps() -> u32 {
    DEFAULT_SLIPPAGE_BPS
}
fn default_deadline_minutes() -> u64 {
    20
}
fn default_false() -> bool {
    false
}

impl Default for Swap {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage_bps(),
            deadline_minutes: default_deadline_minutes(),
            max_approval: default_false(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
}

fn default_max_tokens() -> usize {
    2_000
}
fn default_max_pairs() -> usize {
    1_000
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_pairs: default_max_pairs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: Rpc,
    pub chain: Chain,
    pub contracts: Contracts,
    #[serde(default)]
    pub swap: Swap,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `Config.toml` from the working directory, then applies `SDK_*` overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("Config.toml")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = Config::builder()
            .add_source(File::from(path))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = non_empty_env("SDK_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(addr) = address_env("SDK_CONTRACTS_ROUTER")? {
            self.contracts.router = addr;
        }
        if let Some(addr) = address_env("SDK_CONTRACTS_FACTORY")? {
            self.contracts.factory = addr;
        }
        if let Some(addr) = address_env("SDK_CONTRACTS_WRAPPED_NATIVE")? {
            self.contracts.wrapped_native = addr;
        }
        if let Some(raw) = non_empty_env("SDK_SWAP_DEFAULT_SLIPPAGE_BPS") {
            self.swap.default_slippage_bps = raw.parse().map_err(|e| {
                ConfigError::Message(format!("SDK_SWAP_DEFAULT_SLIPPAGE_BPS: {}", e))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("contracts.router", self.contracts.router),
            ("contracts.factory", self.contracts.factory),
            ("contracts.wrapped_native", self.contracts.wrapped_native),
        ];
        for (name, addr) in required {
            if addr.is_zero() {
                return Err(ConfigError::Message(format!("{} must not be the zero address", name)));
            }
        }
        if self.swap.default_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(ConfigError::Message(format!(
                "swap.default_slippage_bps must be <= {}",
                MAX_SLIPPAGE_BPS
            )));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn address_env(key: &str) -> Result<Option<Address>, ConfigError> {
    match non_empty_env(key) {
        Some(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ConfigError::Message(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}
