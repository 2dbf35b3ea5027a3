//! Per-chain, per-session router configuration passed by construction.

use crate::settings::Settings;
use crate::slippage::SlippageTolerance;
use crate::types::Token;
use ethers::types::Address;

/// Immutable view of the router deployment on one chain.
///
/// Every component that needs router addresses receives its own `ChainContext`;
/// switching chains means building a new context and new components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: u64,
    pub router: Address,
    pub factory: Address,
    pub wrapped_native: Address,
    pub intermediary: Address,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub deadline_minutes: u64,
    pub confirmations: usize,
    pub default_slippage: SlippageTolerance,
    pub max_approval: bool,
}

impl ChainContext {
    pub fn new(chain_id: u64, router: Address, factory: Address, wrapped_native: Address) -> Self {
        Self {
            chain_id,
            router,
            factory,
            wrapped_native,
            intermediary: wrapped_native,
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
            deadline_minutes: 20,
            confirmations: 1,
            default_slippage: SlippageTolerance::DEFAULT,
            max_approval: false,
        }
    }

    pub fn with_intermediary(mut self, intermediary: Address) -> Self {
        self.intermediary = intermediary;
        self
    }

    pub fn with_deadline_minutes(mut self, minutes: u64) -> Self {
        self.deadline_minutes = minutes;
        self
    }

    pub fn native_token(&self) -> Token {
        Token::native(self.native_symbol.clone(), self.native_decimals)
    }

    /// Unix deadline `deadline_minutes` from `now`.
    pub fn deadline_from(&self, now_unix: u64) -> u64 {
        now_unix.saturating_add(self.deadline_minutes.saturating_mul(60))
    }
}

impl TryFrom<&Settings> for ChainContext {
    type Error = crate::error::SwapError;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        let default_slippage = SlippageTolerance::from_bps(settings.swap.default_slippage_bps)?;
        Ok(Self {
            chain_id: settings.chain.chain_id,
            router: settings.contracts.router,
            factory: settings.contracts.factory,
            wrapped_native: settings.contracts.wrapped_native,
            intermediary: settings
                .contracts
                .intermediary
                .unwrap_or(settings.contracts.wrapped_native),
            native_symbol: settings.chain.native_symbol.clone(),
            native_decimals: settings.chain.native_decimals,
            deadline_minutes: settings.swap.deadline_minutes,
            confirmations: settings.rpc.confirmations,
            default_slippage,
            max_approval: settings.swap.max_approval,
        })
    }
}
