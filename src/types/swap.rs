use crate::error::SwapError;
use crate::slippage::SlippageTolerance;
use crate::types::token::Token;
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Orientation of a trade against a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapType {
    /// Acquire specific token IDs, paying a quoted input amount
    ExactOutputCollection,
    /// Dispose of specific token IDs, receiving a quoted output amount
    ExactInputCollection,
    /// No discrete side; not handled by this pipeline
    Continuous,
}

impl SwapType {
    pub fn is_exact_input(&self) -> bool {
        matches!(self, SwapType::ExactInputCollection)
    }
}

/// User intent for a single swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParameters {
    pub from_token: Token,
    pub to_token: Token,
    /// Entered amount in base units (the count of IDs for collection sides)
    pub amount: U256,
    pub token_ids: Option<Vec<U256>>,
    pub is_exact_input: bool,
    pub cap_royalty_fee: bool,
    pub slippage: SlippageTolerance,
}

impl SwapParameters {
    /// Buy `token_ids` of `to_token` paying with `from_token`.
    pub fn buy(from_token: Token, to_token: Token, token_ids: Vec<U256>, slippage: SlippageTolerance) -> Self {
        Self {
            from_token,
            to_token,
            amount: U256::from(token_ids.len()),
            token_ids: Some(token_ids),
            is_exact_input: false,
            cap_royalty_fee: true,
            slippage,
        }
    }

    /// Sell `token_ids` of `from_token` for `to_token`.
    pub fn sell(from_token: Token, to_token: Token, token_ids: Vec<U256>, slippage: SlippageTolerance) -> Self {
        Self {
            from_token,
            to_token,
            amount: U256::from(token_ids.len()),
            token_ids: Some(token_ids),
            is_exact_input: true,
            cap_royalty_fee: true,
            slippage,
        }
    }

    pub fn with_cap_royalty_fee(mut self, cap: bool) -> Self {
        self.cap_royalty_fee = cap;
        self
    }

    pub fn swap_type(&self) -> SwapType {
        match (&self.token_ids, self.is_exact_input) {
            (None, _) => SwapType::Continuous,
            (Some(_), true) => SwapType::ExactInputCollection,
            (Some(_), false) => SwapType::ExactOutputCollection,
        }
    }

    /// Token IDs of the trade; empty when none were given.
    pub fn ids(&self) -> &[U256] {
        self.token_ids.as_deref().unwrap_or(&[])
    }

    /// The collection side of the trade, if exactly one side is discrete.
    pub fn collection(&self) -> Option<&Token> {
        match (self.from_token.is_discrete(), self.to_token.is_discrete()) {
            (true, false) => Some(&self.from_token),
            (false, true) => Some(&self.to_token),
            _ => None,
        }
    }

    /// Structural checks that do not need the chain.
    pub fn validate(&self) -> Result<(), SwapError> {
        let from_discrete = self.from_token.is_discrete();
        let to_discrete = self.to_token.is_discrete();

        if from_discrete && to_discrete {
            return Err(SwapError::UnsupportedSwapType(
                "collection to collection swaps are not supported".to_string(),
            ));
        }
        if !from_discrete && !to_discrete {
            return Err(SwapError::UnsupportedSwapType(
                "continuous token to token swaps are not routed by this pipeline".to_string(),
            ));
        }

        let ids = match &self.token_ids {
            None => {
                return Err(SwapError::UnsupportedSwapType(
                    "collection swaps require explicit token IDs".to_string(),
                ))
            }
            Some(ids) => ids,
        };
        validate_token_ids(ids)?;

        match self.swap_type() {
            SwapType::ExactOutputCollection if !to_discrete => Err(SwapError::InvalidParameters(
                "exact-output collection swaps must receive the collection".to_string(),
            )),
            SwapType::ExactInputCollection if !from_discrete => Err(SwapError::InvalidParameters(
                "exact-input collection swaps must spend the collection".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Rejects empty and duplicated selections.
pub fn validate_token_ids(ids: &[U256]) -> Result<(), SwapError> {
    if ids.is_empty() {
        return Err(SwapError::InvalidParameters(
            "Select at least one NFT".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(SwapError::InvalidParameters(format!(
                "Token ID #{} is selected twice",
                id
            )));
        }
    }
    Ok(())
}

/// Deposit of a fungible (or native) amount plus specific IDs into a collection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityParameters {
    pub token: Token,
    pub collection: Token,
    pub amount_desired: U256,
    pub token_ids: Vec<U256>,
    pub slippage: SlippageTolerance,
}

impl AddLiquidityParameters {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.token.is_discrete() || !self.collection.is_discrete() {
            return Err(SwapError::InvalidParameters(
                "liquidity pairs a fungible token with a collection".to_string(),
            ));
        }
        if self.amount_desired.is_zero() {
            return Err(SwapError::InvalidParameters(format!(
                "Enter a {} amount",
                self.token.symbol
            )));
        }
        validate_token_ids(&self.token_ids)
    }
}

/// Withdrawal of LP shares for a fungible amount plus specific IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityParameters {
    pub token: Token,
    pub collection: Token,
    pub liquidity: U256,
    pub token_ids: Vec<U256>,
    /// Recorded for display; the on-chain minimum for removals is always zero
    pub slippage: SlippageTolerance,
}

impl RemoveLiquidityParameters {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.token.is_discrete() || !self.collection.is_discrete() {
            return Err(SwapError::InvalidParameters(
                "liquidity pairs a fungible token with a collection".to_string(),
            ));
        }
        if self.liquidity.is_zero() {
            return Err(SwapError::InvalidParameters(
                "Enter an LP amount".to_string(),
            ));
        }
        validate_token_ids(&self.token_ids)
    }
}
