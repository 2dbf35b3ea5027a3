//! # Error Taxonomy
//!
//! Typed domain errors produced by the routing, quoting and execution layers.
//! Chain-level failures arrive as `anyhow::Error` from the [`ChainClient`](crate::chain::ChainClient)
//! seam and are wrapped into [`SwapError::ContractCall`] with their original cause preserved.
//!
//! Balance and ownership shortfalls are deliberately *not* part of `SwapError`: they are
//! reported through [`ValidationError`] inside a
//! [`ValidationResult`](crate::validator::ValidationResult).

use crate::types::conversions::format_amount;
use ethers::types::{Address, U256};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error cause.
pub type ErrorSource = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("no pool route between {from:?} and {to:?}")]
    PoolNotFound { from: Address, to: Address },

    #[error("insufficient liquidity along path {path:?}")]
    InsufficientLiquidity { path: Vec<Address> },

    #[error("price moved beyond slippage tolerance: {reason}")]
    ExcessiveSlippage { reason: String },

    #[error("contract call failed ({context}): {source}")]
    ContractCall {
        context: String,
        #[source]
        source: ErrorSource,
    },

    #[error("unsupported swap type: {0}")]
    UnsupportedSwapType(String),

    #[error("approval failed: {0}")]
    ApprovalFailed(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

impl SwapError {
    /// Wraps a chain-seam failure, classifying well-known router revert strings first.
    pub fn contract_call(context: impl Into<String>, err: anyhow::Error) -> Self {
        let context = context.into();
        let message = format!("{:#}", err);
        if let Some(classified) = classify_revert(&message) {
            return classified;
        }
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        SwapError::ContractCall {
            context,
            source: Arc::from(boxed),
        }
    }

    /// Whether re-triggering the same operation can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::ContractCall { .. } | SwapError::TransactionFailed(_)
        )
    }

    /// Short user-facing copy for labels and toasts.
    pub fn user_message(&self) -> String {
        match self {
            SwapError::InvalidParameters(msg) => msg.clone(),
            SwapError::PoolNotFound { .. } => "No pool found for this pair".to_string(),
            SwapError::InsufficientLiquidity { .. } => "Insufficient liquidity".to_string(),
            SwapError::ExcessiveSlippage { .. } => {
                "Price moved too much, increase slippage tolerance".to_string()
            }
            SwapError::ContractCall { .. } => "Network error, try again".to_string(),
            SwapError::UnsupportedSwapType(_) => "Swap type not supported".to_string(),
            SwapError::ApprovalFailed(_) => "Approval failed".to_string(),
            SwapError::TransactionFailed(_) => "Transaction failed".to_string(),
        }
    }
}

fn classify_revert(message: &str) -> Option<SwapError> {
    let upper = message.to_uppercase();
    if upper.contains("INSUFFICIENT_OUTPUT_AMOUNT") || upper.contains("EXCESSIVE_INPUT_AMOUNT") {
        return Some(SwapError::ExcessiveSlippage {
            reason: message.to_string(),
        });
    }
    if upper.contains("INSUFFICIENT_LIQUIDITY") {
        return Some(SwapError::InsufficientLiquidity { path: Vec::new() });
    }
    None
}

/// Balance or ownership shortfall, rendered as a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Amounts are base units; `Display` renders them with `decimals`.
    #[error(
        "Insufficient {symbol} balance: need {}, have {} (short {})",
        units(.required, .decimals),
        units(.available, .decimals),
        units(.shortfall, .decimals)
    )]
    InsufficientBalance {
        symbol: String,
        decimals: u8,
        required: U256,
        available: U256,
        shortfall: U256,
    },

    #[error("You hold {held} {symbol} but {required} are selected")]
    InsufficientCollectionBalance {
        symbol: String,
        held: U256,
        required: U256,
    },

    #[error("You do not own {symbol} {}", format_token_ids(.missing))]
    NotOwner { symbol: String, missing: Vec<U256> },
}

fn units(value: &U256, decimals: &u8) -> String {
    format_amount(*value, *decimals)
}

pub(crate) fn format_token_ids(ids: &[U256]) -> String {
    ids.iter()
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(", ")
}
