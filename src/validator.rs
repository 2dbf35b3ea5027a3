// Balance Validator Module
//
// The `BalanceValidator` checks that the connected account can actually fund a flow
// before any approval or value-moving transaction is offered.
//
// ## Validation Criteria
//
// - **Fungible / native**: balance >= required amount in base units
// - **Collection**: aggregate `balanceOf` covers the selection AND every selected ID's
//   `ownerOf` is the account; the aggregate never substitutes for per-ID ownership
//
// Shortfalls are reported inside `ValidationResult`, never as `Err`. An `Err` means the
// chain could not be read.

use crate::chain::{ChainClient, ContractRevert};
use crate::error::{SwapError, ValidationError};
use crate::types::{Token, TokenKind};
use ethers::prelude::*;
use futures::future::{join_all, try_join_all};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

/// One balance or ownership requirement of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceCheck {
    /// ERC20 (or LP share) balance of at least `required`
    Fungible { token: Token, owner: Address, required: U256 },
    /// Native currency balance of at least `required`
    Native { token: Token, owner: Address, required: U256 },
    /// Ownership of every ID in `token_ids`
    Ownership {
        collection: Token,
        owner: Address,
        token_ids: Vec<U256>,
    },
}

impl BalanceCheck {
    /// Balance check matching `token`'s kind; collections need [`BalanceCheck::ownership`].
    pub fn amount(token: &Token, owner: Address, required: U256) -> Self {
        match token.kind {
            TokenKind::Native => BalanceCheck::Native {
                token: token.clone(),
                owner,
                required,
            },
            _ => BalanceCheck::Fungible {
                token: token.clone(),
                owner,
                required,
            },
        }
    }

    pub fn ownership(collection: &Token, owner: Address, token_ids: &[U256]) -> Self {
        BalanceCheck::Ownership {
            collection: collection.clone(),
            owner,
            token_ids: token_ids.to_vec(),
        }
    }

    pub fn required_amount(&self) -> U256 {
        match self {
            BalanceCheck::Fungible { required, .. } | BalanceCheck::Native { required, .. } => *required,
            BalanceCheck::Ownership { token_ids, .. } => U256::from(token_ids.len()),
        }
    }
}

/// Outcome of one [`BalanceCheck`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub has_enough_balance: bool,
    /// Balance in base units (collection: number of held units)
    pub user_balance: U256,
    pub required_amount: U256,
    #[serde(serialize_with = "serialize_error")]
    pub validation_error: Option<ValidationError>,
    pub is_loading: bool,
}

fn serialize_error<S: serde::Serializer>(error: &Option<ValidationError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl ValidationResult {
    /// Placeholder while reads are in flight; not a failure.
    pub fn loading(required_amount: U256) -> Self {
        Self {
            has_enough_balance: false,
            user_balance: U256::zero(),
            required_amount,
            validation_error: None,
            is_loading: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.is_loading && self.has_enough_balance
    }
}

/// Validates balances and ownership against the chain.
pub struct BalanceValidator<C: ChainClient> {
    client: Arc<C>,
}

impl<C: ChainClient> Clone for BalanceValidator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: ChainClient> BalanceValidator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn validate(&self, check: &BalanceCheck) -> Result<ValidationResult, SwapError> {
        match check {
            BalanceCheck::Fungible { token, owner, required } => {
                let balance = self
                    .client
                    .erc20_balance(token.address, *owner)
                    .await
                    .map_err(|e| SwapError::contract_call(format!("balanceOf {}", token.symbol), e))?;
                Ok(amount_result(token, balance, *required))
            }
            BalanceCheck::Native { token, owner, required } => {
                let balance = self
                    .client
                    .native_balance(*owner)
                    .await
                    .map_err(|e| SwapError::contract_call("native balance", e))?;
                Ok(amount_result(token, balance, *required))
            }
            BalanceCheck::Ownership {
                collection,
                owner,
                token_ids,
            } => self.validate_ownership(collection, *owner, token_ids).await,
        }
    }

    /// Validates every check concurrently; fails if any read fails.
    pub async fn validate_all(&self, checks: &[BalanceCheck]) -> Result<Vec<ValidationResult>, SwapError> {
        try_join_all(checks.iter().map(|check| self.validate(check))).await
    }

    async fn validate_ownership(
        &self,
        collection: &Token,
        owner: Address,
        token_ids: &[U256],
    ) -> Result<ValidationResult, SwapError> {
        let held_fut = self.client.collection_balance(collection.address, owner);
        let owners_fut = join_all(
            token_ids
                .iter()
                .map(|id| self.client.owner_of(collection.address, *id)),
        );
        let (held, owners) = futures::join!(held_fut, owners_fut);
        let held = held.map_err(|e| SwapError::contract_call(format!("balanceOf {}", collection.symbol), e))?;

        let mut missing = Vec::new();
        for (id, result) in token_ids.iter().zip(owners) {
            match result {
                Ok(current) if current == owner => {}
                Ok(current) => {
                    debug!("{} #{} is owned by {:?}", collection.symbol, id, current);
                    missing.push(*id);
                }
                // ownerOf reverts for burned or unminted IDs
                Err(e) if ContractRevert::is_revert(&e) => {
                    debug!("{} #{} has no owner: {:#}", collection.symbol, id, e);
                    missing.push(*id);
                }
                Err(e) => {
                    warn!("ownerOf {} #{} failed: {:#}", collection.symbol, id, e);
                    return Err(SwapError::contract_call(format!("ownerOf {} #{}", collection.symbol, id), e));
                }
            }
        }

        let required = U256::from(token_ids.len());
        let validation_error = if !missing.is_empty() {
            Some(ValidationError::NotOwner {
                symbol: collection.symbol.clone(),
                missing,
            })
        } else if held < required {
            Some(ValidationError::InsufficientCollectionBalance {
                symbol: collection.symbol.clone(),
                held,
                required,
            })
        } else {
            None
        };

        Ok(ValidationResult {
            has_enough_balance: validation_error.is_none(),
            user_balance: held,
            required_amount: required,
            validation_error,
            is_loading: false,
        })
    }
}

fn amount_result(token: &Token, balance: U256, required: U256) -> ValidationResult {
    let has_enough_balance = balance >= required;
    let validation_error = if has_enough_balance {
        None
    } else {
        Some(ValidationError::InsufficientBalance {
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            required,
            available: balance,
            shortfall: required - balance,
        })
    };
    ValidationResult {
        has_enough_balance,
        user_balance: balance,
        required_amount: required,
        validation_error,
        is_loading: false,
    }
}
