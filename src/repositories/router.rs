use crate::chain::ChainClient;
use crate::context::ChainContext;
use crate::error::SwapError;
use ethers::types::{Address, U256};
use std::sync::Arc;

/// Thin wrapper over the router's read functions.
///
/// Every result is checked to have one amount per path element; zero amounts are
/// reported as [`SwapError::InsufficientLiquidity`].
pub struct RouterRepository<C: ChainClient> {
    client: Arc<C>,
    ctx: ChainContext,
}

impl<C: ChainClient> Clone for RouterRepository<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            ctx: self.ctx.clone(),
        }
    }
}

impl<C: ChainClient> RouterRepository<C> {
    pub fn new(client: Arc<C>, ctx: ChainContext) -> Self {
        Self { client, ctx }
    }

    pub async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>, SwapError> {
        let amounts = self
            .client
            .get_amounts_out(self.ctx.router, amount_in, path.to_vec())
            .await
            .map_err(|e| SwapError::contract_call("getAmountsOut", e))?;
        checked(amounts, path, "getAmountsOut")
    }

    pub async fn get_amounts_in(&self, amount_out: U256, path: &[Address]) -> Result<Vec<U256>, SwapError> {
        let amounts = self
            .client
            .get_amounts_in(self.ctx.router, amount_out, path.to_vec())
            .await
            .map_err(|e| SwapError::contract_call("getAmountsIn", e))?;
        checked(amounts, path, "getAmountsIn")
    }

    pub async fn get_amounts_out_collection(
        &self,
        token_ids: &[U256],
        path: &[Address],
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>, SwapError> {
        let amounts = self
            .client
            .get_amounts_out_collection(self.ctx.router, token_ids.to_vec(), path.to_vec(), cap_royalty_fee)
            .await
            .map_err(|e| SwapError::contract_call("getAmountsOutCollection", e))?;
        checked(amounts, path, "getAmountsOutCollection")
    }

    pub async fn get_amounts_in_collection(
        &self,
        token_ids: &[U256],
        path: &[Address],
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>, SwapError> {
        let amounts = self
            .client
            .get_amounts_in_collection(self.ctx.router, token_ids.to_vec(), path.to_vec(), cap_royalty_fee)
            .await
            .map_err(|e| SwapError::contract_call("getAmountsInCollection", e))?;
        checked(amounts, path, "getAmountsInCollection")
    }
}

fn checked(amounts: Vec<U256>, path: &[Address], method: &str) -> Result<Vec<U256>, SwapError> {
    if amounts.len() != path.len() {
        return Err(SwapError::contract_call(
            method,
            anyhow::anyhow!("expected {} amounts, router returned {}", path.len(), amounts.len()),
        ));
    }
    if amounts.iter().any(|a| a.is_zero()) {
        return Err(SwapError::InsufficientLiquidity { path: path.to_vec() });
    }
    Ok(amounts)
}
