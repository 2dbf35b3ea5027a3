//! # Chain Client Trait
//!
//! This module defines the single boundary between the SDK and the chain. Every read the
//! routing, quoting, approval and validation layers perform, and every transaction they
//! submit, goes through [`ChainClient`].
//!
//! ## Overview
//!
//! Reads are plain `async` calls returning `anyhow::Result`; the repositories above wrap
//! failures into typed [`SwapError`](crate::error::SwapError)s. Writes are expressed as an
//! already-encoded [`PreparedCall`], so call construction stays pure and testable.
//!
//! [`EthersChainClient`] is the production implementation over any ethers `Middleware`
//! (typically a `SignerMiddleware<Provider<Http>, LocalWallet>` for submissions, or a bare
//! `Provider<Http>` for read-only use).
//!
//! ## Example
//!
//! ```rust,no_run
//! use collection_swap_sdk::chain::{ChainClient, EthersChainClient};
//! use ethers::prelude::{Provider, Http};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = Provider::<Http>::try_from("http://127.0.0.1:8545")?;
//! let client = EthersChainClient::new(Arc::new(provider), 1);
//! let owner = client.owner_of("0x0000000000000000000000000000000000000001".parse()?, 7u64.into()).await?;
//! # Ok(())
//! # }
//! ```

use crate::context::ChainContext;
use crate::contracts::{CollectionFactory, CollectionPair, CollectionRouter, Erc20, Erc721};
use crate::metrics;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::contract::ContractError;
use ethers::prelude::*;
use log::{debug, info};
use std::sync::Arc;

/// An encoded call ready to be signed and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub to: Address,
    pub data: Bytes,
    /// Native value attached to the call
    pub value: U256,
    /// Contract function name, for logs and metrics
    pub method: &'static str,
}

/// Mined result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the receipt reports a revert
    pub success: bool,
}

/// Raw pair reserves as reported by the pair contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub token0: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

/// A read that the contract itself rejected, as opposed to a transport failure.
///
/// Implementations of [`ChainClient`] return this (inside `anyhow::Error`) for reverted
/// calls so callers can tell "the contract said no" from "the node could not answer".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} reverted: {}", .reason.as_deref().unwrap_or("no reason"))]
pub struct ContractRevert {
    pub method: String,
    pub reason: Option<String>,
}

impl ContractRevert {
    pub fn new(method: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            method: method.into(),
            reason,
        }
    }

    /// Whether `err` (or any error in its cause chain) is a contract revert.
    pub fn is_revert(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| cause.is::<ContractRevert>())
    }
}

/// The chain operations the SDK depends on.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the SDK shares one client behind an `Arc`
/// between repositories and flow components.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn erc20_symbol(&self, token: Address) -> Result<String>;

    async fn erc20_decimals(&self, token: Address) -> Result<u8>;

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn erc20_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    async fn collection_symbol(&self, collection: Address) -> Result<String>;

    /// ERC165 `supportsInterface`. Contracts without ERC165 usually revert.
    async fn supports_interface(&self, contract: Address, interface_id: [u8; 4]) -> Result<bool>;

    async fn collection_balance(&self, collection: Address, owner: Address) -> Result<U256>;

    /// Current owner of `token_id`. Reverts for burned or never-minted IDs.
    async fn owner_of(&self, collection: Address, token_id: U256) -> Result<Address>;

    async fn is_approved_for_all(&self, collection: Address, owner: Address, operator: Address) -> Result<bool>;

    /// Pair (LP token) address; `Address::zero()` when no pair exists.
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address>;

    async fn pair_reserves(&self, pair: Address) -> Result<PairReserves>;

    async fn get_amounts_out(&self, router: Address, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>>;

    async fn get_amounts_in(&self, router: Address, amount_out: U256, path: Vec<Address>) -> Result<Vec<U256>>;

    async fn get_amounts_out_collection(
        &self,
        router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>>;

    async fn get_amounts_in_collection(
        &self,
        router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>>;

    /// Signs and broadcasts `call` from `from`. Returns once the transaction is in the mempool.
    async fn send_transaction(&self, from: Address, call: PreparedCall) -> Result<TxHash>;

    /// Waits until `tx` is mined with the client's confirmation depth.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TxOutcome>;
}

/// [`ChainClient`] over an ethers `Middleware`.
#[derive(Clone)]
pub struct EthersChainClient<M: Middleware> {
    provider: Arc<M>,
    confirmations: usize,
}

impl<M: Middleware + 'static> EthersChainClient<M> {
    pub fn new(provider: Arc<M>, confirmations: usize) -> Self {
        Self {
            provider,
            confirmations: confirmations.max(1),
        }
    }

    pub fn provider(&self) -> Arc<M> {
        Arc::clone(&self.provider)
    }

    /// Checks that the configured router points at the configured factory and wrapped-native token.
    pub async fn verify_router(&self, ctx: &ChainContext) -> Result<()> {
        let router = CollectionRouter::new(ctx.router, Arc::clone(&self.provider));
        let factory = router.factory().call().await.map_err(contract_error::<M>("factory"))?;
        let wrapped = router.weth().call().await.map_err(contract_error::<M>("WETH"))?;
        if factory != ctx.factory {
            return Err(anyhow!(
                "router {:?} reports factory {:?}, configured {:?}",
                ctx.router,
                factory,
                ctx.factory
            ));
        }
        if wrapped != ctx.wrapped_native {
            return Err(anyhow!(
                "router {:?} reports wrapped native {:?}, configured {:?}",
                ctx.router,
                wrapped,
                ctx.wrapped_native
            ));
        }
        debug!("Router {:?} verified against factory {:?}", ctx.router, factory);
        Ok(())
    }
}

fn contract_error<M: Middleware>(method: &'static str) -> impl FnOnce(ContractError<M>) -> anyhow::Error {
    move |e| match e.decode_revert::<String>() {
        Some(reason) => ContractRevert::new(method, Some(reason)).into(),
        None if e.is_revert() => ContractRevert::new(method, None).into(),
        None => anyhow!("{} failed: {}", method, e),
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClient for EthersChainClient<M> {
    async fn erc20_symbol(&self, token: Address) -> Result<String> {
        metrics::increment_rpc_call("chain", "symbol");
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        erc20.symbol().call().await.map_err(contract_error::<M>("symbol"))
    }

    async fn erc20_decimals(&self, token: Address) -> Result<u8> {
        metrics::increment_rpc_call("chain", "decimals");
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        erc20.decimals().call().await.map_err(contract_error::<M>("decimals"))
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        metrics::increment_rpc_call("chain", "balanceOf");
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        erc20.balance_of(owner).call().await.map_err(contract_error::<M>("balanceOf"))
    }

    async fn erc20_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        metrics::increment_rpc_call("chain", "allowance");
        let erc20 = Erc20::new(token, Arc::clone(&self.provider));
        erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(contract_error::<M>("allowance"))
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        metrics::increment_rpc_call("chain", "eth_getBalance");
        self.provider
            .get_balance(owner, None)
            .await
            .map_err(|e| anyhow!("eth_getBalance failed: {}", e))
    }

    async fn collection_symbol(&self, collection: Address) -> Result<String> {
        metrics::increment_rpc_call("chain", "symbol");
        let erc721 = Erc721::new(collection, Arc::clone(&self.provider));
        erc721.symbol().call().await.map_err(contract_error::<M>("symbol"))
    }

    async fn collection_balance(&self, collection: Address, owner: Address) -> Result<U256> {
        metrics::increment_rpc_call("chain", "balanceOf");
        let erc721 = Erc721::new(collection, Arc::clone(&self.provider));
        erc721.balance_of(owner).call().await.map_err(contract_error::<M>("balanceOf"))
    }

    async fn supports_interface(&self, contract: Address, interface_id: [u8; 4]) -> Result<bool> {
        metrics::increment_rpc_call("chain", "supportsInterface");
        let erc721 = Erc721::new(contract, Arc::clone(&self.provider));
        erc721
            .supports_interface(interface_id)
            .call()
            .await
            .map_err(contract_error::<M>("supportsInterface"))
    }

    async fn owner_of(&self, collection: Address, token_id: U256) -> Result<Address> {
        metrics::increment_rpc_call("chain", "ownerOf");
        let erc721 = Erc721::new(collection, Arc::clone(&self.provider));
        erc721.owner_of(token_id).call().await.map_err(contract_error::<M>("ownerOf"))
    }

    async fn is_approved_for_all(&self, collection: Address, owner: Address, operator: Address) -> Result<bool> {
        metrics::increment_rpc_call("chain", "isApprovedForAll");
        let erc721 = Erc721::new(collection, Arc::clone(&self.provider));
        erc721
            .is_approved_for_all(owner, operator)
            .call()
            .await
            .map_err(contract_error::<M>("isApprovedForAll"))
    }

    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
        metrics::increment_rpc_call("chain", "getPair");
        let factory = CollectionFactory::new(factory, Arc::clone(&self.provider));
        factory
            .get_pair(token_a, token_b)
            .call()
            .await
            .map_err(contract_error::<M>("getPair"))
    }

    async fn pair_reserves(&self, pair: Address) -> Result<PairReserves> {
        metrics::increment_rpc_call("chain", "getReserves");
        let contract = CollectionPair::new(pair, Arc::clone(&self.provider));
        let token0 = contract.token_0().call().await.map_err(contract_error::<M>("token0"))?;
        let (reserve0, reserve1, _) = contract
            .get_reserves()
            .call()
            .await
            .map_err(contract_error::<M>("getReserves"))?;
        Ok(PairReserves {
            token0,
            reserve0: U256::from(reserve0),
            reserve1: U256::from(reserve1),
        })
    }

    async fn get_amounts_out(&self, router: Address, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>> {
        metrics::increment_rpc_call("chain", "getAmountsOut");
        let router = CollectionRouter::new(router, Arc::clone(&self.provider));
        router
            .get_amounts_out(amount_in, path)
            .call()
            .await
            .map_err(contract_error::<M>("getAmountsOut"))
    }

    async fn get_amounts_in(&self, router: Address, amount_out: U256, path: Vec<Address>) -> Result<Vec<U256>> {
        metrics::increment_rpc_call("chain", "getAmountsIn");
        let router = CollectionRouter::new(router, Arc::clone(&self.provider));
        router
            .get_amounts_in(amount_out, path)
            .call()
            .await
            .map_err(contract_error::<M>("getAmountsIn"))
    }

    async fn get_amounts_out_collection(
        &self,
        router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>> {
        metrics::increment_rpc_call("chain", "getAmountsOutCollection");
        let router = CollectionRouter::new(router, Arc::clone(&self.provider));
        router
            .get_amounts_out_collection(token_ids, path, cap_royalty_fee)
            .call()
            .await
            .map_err(contract_error::<M>("getAmountsOutCollection"))
    }

    async fn get_amounts_in_collection(
        &self,
        router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    ) -> Result<Vec<U256>> {
        metrics::increment_rpc_call("chain", "getAmountsInCollection");
        let router = CollectionRouter::new(router, Arc::clone(&self.provider));
        router
            .get_amounts_in_collection(token_ids, path, cap_royalty_fee)
            .call()
            .await
            .map_err(contract_error::<M>("getAmountsInCollection"))
    }

    async fn send_transaction(&self, from: Address, call: PreparedCall) -> Result<TxHash> {
        metrics::increment_rpc_call("chain", call.method);
        let tx = TransactionRequest::new()
            .from(from)
            .to(call.to)
            .data(call.data.clone())
            .value(call.value);
        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .map_err(|e| anyhow!("{} failed: {}", call.method, e))?;
        let hash = pending.tx_hash();
        info!("Broadcast {} to {:?}: {:?}", call.method, call.to, hash);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TxOutcome> {
        metrics::increment_rpc_call("chain", "eth_getTransactionReceipt");
        let receipt = PendingTransaction::new(tx, self.provider.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(|e| anyhow!("waiting for {:?} failed: {}", tx, e))?
            .ok_or_else(|| anyhow!("transaction {:?} was dropped from the mempool", tx))?;

        Ok(TxOutcome {
            hash: tx,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            success: receipt.status == Some(U64::from(1u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_detected_through_context() {
        let err = anyhow::Error::new(ContractRevert::new("ownerOf", Some("ERC721: invalid token ID".into())))
            .context("ownerOf PUNK #3");
        assert!(ContractRevert::is_revert(&err));
        assert!(format!("{:#}", err).contains("ownerOf reverted: ERC721: invalid token ID"));

        let transport = anyhow!("connection reset while reverting to fallback node");
        assert!(!ContractRevert::is_revert(&transport));
    }
}
