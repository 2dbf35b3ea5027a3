use crate::cache::CacheManager;
use crate::chain::ChainClient;
use crate::context::ChainContext;
use crate::error::SwapError;
use crate::pools::CollectionPool;
use ethers::types::Address;
use log::debug;
use std::sync::Arc;

/// Pool existence and reserve snapshots between two route addresses.
///
/// Existence is answered through the factory's `getPair`; the zero address means
/// the pair does not exist. Existing pairs are cached by pair key.
pub struct PoolRepository<C: ChainClient> {
    client: Arc<C>,
    cache: Arc<CacheManager>,
    ctx: ChainContext,
}

impl<C: ChainClient> Clone for PoolRepository<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cache: Arc::clone(&self.cache),
            ctx: self.ctx.clone(),
        }
    }
}

impl<C: ChainClient> PoolRepository<C> {
    pub fn new(client: Arc<C>, cache: Arc<CacheManager>, ctx: ChainContext) -> Self {
        Self { client, cache, ctx }
    }

    /// Pair (LP token) address, `None` when the factory reports no pair.
    pub async fn pair_address(&self, a: Address, b: Address) -> Result<Option<Address>, SwapError> {
        if let Some(pair) = self.cache.get_pair(self.ctx.chain_id, a, b) {
            return Ok(Some(pair));
        }

        let pair = self
            .client
            .get_pair(self.ctx.factory, a, b)
            .await
            .map_err(|e| SwapError::contract_call(format!("getPair({:?}, {:?})", a, b), e))?;

        if pair.is_zero() {
            debug!("No pair for {:?} / {:?}", a, b);
            return Ok(None);
        }
        self.cache.put_pair(self.ctx.chain_id, a, b, pair);
        Ok(Some(pair))
    }

    pub async fn check_pool_exists(&self, a: Address, b: Address) -> Result<bool, SwapError> {
        Ok(self.pair_address(a, b).await?.is_some())
    }

    /// Fresh reserve snapshot; `discrete` lists the collection addresses among `a`/`b`.
    pub async fn snapshot(
        &self,
        a: Address,
        b: Address,
        discrete: &[Address],
    ) -> Result<Option<CollectionPool>, SwapError> {
        let pair = match self.pair_address(a, b).await? {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let reserves = self
            .client
            .pair_reserves(pair)
            .await
            .map_err(|e| SwapError::contract_call(format!("reserves of {:?}", pair), e))?;

        let token0 = reserves.token0;
        let token1 = if token0 == a { b } else { a };
        Ok(Some(CollectionPool {
            address: pair,
            token0,
            token1,
            reserve0: reserves.reserve0,
            reserve1: reserves.reserve1,
            discrete0: discrete.contains(&token0),
            discrete1: discrete.contains(&token1),
        }))
    }
}
