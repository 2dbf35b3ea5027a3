//! # Quote Calculator
//!
//! Computes input/output amounts for a resolved [`Route`] and derives the slippage
//! bound the router will enforce.
//!
//! ## Call chaining
//!
//! | Orientation | Direct | Multi-hop |
//! |---|---|---|
//! | Exact output (buy IDs) | `getAmountsInCollection(ids, [from, nft])` | `getAmountsInCollection(ids, [X, nft])`, then `getAmountsIn(x, [from, X])` |
//! | Exact input (sell IDs) | `getAmountsOutCollection(ids, [nft, to])` | `getAmountsOutCollection(ids, [nft, X])`, then `getAmountsOut(x, [X, to])` |
//!
//! The second multi-hop call is only issued after the first resolves, since its
//! amount argument is the first call's result.

use crate::chain::ChainClient;
use crate::error::SwapError;
use crate::metrics;
use crate::pools::{combine_price_impact_bps, CollectionPool};
use crate::repositories::{PoolRepository, RouterRepository};
use crate::router::Route;
use crate::slippage::SlippageTolerance;
use crate::types::conversions::format_amount;
use crate::types::{SwapParameters, SwapType, Token};
use ethers::types::{Address, U256};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Slippage-adjusted bound; which one applies depends on the swap direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "amount")]
pub enum SlippageBound {
    /// Upper bound on the input of an exact-output swap
    MaximumSent(U256),
    /// Lower bound on the output of an exact-input swap
    MinimumReceived(U256),
}

/// A freshly computed quote. A parameter change always produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub swap_type: SwapType,
    /// Theoretical input in the origin token's base units (ID count when selling)
    pub input_amount: U256,
    /// Theoretical output in the destination token's base units (ID count when buying)
    pub output_amount: U256,
    /// Intermediary amount between the two calls of a multi-hop quote
    pub intermediate_amount: Option<U256>,
    /// Price impact against pool mid prices, when reserves could be read
    pub price_impact_bps: Option<u32>,
    pub bound: SlippageBound,
    pub slippage: SlippageTolerance,
    pub route: Route,
}

impl SwapQuote {
    pub fn is_multi_hop(&self) -> bool {
        self.route.is_multi_hop()
    }

    pub fn maximum_sent(&self) -> Option<U256> {
        match self.bound {
            SlippageBound::MaximumSent(amount) => Some(amount),
            SlippageBound::MinimumReceived(_) => None,
        }
    }

    pub fn minimum_received(&self) -> Option<U256> {
        match self.bound {
            SlippageBound::MinimumReceived(amount) => Some(amount),
            SlippageBound::MaximumSent(_) => None,
        }
    }

    /// Amount to show as "you pay". For exact-output swaps this is the maximum sent.
    pub fn display_input(&self, from: &Token) -> String {
        let amount = self.maximum_sent().unwrap_or(self.input_amount);
        format!("{} {}", format_amount(amount, from.decimals), from.symbol)
    }

    /// Amount to show as "you receive". For exact-input swaps this is the minimum received.
    pub fn display_output(&self, to: &Token) -> String {
        let amount = self.minimum_received().unwrap_or(self.output_amount);
        format!("{} {}", format_amount(amount, to.decimals), to.symbol)
    }
}

/// Quotes collection swaps through the router's read functions.
pub struct QuoteCalculator<C: ChainClient> {
    router: RouterRepository<C>,
    pools: PoolRepository<C>,
}

impl<C: ChainClient> Clone for QuoteCalculator<C> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            pools: self.pools.clone(),
        }
    }
}

impl<C: ChainClient> QuoteCalculator<C> {
    pub fn new(router: RouterRepository<C>, pools: PoolRepository<C>) -> Self {
        Self { router, pools }
    }

    pub async fn quote(&self, params: &SwapParameters, route: &Route) -> Result<SwapQuote, SwapError> {
        params.validate()?;
        let started = Instant::now();
        let ids = params.ids();
        let count = U256::from(ids.len());

        let (input_amount, output_amount, intermediate_amount, bound) = match params.swap_type() {
            SwapType::ExactOutputCollection => {
                let (input, intermediate) = self.quote_exact_output(ids, route, params.cap_royalty_fee).await?;
                let bound = SlippageBound::MaximumSent(params.slippage.maximum_sent(input));
                (input, count, intermediate, bound)
            }
            SwapType::ExactInputCollection => {
                let (output, intermediate) = self.quote_exact_input(ids, route, params.cap_royalty_fee).await?;
                let bound = SlippageBound::MinimumReceived(params.slippage.minimum_received(output));
                (count, output, intermediate, bound)
            }
            SwapType::Continuous => {
                return Err(SwapError::UnsupportedSwapType(
                    "continuous swaps cannot be quoted against a collection".to_string(),
                ))
            }
        };

        let price_impact_bps = self
            .price_impact(route, params, input_amount, output_amount, intermediate_amount)
            .await;

        metrics::record_quote_latency(&route.kind.to_string(), started.elapsed());
        debug!(
            "Quoted {} -> {} over {}: in {} out {} ({:?})",
            params.from_token.symbol,
            params.to_token.symbol,
            route.kind,
            input_amount,
            output_amount,
            bound
        );

        Ok(SwapQuote {
            swap_type: params.swap_type(),
            input_amount,
            output_amount,
            intermediate_amount,
            price_impact_bps,
            bound,
            slippage: params.slippage,
            route: route.clone(),
        })
    }

    /// Origin amount needed to acquire `ids`, plus the intermediary amount on multi-hop routes.
    async fn quote_exact_output(
        &self,
        ids: &[U256],
        route: &Route,
        cap_royalty_fee: bool,
    ) -> Result<(U256, Option<U256>), SwapError> {
        match route.intermediary() {
            None => {
                let amounts = self
                    .router
                    .get_amounts_in_collection(ids, &route.path, cap_royalty_fee)
                    .await?;
                Ok((amounts[0], None))
            }
            Some(intermediary) => {
                let collection_leg = [intermediary, route.to()];
                let amounts = self
                    .router
                    .get_amounts_in_collection(ids, &collection_leg, cap_royalty_fee)
                    .await?;
                let intermediate = amounts[0];

                let origin_leg = [route.from(), intermediary];
                let amounts = self.router.get_amounts_in(intermediate, &origin_leg).await?;
                Ok((amounts[0], Some(intermediate)))
            }
        }
    }

    /// Destination amount obtained for `ids`, plus the intermediary amount on multi-hop routes.
    async fn quote_exact_input(
        &self,
        ids: &[U256],
        route: &Route,
        cap_royalty_fee: bool,
    ) -> Result<(U256, Option<U256>), SwapError> {
        match route.intermediary() {
            None => {
                let amounts = self
                    .router
                    .get_amounts_out_collection(ids, &route.path, cap_royalty_fee)
                    .await?;
                Ok((amounts[amounts.len() - 1], None))
            }
            Some(intermediary) => {
                let collection_leg = [route.from(), intermediary];
                let amounts = self
                    .router
                    .get_amounts_out_collection(ids, &collection_leg, cap_royalty_fee)
                    .await?;
                let intermediate = amounts[amounts.len() - 1];

                let destination_leg = [intermediary, route.to()];
                let amounts = self.router.get_amounts_out(intermediate, &destination_leg).await?;
                Ok((amounts[amounts.len() - 1], Some(intermediate)))
            }
        }
    }

    // Best effort: a failed reserve read leaves the impact unknown instead of failing the quote
    async fn price_impact(
        &self,
        route: &Route,
        params: &SwapParameters,
        input: U256,
        output: U256,
        intermediate: Option<U256>,
    ) -> Option<u32> {
        let collection = params.collection()?.address;
        let leg_amounts: Vec<(U256, U256)> = match intermediate {
            None => vec![(input, output)],
            Some(x) => vec![(input, x), (x, output)],
        };

        let mut combined = 0u32;
        for ((token_in, token_out), (amount_in, amount_out)) in route.legs().into_iter().zip(leg_amounts) {
            let pool = match self.leg_pool(token_in, token_out, collection).await {
                Some(pool) => pool,
                None => return None,
            };
            let impact = pool.price_impact_bps(token_in, amount_in, amount_out)?;
            combined = combine_price_impact_bps(combined, impact);
        }
        Some(combined)
    }

    async fn leg_pool(&self, token_in: Address, token_out: Address, collection: Address) -> Option<CollectionPool> {
        match self.pools.snapshot(token_in, token_out, &[collection]).await {
            Ok(Some(pool)) if pool.has_liquidity() => Some(pool),
            Ok(_) => None,
            Err(e) => {
                warn!("Reserve read for {:?}/{:?} failed: {}", token_in, token_out, e);
                None
            }
        }
    }
}
