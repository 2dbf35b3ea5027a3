use crate::chain::ChainClient;
use crate::context::ChainContext;
use crate::error::SwapError;
use crate::metrics;
use crate::repositories::PoolRepository;
use crate::router::Route;
use crate::types::{SwapParameters, SwapType, Token};
use log::debug;

/// Decides between a direct and a two-hop path for a collection swap.
///
/// A direct pool always wins. The two-hop path through the configured intermediary
/// is only checked once the direct pair is known not to exist.
pub struct RouteResolver<C: ChainClient> {
    pools: PoolRepository<C>,
    ctx: ChainContext,
}

impl<C: ChainClient> Clone for RouteResolver<C> {
    fn clone(&self) -> Self {
        Self {
            pools: self.pools.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<C: ChainClient> RouteResolver<C> {
    pub fn new(pools: PoolRepository<C>, ctx: ChainContext) -> Self {
        Self { pools, ctx }
    }

    pub async fn resolve(&self, params: &SwapParameters) -> Result<Route, SwapError> {
        self.resolve_tokens(&params.from_token, &params.to_token, params.swap_type())
            .await
    }

    pub async fn resolve_tokens(&self, from: &Token, to: &Token, swap_type: SwapType) -> Result<Route, SwapError> {
        if let Err(e) = check_supported(from, to, swap_type) {
            metrics::increment_route_resolution("unsupported");
            return Err(e);
        }

        let from_addr = from.route_address(self.ctx.wrapped_native);
        let to_addr = to.route_address(self.ctx.wrapped_native);

        if self.pools.check_pool_exists(from_addr, to_addr).await? {
            debug!("Direct route {} -> {}", from.symbol, to.symbol);
            metrics::increment_route_resolution("direct");
            return Ok(Route::direct(from_addr, to_addr));
        }

        let intermediary = self.ctx.intermediary;
        if intermediary == from_addr || intermediary == to_addr {
            metrics::increment_route_resolution("not_found");
            return Err(SwapError::PoolNotFound {
                from: from_addr,
                to: to_addr,
            });
        }

        let (first_leg, second_leg) = futures::try_join!(
            self.pools.check_pool_exists(from_addr, intermediary),
            self.pools.check_pool_exists(intermediary, to_addr)
        )?;

        if first_leg && second_leg {
            debug!(
                "Multi-hop route {} -> {:?} -> {}",
                from.symbol, intermediary, to.symbol
            );
            metrics::increment_route_resolution("multi_hop");
            return Ok(Route::multi_hop(from_addr, intermediary, to_addr));
        }

        debug!(
            "No route {} -> {} (legs via intermediary: {}, {})",
            from.symbol, to.symbol, first_leg, second_leg
        );
        metrics::increment_route_resolution("not_found");
        Err(SwapError::PoolNotFound {
            from: from_addr,
            to: to_addr,
        })
    }
}

fn check_supported(from: &Token, to: &Token, swap_type: SwapType) -> Result<(), SwapError> {
    match (from.is_discrete(), to.is_discrete()) {
        (false, false) => Err(SwapError::UnsupportedSwapType(format!(
            "{} to {} has no collection side",
            from.symbol, to.symbol
        ))),
        (true, true) => Err(SwapError::UnsupportedSwapType(format!(
            "{} to {} swaps two collections",
            from.symbol, to.symbol
        ))),
        _ if swap_type == SwapType::Continuous => Err(SwapError::UnsupportedSwapType(
            "collection swaps require explicit token IDs".to_string(),
        )),
        _ => Ok(()),
    }
}
