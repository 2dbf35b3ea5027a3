// src/pools.rs

use crate::slippage::BPS_DENOMINATOR;
use ethers::prelude::{Address, U256};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of a collection pair.
///
/// Snapshots are refreshed on demand and never mutated locally. Reserves on a
/// collection side count whole units (decimals 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPool {
    /// Pair contract, also the LP-share token
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub discrete0: bool,
    pub discrete1: bool,
}

impl CollectionPool {
    pub fn contains(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }

    /// `(reserve_in, reserve_out)` for a trade from `token_in`, if it belongs to the pair.
    pub fn reserves_for(&self, token_in: Address) -> Option<(U256, U256)> {
        if token_in == self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    pub fn has_liquidity(&self) -> bool {
        !self.reserve0.is_zero() && !self.reserve1.is_zero()
    }

    /// Price impact of trading `amount_in` for `amount_out` from `token_in`, in basis points.
    ///
    /// Measured against the mid price `reserve_out / reserve_in`; includes the pool fee.
    pub fn price_impact_bps(&self, token_in: Address, amount_in: U256, amount_out: U256) -> Option<u32> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in)?;
        leg_price_impact_bps(amount_in, amount_out, reserve_in, reserve_out)
    }
}

/// `1 - (amount_out * reserve_in) / (amount_in * reserve_out)`, clamped to `[0, 10_000]` bps.
pub fn leg_price_impact_bps(amount_in: U256, amount_out: U256, reserve_in: U256, reserve_out: U256) -> Option<u32> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let executed = amount_out.checked_mul(reserve_in)?;
    let mid = amount_in.checked_mul(reserve_out)?;
    let ratio_bps = executed.checked_mul(U256::from(BPS_DENOMINATOR))? / mid;
    let ratio_bps = ratio_bps.min(U256::from(BPS_DENOMINATOR)).as_u32();
    Some(BPS_DENOMINATOR - ratio_bps)
}

/// Compounds per-leg impacts: `1 - (1 - a)(1 - b)`.
pub fn combine_price_impact_bps(a: u32, b: u32) -> u32 {
    let keep = (BPS_DENOMINATOR - a.min(BPS_DENOMINATOR)) as u64 * (BPS_DENOMINATOR - b.min(BPS_DENOMINATOR)) as u64
        / BPS_DENOMINATOR as u64;
    BPS_DENOMINATOR - keep as u32
}
