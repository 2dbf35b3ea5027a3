//! # Slippage Bounds
//!
//! Slippage tolerance is expressed in basis points and applied in the integer (`U256`)
//! domain, the same domain the router enforces bounds in. Decimal values are only ever
//! derived from these integers for display.
//!
//! - Exact-output: `maximum_sent = ceil(theoretical * (10_000 + s) / 10_000)`
//! - Exact-input: `minimum_received = floor(theoretical * (10_000 - s) / 10_000)`
//!
//! Both are the identity at `s = 0`.

use crate::error::SwapError;
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BPS_DENOMINATOR: u32 = 10_000;
pub const MAX_SLIPPAGE_BPS: u32 = 5_000;
/// Tolerance used when neither the caller nor the settings choose one (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Validated slippage tolerance (0-5000 bps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SlippageTolerance(u32);

impl SlippageTolerance {
    pub const ZERO: SlippageTolerance = SlippageTolerance(0);
    pub const DEFAULT: SlippageTolerance = SlippageTolerance(DEFAULT_SLIPPAGE_BPS);

    pub fn from_bps(bps: u32) -> Result<Self, SwapError> {
        if bps > MAX_SLIPPAGE_BPS {
            return Err(SwapError::InvalidParameters(format!(
                "Slippage must be between 0 and {} bps, got {}",
                MAX_SLIPPAGE_BPS, bps
            )));
        }
        Ok(Self(bps))
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// Upper bound on the amount paid for an exact-output trade.
    pub fn maximum_sent(&self, theoretical: U256) -> U256 {
        if self.0 == 0 {
            return theoretical;
        }
        let numerator = theoretical.saturating_mul(U256::from(BPS_DENOMINATOR + self.0));
        let denominator = U256::from(BPS_DENOMINATOR);
        let (quotient, remainder) = numerator.div_mod(denominator);
        if remainder.is_zero() {
            quotient
        } else {
            quotient.saturating_add(U256::one())
        }
    }

    /// Lower bound on the amount received for an exact-input trade.
    pub fn minimum_received(&self, theoretical: U256) -> U256 {
        if self.0 == 0 {
            return theoretical;
        }
        theoretical.saturating_mul(U256::from(BPS_DENOMINATOR - self.0)) / U256::from(BPS_DENOMINATOR)
    }
}

impl TryFrom<u32> for SlippageTolerance {
    type Error = SwapError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bps(bps)
    }
}

impl From<SlippageTolerance> for u32 {
    fn from(s: SlippageTolerance) -> Self {
        s.0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}
