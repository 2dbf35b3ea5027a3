//! Cached, typed wrappers over the [`ChainClient`](crate::chain::ChainClient) reads.
//!
//! Repository failures are wrapped into [`SwapError::ContractCall`](crate::error::SwapError)
//! with the original cause preserved.

pub mod pool;
pub mod router;
pub mod token;

pub use pool::PoolRepository;
pub use router::RouterRepository;
pub use token::TokenRepository;
