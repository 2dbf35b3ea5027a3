//! # Collection Swap SDK
//!
//! Client-side routing, quoting and approval-gated execution for an AMM that pools
//! NFT collections as per-unit assets against fungible (ERC20 or native) tokens.
//!
//! ## Overview
//!
//! The AMM math lives on-chain. This SDK decides which router calls to make, with what
//! arguments, in what order, and how to interpret the results:
//!
//! - **Routing**: direct pool, or two hops through the chain's intermediary
//! - **Quoting**: one or two chained router reads, with direction-aware slippage bounds
//! - **Gating**: balance/ownership validation and ERC20/ERC721 approvals before any
//!   value-moving call
//! - **Execution**: a single `{action, enabled, label}` decision per flow, call
//!   construction, submission and confirmation tracking
//!
//! ## Architecture
//!
//! ### Chain Layer
//! [`chain::ChainClient`] is the only boundary to the chain; [`chain::EthersChainClient`]
//! implements it over any ethers `Middleware`.
//!
//! ### Repository Layer
//! Token metadata, pool existence/reserves and router reads, cached per chain.
//!
//! ### Use-Case Layer
//! [`RouteResolver`] and [`QuoteCalculator`] for routes and quotes; [`ApprovalGate`] and
//! [`BalanceValidator`] for the preconditions of a transaction.
//!
//! ### Flow Layer
//! [`TransactionFlowOrchestrator`] reduces everything to one decision through an explicit
//! state machine and drives the final router call.

// Core Types
/// Token and parameter types
pub mod types;
/// Collection pair snapshots and price impact
pub mod pools;
/// Slippage tolerance and bound arithmetic
pub mod slippage;
/// Error taxonomy
pub mod error;

// Chain Layer
/// Chain client trait and ethers implementation
pub mod chain;
/// Contract ABIs (router, factory, pair, ERC20, ERC721)
pub mod contracts;

// Repository Layer
/// Token, pool and router repositories
pub mod repositories;
/// Token and pair caches
pub mod cache;

// Use-Case Layer
/// Route primitives and resolution
pub mod router;
/// Quote calculation
pub mod quote;
/// Allowance and operator approval state machine
pub mod approval;
/// Balance and ownership validation
pub mod validator;

// Flow Layer
/// Flow state machine, call construction and transaction tracking
pub mod flow;
/// Flow coordination
pub mod orchestrator;

// Infrastructure
/// Metrics and observability
pub mod metrics;

// Settings & Configuration
/// Configuration management
pub mod settings;
/// Per-chain router configuration
pub mod context;

// Re-exports for convenience
pub use approval::ApprovalGate;
pub use chain::{ChainClient, ContractRevert, EthersChainClient};
pub use context::ChainContext;
pub use error::SwapError;
pub use orchestrator::{FlowRequest, TransactionFlowOrchestrator};
pub use quote::{QuoteCalculator, SwapQuote};
pub use router::{Route, RouteResolver};
pub use settings::Settings;
pub use validator::BalanceValidator;
