//! Route resolution against an in-memory chain
//!
//! Covers:
//! - Direct pools are preferred over multi-hop routes
//! - Two-leg routes through the configured intermediary
//! - Native tokens routed through the wrapped-native address
//! - Missing pools and unsupported pairs surfacing as typed errors

mod common;

use collection_swap_sdk::cache::CacheManager;
use collection_swap_sdk::context::ChainContext;
use collection_swap_sdk::error::SwapError;
use collection_swap_sdk::repositories::PoolRepository;
use collection_swap_sdk::router::{RouteKind, RouteResolver};
use collection_swap_sdk::types::{SwapParameters, SwapType};
use common::*;
use std::sync::Arc;

fn resolver(chain: &Arc<MockChain>, ctx: ChainContext) -> RouteResolver<MockChain> {
    let pools = PoolRepository::new(Arc::clone(chain), Arc::new(CacheManager::new()), ctx.clone());
    RouteResolver::new(pools, ctx)
}

/// A direct pool wins even when an intermediary route also exists
#[tokio::test]
async fn test_direct_route_preferred() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(weth(), punk());
    chain.add_pair(weth(), x_token());
    chain.add_pair(x_token(), punk());

    let params = SwapParameters::buy(weth_token(), punk_token(), ids(&[1]), bps(50));
    let route = resolver(&chain, ctx().with_intermediary(x_token()))
        .resolve(&params)
        .await
        .expect("route");

    assert_eq!(route.kind, RouteKind::Direct);
    assert_eq!(route.path, vec![weth(), punk()]);
}

/// Buying with the native token through an intermediary
#[tokio::test]
async fn test_native_buy_routes_through_intermediary() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(weth(), x_token());
    chain.add_pair(x_token(), punk());

    let params = SwapParameters::buy(native_token(), punk_token(), ids(&[1, 2, 3]), bps(100));
    let route = resolver(&chain, ctx().with_intermediary(x_token()))
        .resolve(&params)
        .await
        .expect("route");

    assert_eq!(route.kind, RouteKind::MultiHop);
    assert_eq!(route.path, vec![weth(), x_token(), punk()]);
    assert_eq!(route.intermediary(), Some(x_token()));
}

/// Selling into a token that only pairs with the intermediary
#[tokio::test]
async fn test_sell_multi_hop() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(punk(), weth());
    chain.add_pair(weth(), usdc());

    let params = SwapParameters::sell(punk_token(), usdc_token(), ids(&[7]), bps(50));
    let route = resolver(&chain, ctx()).resolve(&params).await.expect("route");

    assert!(route.is_multi_hop());
    assert_eq!(route.path, vec![punk(), weth(), usdc()]);
}

/// One missing leg means no route at all
#[tokio::test]
async fn test_missing_leg_is_pool_not_found() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(usdc(), weth());

    let params = SwapParameters::buy(usdc_token(), punk_token(), ids(&[1]), bps(50));
    let err = resolver(&chain, ctx()).resolve(&params).await.unwrap_err();

    assert!(
        matches!(err, SwapError::PoolNotFound { from, to } if from == usdc() && to == punk()),
        "unexpected error: {:?}",
        err
    );
}

/// An endpoint that is itself the intermediary cannot hop through it
#[tokio::test]
async fn test_intermediary_endpoint_without_direct_pool() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(weth(), usdc());

    let params = SwapParameters::buy(weth_token(), punk_token(), ids(&[1]), bps(50));
    let err = resolver(&chain, ctx()).resolve(&params).await.unwrap_err();
    assert!(matches!(err, SwapError::PoolNotFound { .. }));
}

/// Fungible to fungible has no collection side and is refused before any read
#[tokio::test]
async fn test_fungible_pair_is_unsupported() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(weth(), usdc());

    let err = resolver(&chain, ctx())
        .resolve_tokens(&weth_token(), &usdc_token(), SwapType::ExactOutputCollection)
        .await
        .unwrap_err();

    assert!(matches!(err, SwapError::UnsupportedSwapType(_)));
    assert_eq!(chain.call_count("getPair"), 0, "no pool lookups expected");
}

/// Pair lookups are cached once found
#[tokio::test]
async fn test_found_pairs_are_cached() {
    let chain = Arc::new(MockChain::new());
    chain.add_pair(weth(), punk());
    let resolver = resolver(&chain, ctx());
    let params = SwapParameters::buy(weth_token(), punk_token(), ids(&[1]), bps(50));

    resolver.resolve(&params).await.expect("first");
    resolver.resolve(&params).await.expect("second");
    assert_eq!(chain.call_count("getPair"), 1);
}

/// A failing RPC is reported as a retryable contract-call error
#[tokio::test]
async fn test_lookup_failure_is_retryable() {
    let chain = Arc::new(MockChain::new());
    chain.fail_method("getPair");

    let params = SwapParameters::buy(weth_token(), punk_token(), ids(&[1]), bps(50));
    let err = resolver(&chain, ctx()).resolve(&params).await.unwrap_err();
    assert!(err.is_retryable(), "expected retryable error, got {:?}", err);
}
