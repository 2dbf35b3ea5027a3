//! Token metadata resolution
//!
//! Covers:
//! - Process-lifetime caching per (chain, address), shared through the cache manager
//! - Kind mismatches resolved again and rejected when the contract is not of that kind
//! - Native currency resolved from the chain context without any reads

mod common;

use collection_swap_sdk::cache::CacheManager;
use collection_swap_sdk::context::ChainContext;
use collection_swap_sdk::error::SwapError;
use collection_swap_sdk::repositories::TokenRepository;
use collection_swap_sdk::types::TokenKind;
use common::*;
use std::sync::Arc;

fn repository(chain: &Arc<MockChain>, cache: &Arc<CacheManager>, ctx: ChainContext) -> TokenRepository<MockChain> {
    TokenRepository::new(Arc::clone(chain), Arc::clone(cache), ctx)
}

/// A second resolve is served from the cache
#[tokio::test]
async fn test_second_resolve_uses_cache() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());
    let tokens = repository(&chain, &cache, ctx());

    let first = tokens.resolve(usdc(), TokenKind::Fungible).await.expect("first");
    assert_eq!(first, usdc_token());
    assert_eq!(chain.call_count("symbol"), 1);
    assert_eq!(chain.call_count("decimals"), 1);

    let second = tokens.resolve(usdc(), TokenKind::Fungible).await.expect("second");
    assert_eq!(second, first);
    assert_eq!(chain.call_count("symbol"), 1);
    assert_eq!(chain.call_count("decimals"), 1);
}

/// Repositories sharing a cache share entries; another chain id does not
#[tokio::test]
async fn test_cache_keyed_by_chain() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());

    repository(&chain, &cache, ctx())
        .resolve_collection(punk())
        .await
        .expect("mainnet");
    repository(&chain, &cache, ctx())
        .resolve_collection(punk())
        .await
        .expect("same chain");
    assert_eq!(chain.call_count("supportsInterface"), 1);

    let other_chain = ChainContext::new(5, router(), factory(), weth());
    let token = repository(&chain, &cache, other_chain)
        .resolve_collection(punk())
        .await
        .expect("other chain");
    assert_eq!(token, punk_token());
    assert_eq!(chain.call_count("supportsInterface"), 2);
}

/// A fungible token is not accepted as a collection, and its cached entry survives
#[tokio::test]
async fn test_fungible_address_rejected_as_collection() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());
    let tokens = repository(&chain, &cache, ctx());

    tokens.resolve_fungible(usdc()).await.expect("fungible");
    let err = tokens.resolve_collection(usdc()).await.unwrap_err();
    assert!(matches!(err, SwapError::InvalidParameters(_)), "error was {:?}", err);
    assert!(!err.is_retryable());
    assert_eq!(chain.call_count("supportsInterface"), 1);

    let again = tokens.resolve_fungible(usdc()).await.expect("cached");
    assert_eq!(again, usdc_token());
    assert_eq!(chain.call_count("decimals"), 1);
}

/// A collection has no decimals and is not accepted as a fungible token
#[tokio::test]
async fn test_collection_rejected_as_fungible() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());
    let tokens = repository(&chain, &cache, ctx());

    tokens.resolve_collection(punk()).await.expect("collection");
    let err = tokens.resolve(punk(), TokenKind::Fungible).await.unwrap_err();
    assert!(matches!(err, SwapError::InvalidParameters(_)), "error was {:?}", err);
}

/// The native currency comes from the context and never touches the chain
#[tokio::test]
async fn test_native_resolution() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());
    let tokens = repository(&chain, &cache, ctx());

    let native = tokens.resolve(weth(), TokenKind::Native).await.expect("native");
    assert_eq!(native, native_token());
    assert_eq!(native, tokens.native());
    assert_eq!(chain.call_count("symbol"), 0);
    assert_eq!(chain.call_count("decimals"), 0);
}

/// Transport failures stay retryable and are not cached
#[tokio::test]
async fn test_read_failure_not_cached() {
    let chain = Arc::new(MockChain::new());
    let cache = Arc::new(CacheManager::new());
    let tokens = repository(&chain, &cache, ctx());

    chain.fail_method("decimals");
    let err = tokens.resolve_fungible(weth()).await.unwrap_err();
    assert!(matches!(err, SwapError::ContractCall { .. }));
    assert!(err.is_retryable());

    chain.clear_failures();
    let token = tokens.resolve_fungible(weth()).await.expect("retry");
    assert_eq!(token, weth_token());
}
