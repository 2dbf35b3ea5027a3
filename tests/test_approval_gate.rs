//! Approval gate against an in-memory chain
//!
//! Covers:
//! - Exact-equality allowances count as approved
//! - Approve, confirm, re-read cycle for ERC20 and collection operators
//! - Rejected and reverted approvals returning to `NeedsApproval`
//! - Max-mode approvals

mod common;

use collection_swap_sdk::approval::{AllowanceReading, ApprovalGate, ApprovalKey, ApprovalMode, ApprovalStatus};
use collection_swap_sdk::error::SwapError;
use common::*;
use ethers::types::U256;
use std::sync::Arc;

fn weth_key(amount: U256) -> ApprovalKey {
    ApprovalKey::erc20(user(), router(), weth(), amount, "WETH")
}

fn gate(chain: &Arc<MockChain>, key: ApprovalKey) -> ApprovalGate<MockChain> {
    let mut gate = ApprovalGate::new(Arc::clone(chain), ApprovalMode::Exact);
    gate.retarget(Some(key));
    gate
}

/// An allowance exactly equal to the requirement needs no approval
#[tokio::test]
async fn test_exact_allowance_is_sufficient() {
    let chain = Arc::new(MockChain::new());
    chain.set_allowance(weth(), user(), router(), eth(5));

    let mut gate = gate(&chain, weth_key(eth(5)));
    let status = gate.refresh().await.expect("read");

    assert_eq!(status, ApprovalStatus::Approved);
    assert!(!gate.needs_approval());
    assert_eq!(gate.current_allowance(), Some(AllowanceReading::Amount(eth(5))));
}

/// Nothing is known before the first read
#[tokio::test]
async fn test_unread_gate_does_not_claim_approval_needed() {
    let chain = Arc::new(MockChain::new());
    let gate = gate(&chain, weth_key(eth(1)));
    assert_eq!(*gate.status(), ApprovalStatus::Unknown);
    assert!(!gate.needs_approval());
    assert!(gate.is_loading());
}

/// After a confirmed approval the allowance covers the requirement
#[tokio::test]
async fn test_approve_then_confirm() {
    let chain = Arc::new(MockChain::new());
    chain.set_allowance(weth(), user(), router(), eth(1));

    let mut gate = gate(&chain, weth_key(eth(3)));
    assert_eq!(gate.refresh().await.expect("read"), ApprovalStatus::NeedsApproval);

    let tx = gate.submit_approval().await.expect("submitted");
    assert_eq!(*gate.status(), ApprovalStatus::Confirming { tx });
    assert!(gate.is_busy());

    let status = gate.confirm_approval().await.expect("confirmed");
    assert_eq!(status, ApprovalStatus::Approved);
    assert!(chain.allowance(weth(), user(), router()) >= eth(3));

    let (from, call) = &chain.sent()[0];
    assert_eq!(*from, user());
    assert_eq!(call.to, weth());
    assert_eq!(call.method, "approve");
}

/// A rejected signature leaves the gate ready to try again
#[tokio::test]
async fn test_rejected_approval_returns_to_needs_approval() {
    let chain = Arc::new(MockChain::new());
    let mut gate = gate(&chain, weth_key(eth(1)));
    gate.refresh().await.expect("read");

    chain.reject_next_send();
    let err = gate.submit_approval().await.unwrap_err();

    assert!(matches!(err, SwapError::ApprovalFailed(_)));
    assert_eq!(*gate.status(), ApprovalStatus::NeedsApproval);
    assert!(gate.last_error().is_some());

    // Second attempt goes through
    gate.approve_and_confirm().await.expect("approved");
    assert!(gate.is_approved());
}

/// A reverted approval does not change the allowance
#[tokio::test]
async fn test_reverted_approval() {
    let chain = Arc::new(MockChain::new());
    let mut gate = gate(&chain, weth_key(eth(1)));
    gate.refresh().await.expect("read");

    chain.revert_next_tx();
    gate.submit_approval().await.expect("submitted");
    let err = gate.confirm_approval().await.unwrap_err();

    assert!(matches!(err, SwapError::ApprovalFailed(_)));
    assert_eq!(*gate.status(), ApprovalStatus::NeedsApproval);
    assert_eq!(chain.allowance(weth(), user(), router()), U256::zero());
}

/// Submitting is refused unless a read showed the allowance short
#[tokio::test]
async fn test_submit_requires_needs_approval() {
    let chain = Arc::new(MockChain::new());
    chain.set_allowance(weth(), user(), router(), eth(10));
    let mut gate = gate(&chain, weth_key(eth(1)));
    gate.refresh().await.expect("read");

    assert!(gate.submit_approval().await.is_err());
    assert!(chain.sent().is_empty());
}

/// Collections are approved through operator approval
#[tokio::test]
async fn test_collection_operator_approval() {
    let chain = Arc::new(MockChain::new());
    let key = ApprovalKey::collection(user(), router(), punk(), "PUNK");
    let mut gate = gate(&chain, key);

    assert_eq!(gate.refresh().await.expect("read"), ApprovalStatus::NeedsApproval);
    let status = gate.approve_and_confirm().await.expect("approved");

    assert_eq!(status, ApprovalStatus::Approved);
    assert_eq!(gate.current_allowance(), Some(AllowanceReading::Operator(true)));
    assert_eq!(chain.sent()[0].1.method, "setApprovalForAll");
}

/// Max mode approves the full range instead of the requirement
#[tokio::test]
async fn test_max_mode() {
    let chain = Arc::new(MockChain::new());
    let mut gate = gate(&chain, weth_key(eth(2)));
    gate.set_mode(ApprovalMode::Max);
    gate.refresh().await.expect("read");

    gate.approve_and_confirm().await.expect("approved");
    assert_eq!(chain.allowance(weth(), user(), router()), U256::MAX);
}

/// Retargeting to a different requirement forgets the previous reading
#[tokio::test]
async fn test_retarget_resets_status() {
    let chain = Arc::new(MockChain::new());
    chain.set_allowance(weth(), user(), router(), eth(2));
    let mut gate = gate(&chain, weth_key(eth(2)));
    gate.refresh().await.expect("read");
    assert!(gate.is_approved());

    gate.retarget(Some(weth_key(eth(3))));
    assert_eq!(*gate.status(), ApprovalStatus::Unknown);
    assert_eq!(gate.refresh().await.expect("read"), ApprovalStatus::NeedsApproval);
}

/// Read failures keep the status unknown and are surfaced
#[tokio::test]
async fn test_read_failure_is_reported() {
    let chain = Arc::new(MockChain::new());
    chain.fail_method("allowance");
    let mut gate = gate(&chain, weth_key(eth(1)));

    assert!(gate.refresh().await.is_err());
    assert_eq!(*gate.status(), ApprovalStatus::Unknown);
    assert!(gate.read_error().is_some());
}
