//! # Approval Gate
//!
//! Tracks whether the router may move one asset on the user's behalf and drives the
//! approval transaction when it may not.
//!
//! ## State machine
//!
//! ```text
//! Unknown ──read──▶ Approved
//!    │                 ▲
//!    └──read──▶ NeedsApproval ──submit──▶ Approving ──broadcast──▶ Confirming ──receipt + re-read──┘
//!                      ▲                       │                         │
//!                      └──────── rejected ─────┴──────── reverted ───────┘
//! ```
//!
//! Changing the owner, spender, token or required amount resets the gate to `Unknown`
//! and supersedes any in-flight allowance read. Failures never retry automatically.

use crate::chain::{ChainClient, PreparedCall};
use crate::error::SwapError;
use crate::flow::calls::{erc20_approve_call, set_approval_for_all_call};
use crate::flow::node::{Node, Ticket};
use crate::metrics;
use ethers::types::{Address, TxHash, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the spender must be allowed to move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTarget {
    /// ERC20 allowance of at least `amount`
    Erc20 { token: Address, amount: U256 },
    /// ERC721 operator approval over the whole collection
    Collection { collection: Address },
}

/// Which button an outstanding approval maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPurpose {
    Asset,
    LpShare,
}

/// Identity of one approval requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ApprovalKey {
    pub owner: Address,
    pub spender: Address,
    pub target: ApprovalTarget,
    pub purpose: ApprovalPurpose,
    /// Symbol shown in the approve button
    pub symbol: String,
}

impl ApprovalKey {
    pub fn erc20(owner: Address, spender: Address, token: Address, amount: U256, symbol: impl Into<String>) -> Self {
        Self {
            owner,
            spender,
            target: ApprovalTarget::Erc20 { token, amount },
            purpose: ApprovalPurpose::Asset,
            symbol: symbol.into(),
        }
    }

    pub fn collection(owner: Address, operator: Address, collection: Address, symbol: impl Into<String>) -> Self {
        Self {
            owner,
            spender: operator,
            target: ApprovalTarget::Collection { collection },
            purpose: ApprovalPurpose::Asset,
            symbol: symbol.into(),
        }
    }

    pub fn lp_share(mut self) -> Self {
        self.purpose = ApprovalPurpose::LpShare;
        self
    }

    pub fn required_amount(&self) -> Option<U256> {
        match self.target {
            ApprovalTarget::Erc20 { amount, .. } => Some(amount),
            ApprovalTarget::Collection { .. } => None,
        }
    }

    /// `allowance >= required`; equality counts as approved.
    pub fn is_satisfied_by(&self, reading: &AllowanceReading) -> bool {
        match (&self.target, reading) {
            (ApprovalTarget::Erc20 { amount, .. }, AllowanceReading::Amount(allowance)) => allowance >= amount,
            (ApprovalTarget::Collection { .. }, AllowanceReading::Operator(approved)) => *approved,
            _ => false,
        }
    }
}

/// On-chain allowance as read for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowanceReading {
    Amount(U256),
    Operator(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Approve exactly the required amount
    #[default]
    Exact,
    /// Approve `U256::MAX`
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ApprovalStatus {
    Unknown,
    Approved,
    NeedsApproval,
    Approving,
    Confirming { tx: TxHash },
}

/// Reads the allowance for `key` without holding the gate.
pub async fn read_allowance<C: ChainClient + ?Sized>(client: &C, key: &ApprovalKey) -> Result<AllowanceReading, SwapError> {
    match key.target {
        ApprovalTarget::Erc20 { token, .. } => client
            .erc20_allowance(token, key.owner, key.spender)
            .await
            .map(AllowanceReading::Amount)
            .map_err(|e| SwapError::contract_call("allowance", e)),
        ApprovalTarget::Collection { collection } => client
            .is_approved_for_all(collection, key.owner, key.spender)
            .await
            .map(AllowanceReading::Operator)
            .map_err(|e| SwapError::contract_call("isApprovedForAll", e)),
    }
}

/// An allowance read detached from the gate, applied back with [`ApprovalGate::complete_read`].
pub struct AllowanceJob<C: ChainClient> {
    client: Arc<C>,
    key: ApprovalKey,
    ticket: Ticket,
}

impl<C: ChainClient> AllowanceJob<C> {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub async fn run(self) -> (Ticket, Result<AllowanceReading, SwapError>) {
        let result = read_allowance(self.client.as_ref(), &self.key).await;
        (self.ticket, result)
    }
}

/// Approval state machine for a single [`ApprovalKey`].
pub struct ApprovalGate<C: ChainClient> {
    client: Arc<C>,
    mode: ApprovalMode,
    key: Option<ApprovalKey>,
    allowance: Node<AllowanceReading>,
    status: ApprovalStatus,
    last_error: Option<SwapError>,
}

impl<C: ChainClient> ApprovalGate<C> {
    pub fn new(client: Arc<C>, mode: ApprovalMode) -> Self {
        Self {
            client,
            mode,
            key: None,
            allowance: Node::new("allowance"),
            status: ApprovalStatus::Unknown,
            last_error: None,
        }
    }

    pub fn key(&self) -> Option<&ApprovalKey> {
        self.key.as_ref()
    }

    pub fn status(&self) -> &ApprovalStatus {
        &self.status
    }

    pub fn mode(&self) -> ApprovalMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ApprovalMode) {
        self.mode = mode;
    }

    pub fn last_error(&self) -> Option<&SwapError> {
        self.last_error.as_ref()
    }

    /// Last allowance read for the current key.
    pub fn current_allowance(&self) -> Option<AllowanceReading> {
        self.allowance.ready().copied()
    }

    /// `true` only once a read shows the allowance below the requirement.
    pub fn needs_approval(&self) -> bool {
        match (&self.key, self.allowance.ready()) {
            (Some(key), Some(reading)) => !key.is_satisfied_by(reading),
            _ => false,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.status,
            ApprovalStatus::Approving | ApprovalStatus::Confirming { .. }
        )
    }

    /// Points the gate at a new requirement. A changed key resets to `Unknown`.
    pub fn retarget(&mut self, key: Option<ApprovalKey>) {
        if self.key == key {
            return;
        }
        debug!(?key, "approval gate retargeted");
        self.key = key;
        self.allowance.invalidate();
        self.status = ApprovalStatus::Unknown;
        self.last_error = None;
    }

    /// Forgets the last reading for the same key, e.g. after a transaction spent allowance.
    pub fn invalidate(&mut self) {
        if self.is_busy() {
            return;
        }
        self.allowance.invalidate();
        self.status = ApprovalStatus::Unknown;
    }

    /// Starts an allowance read for the current key.
    pub fn begin_read(&mut self) -> Option<AllowanceJob<C>> {
        let key = self.key.clone()?;
        let ticket = self.allowance.begin();
        Some(AllowanceJob {
            client: Arc::clone(&self.client),
            key,
            ticket,
        })
    }

    /// Applies a finished read. Stale reads are dropped and return `false`.
    pub fn complete_read(&mut self, ticket: Ticket, result: Result<AllowanceReading, SwapError>) -> bool {
        let failed = result.as_ref().err().cloned();
        if !self.allowance.complete(ticket, result) {
            return false;
        }
        if let Some(e) = failed {
            warn!(error = %e, "allowance read failed");
            self.status = ApprovalStatus::Unknown;
            self.last_error = Some(e);
            return true;
        }
        if !self.is_busy() {
            self.status = if self.needs_approval() {
                ApprovalStatus::NeedsApproval
            } else {
                ApprovalStatus::Approved
            };
        }
        true
    }

    /// Reads the allowance and settles the status.
    pub async fn refresh(&mut self) -> Result<ApprovalStatus, SwapError> {
        let job = match self.begin_read() {
            Some(job) => job,
            None => return Ok(self.status.clone()),
        };
        let (ticket, result) = job.run().await;
        self.complete_read(ticket, result);
        match self.allowance.error() {
            Some(e) => Err(e.clone()),
            None => Ok(self.status.clone()),
        }
    }

    /// Allowance-read failure for the current key, if any.
    pub fn read_error(&self) -> Option<&SwapError> {
        self.allowance.error()
    }

    pub fn is_loading(&self) -> bool {
        self.key.is_some() && (self.allowance.is_loading() || self.allowance.is_idle())
    }

    /// Encoded approval for the current key and mode.
    pub fn prepare_approval(&self) -> Result<PreparedCall, SwapError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| SwapError::ApprovalFailed("nothing to approve".to_string()))?;
        match key.target {
            ApprovalTarget::Erc20 { token, amount } => {
                let amount = match self.mode {
                    ApprovalMode::Exact => amount,
                    ApprovalMode::Max => U256::MAX,
                };
                erc20_approve_call(token, key.spender, amount)
            }
            ApprovalTarget::Collection { collection } => set_approval_for_all_call(collection, key.spender, true),
        }
    }

    /// Broadcasts the approval. Only valid in `NeedsApproval`.
    pub async fn submit_approval(&mut self) -> Result<TxHash, SwapError> {
        if self.status != ApprovalStatus::NeedsApproval {
            return Err(SwapError::ApprovalFailed(format!(
                "cannot approve while {:?}",
                self.status
            )));
        }
        let call = self.prepare_approval()?;
        let owner = self.key.as_ref().map(|k| k.owner).unwrap_or_default();

        self.status = ApprovalStatus::Approving;
        self.last_error = None;
        match self.client.send_transaction(owner, call).await {
            Ok(tx) => {
                info!(?tx, "approval submitted");
                metrics::increment_transaction("approve", "submitted");
                self.status = ApprovalStatus::Confirming { tx };
                Ok(tx)
            }
            Err(e) => {
                metrics::increment_transaction("approve", "rejected");
                Err(self.fail(format!("{:#}", e)))
            }
        }
    }

    /// Waits for the pending approval and re-reads the allowance.
    pub async fn confirm_approval(&mut self) -> Result<ApprovalStatus, SwapError> {
        let tx = match self.status {
            ApprovalStatus::Confirming { tx } => tx,
            _ => return Ok(self.status.clone()),
        };

        let outcome = match self.client.wait_for_receipt(tx).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(format!("{:#}", e))),
        };
        if !outcome.success {
            metrics::increment_transaction("approve", "reverted");
            return Err(self.fail(format!("approval {:?} reverted", tx)));
        }
        metrics::increment_transaction("approve", "confirmed");

        // Leave the busy state so the re-read settles the status
        self.status = ApprovalStatus::Unknown;
        let status = self.refresh().await?;
        if status == ApprovalStatus::NeedsApproval {
            warn!(?tx, "allowance still short after confirmed approval");
        }
        Ok(status)
    }

    pub async fn approve_and_confirm(&mut self) -> Result<ApprovalStatus, SwapError> {
        self.submit_approval().await?;
        self.confirm_approval().await
    }

    fn fail(&mut self, reason: String) -> SwapError {
        warn!(%reason, "approval failed");
        let err = SwapError::ApprovalFailed(reason);
        self.status = ApprovalStatus::NeedsApproval;
        self.last_error = Some(err.clone());
        err
    }
}
