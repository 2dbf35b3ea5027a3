//! # Transaction Flows
//!
//! Explicit state machine behind the single user-facing decision of a flow.
//!
//! The orchestrator gathers a [`FlowInputs`] snapshot from its derived nodes;
//! [`evaluate`] reduces it to one authoritative [`FlowState`] using a strict priority
//! order, and [`FlowState::project`] turns that into `{action, enabled, label}`.
//! Both steps are pure.

pub mod calls;
pub mod node;
pub mod plan;
pub mod tracker;

pub use calls::RouterCall;
pub use node::{Derived, Node, Ticket};
pub use plan::GatedPlan;
pub use tracker::{TransactionPhase, TransactionTracker};

use crate::approval::ApprovalPurpose;
use ethers::types::TxHash;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
}

impl FlowKind {
    pub fn action(&self) -> FlowAction {
        match self {
            FlowKind::Swap => FlowAction::Swap,
            FlowKind::AddLiquidity => FlowAction::AddLiquidity,
            FlowKind::RemoveLiquidity => FlowAction::RemoveLiquidity,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            FlowKind::Swap => "Swap",
            FlowKind::AddLiquidity => "Add Liquidity",
            FlowKind::RemoveLiquidity => "Remove Liquidity",
        }
    }

    fn progressive(&self) -> &'static str {
        match self {
            FlowKind::Swap => "Swapping...",
            FlowKind::AddLiquidity => "Adding Liquidity...",
            FlowKind::RemoveLiquidity => "Removing Liquidity...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowAction {
    Connect,
    Approve,
    ApproveLpToken,
    Swap,
    AddLiquidity,
    RemoveLiquidity,
}

impl FlowAction {
    pub fn is_value_moving(&self) -> bool {
        matches!(
            self,
            FlowAction::Swap | FlowAction::AddLiquidity | FlowAction::RemoveLiquidity
        )
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, FlowAction::Approve | FlowAction::ApproveLpToken)
    }
}

/// The one decision a flow exposes per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowDecision {
    pub action: FlowAction,
    pub enabled: bool,
    pub label: String,
}

/// Readiness of an upstream dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Loading,
    Failed(String),
    Ready,
}

impl Gate {
    /// `self` if not ready, otherwise `next`.
    pub fn and(self, next: Gate) -> Gate {
        match self {
            Gate::Ready => next,
            other => other,
        }
    }
}

/// First approval the flow still waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    pub purpose: ApprovalPurpose,
    pub symbol: String,
    /// Approval transaction already submitted or confirming
    pub busy: bool,
}

/// Snapshot of everything the decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInputs {
    pub kind: FlowKind,
    pub connected: bool,
    /// Prompt for the first missing selection
    pub missing_selection: Option<String>,
    /// Pool, route and quote readiness
    pub route: Gate,
    /// `Some(false)` when the pool a flow needs is known not to exist
    pub pool_exists: Option<bool>,
    pub validation: Gate,
    pub approvals: Gate,
    pub pending_approval: Option<PendingApproval>,
    pub transaction: TransactionPhase,
}

/// The single authoritative state of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FlowState {
    /// No connected account
    Idle,
    SelectingInputs { prompt: String },
    /// Reads still in flight
    Validating,
    /// Blocked until the inputs or chain state change
    Invalid { reason: String },
    NeedsApproval { purpose: ApprovalPurpose, symbol: String },
    Approving { purpose: ApprovalPurpose, symbol: String },
    ReadyToExecute,
    Executing,
    Confirming { tx: TxHash },
    Done { tx: TxHash },
    Failed { reason: String },
}

/// Reduces `inputs` to a state. Earlier rules win.
pub fn evaluate(inputs: &FlowInputs) -> FlowState {
    if !inputs.connected {
        return FlowState::Idle;
    }

    // A broadcast transaction outranks everything else
    match &inputs.transaction {
        TransactionPhase::Pending => return FlowState::Executing,
        TransactionPhase::Confirming { tx } => return FlowState::Confirming { tx: *tx },
        TransactionPhase::Confirmed { tx, .. } => return FlowState::Done { tx: *tx },
        TransactionPhase::Idle | TransactionPhase::Failed { .. } => {}
    }

    if let Some(prompt) = &inputs.missing_selection {
        return FlowState::SelectingInputs { prompt: prompt.clone() };
    }

    match &inputs.route {
        Gate::Loading => return FlowState::Validating,
        Gate::Failed(reason) => return FlowState::Invalid { reason: reason.clone() },
        Gate::Ready => {}
    }

    if inputs.kind == FlowKind::RemoveLiquidity && inputs.pool_exists == Some(false) {
        return FlowState::Invalid {
            reason: "No pool found".to_string(),
        };
    }

    match &inputs.validation {
        Gate::Loading => return FlowState::Validating,
        Gate::Failed(reason) => return FlowState::Invalid { reason: reason.clone() },
        Gate::Ready => {}
    }

    if let Some(pending) = &inputs.pending_approval {
        return if pending.busy {
            FlowState::Approving {
                purpose: pending.purpose,
                symbol: pending.symbol.clone(),
            }
        } else {
            FlowState::NeedsApproval {
                purpose: pending.purpose,
                symbol: pending.symbol.clone(),
            }
        };
    }
    match &inputs.approvals {
        Gate::Loading => return FlowState::Validating,
        Gate::Failed(reason) => return FlowState::Invalid { reason: reason.clone() },
        Gate::Ready => {}
    }

    if let TransactionPhase::Failed { reason } = &inputs.transaction {
        return FlowState::Failed { reason: reason.clone() };
    }
    FlowState::ReadyToExecute
}

impl FlowState {
    pub fn project(&self, kind: FlowKind) -> FlowDecision {
        let main = kind.action();
        let (action, enabled, label) = match self {
            FlowState::Idle => (FlowAction::Connect, true, "Connect Wallet".to_string()),
            FlowState::SelectingInputs { prompt } => (main, false, prompt.clone()),
            FlowState::Validating => (main, false, "Loading...".to_string()),
            FlowState::Invalid { reason } => (main, false, reason.clone()),
            FlowState::NeedsApproval { purpose, symbol } => (approval_action(*purpose), true, format!("Approve {}", symbol)),
            FlowState::Approving { purpose, symbol } => {
                (approval_action(*purpose), false, format!("Approving {}...", symbol))
            }
            FlowState::ReadyToExecute => (main, true, kind.verb().to_string()),
            FlowState::Executing => (main, false, kind.progressive().to_string()),
            FlowState::Confirming { .. } => (main, false, "Confirming...".to_string()),
            FlowState::Done { .. } => (main, false, "Transaction confirmed".to_string()),
            FlowState::Failed { reason } => (main, true, format!("{}. Try again", reason)),
        };
        FlowDecision { action, enabled, label }
    }
}

fn approval_action(purpose: ApprovalPurpose) -> FlowAction {
    match purpose {
        ApprovalPurpose::Asset => FlowAction::Approve,
        ApprovalPurpose::LpShare => FlowAction::ApproveLpToken,
    }
}
