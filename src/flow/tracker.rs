use crate::chain::TxOutcome;
use chrono::{DateTime, Utc};
use ethers::types::TxHash;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Local view of one value-moving transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum TransactionPhase {
    Idle,
    /// Waiting for the wallet to sign and broadcast
    Pending,
    Confirming { tx: TxHash },
    Confirmed { tx: TxHash, block_number: Option<u64> },
    Failed { reason: String },
}

/// Tracks the in-flight transaction of a flow.
///
/// Every attempt gets a fresh id for log correlation. The tracker is reset, never reused,
/// when the flow's parameters change; a reset does not cancel a broadcast transaction.
#[derive(Debug, Clone)]
pub struct TransactionTracker {
    phase: TransactionPhase,
    attempt: Option<Uuid>,
    method: Option<&'static str>,
    started_at: Option<DateTime<Utc>>,
}

impl Default for TransactionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionTracker {
    pub fn new() -> Self {
        Self {
            phase: TransactionPhase::Idle,
            attempt: None,
            method: None,
            started_at: None,
        }
    }

    pub fn phase(&self) -> &TransactionPhase {
        &self.phase
    }

    pub fn attempt(&self) -> Option<Uuid> {
        self.attempt
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.phase,
            TransactionPhase::Pending | TransactionPhase::Confirming { .. }
        )
    }

    pub fn reset(&mut self) {
        if let (true, Some(attempt)) = (self.is_in_flight(), self.attempt) {
            warn!(%attempt, "tracking reset while a transaction is in flight");
        }
        *self = Self::new();
    }

    /// Opens a new attempt. Returns `None` while another attempt is in flight.
    pub fn start(&mut self, method: &'static str) -> Option<Uuid> {
        if self.is_in_flight() {
            return None;
        }
        let attempt = Uuid::new_v4();
        self.phase = TransactionPhase::Pending;
        self.attempt = Some(attempt);
        self.method = Some(method);
        self.started_at = Some(Utc::now());
        info!(%attempt, method, "transaction attempt started");
        Some(attempt)
    }

    pub fn submitted(&mut self, tx: TxHash) {
        if self.phase == TransactionPhase::Pending {
            info!(attempt = ?self.attempt, ?tx, "transaction broadcast");
            self.phase = TransactionPhase::Confirming { tx };
        }
    }

    pub fn finished(&mut self, outcome: &TxOutcome) {
        self.phase = if outcome.success {
            info!(attempt = ?self.attempt, tx = ?outcome.hash, block = ?outcome.block_number, "transaction confirmed");
            TransactionPhase::Confirmed {
                tx: outcome.hash,
                block_number: outcome.block_number,
            }
        } else {
            warn!(attempt = ?self.attempt, tx = ?outcome.hash, "transaction reverted");
            TransactionPhase::Failed {
                reason: format!("transaction {:?} reverted", outcome.hash),
            }
        };
    }

    pub fn failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(attempt = ?self.attempt, method = ?self.method, %reason, "transaction failed");
        self.phase = TransactionPhase::Failed { reason };
    }

    pub fn pending_tx(&self) -> Option<TxHash> {
        match self.phase {
            TransactionPhase::Confirming { tx } => Some(tx),
            _ => None,
        }
    }
}
