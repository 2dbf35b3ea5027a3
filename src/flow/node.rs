//! Pull-based derived values with a stale-result guard.
//!
//! A [`Node`] holds one derived value (route, quote, balance check, ...). Starting a
//! read hands out a [`Ticket`]; any later `begin` or `invalidate` supersedes it, and
//! completing with a superseded ticket is a no-op.

use crate::error::SwapError;
use crate::metrics;
use tracing::debug;

/// Proof of which input revision an in-flight read was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    node: &'static str,
    revision: u64,
}

impl Ticket {
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Lifecycle of a derived value. `Loading` is not a failure.
#[derive(Debug, Clone)]
pub enum Derived<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(SwapError),
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Derived::Idle
    }
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    name: &'static str,
    revision: u64,
    value: Derived<T>,
}

impl<T> Node<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            revision: 0,
            value: Derived::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drops the current value and supersedes any in-flight read.
    pub fn invalidate(&mut self) {
        self.revision += 1;
        self.value = Derived::Idle;
    }

    /// Marks the node loading and returns the ticket the result must be applied with.
    pub fn begin(&mut self) -> Ticket {
        self.revision += 1;
        self.value = Derived::Loading;
        Ticket {
            node: self.name,
            revision: self.revision,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.node == self.name && ticket.revision == self.revision
    }

    /// Applies a finished read. Returns `false` and leaves the node untouched when stale.
    pub fn complete(&mut self, ticket: Ticket, result: Result<T, SwapError>) -> bool {
        if !self.is_current(&ticket) {
            debug!(
                node = self.name,
                ticket = ticket.revision,
                current = self.revision,
                "discarding stale result"
            );
            metrics::increment_stale_discard(self.name);
            return false;
        }
        self.value = match result {
            Ok(value) => Derived::Ready(value),
            Err(e) => Derived::Failed(e),
        };
        true
    }

    /// Sets a value computed synchronously.
    pub fn set(&mut self, result: Result<T, SwapError>) {
        let ticket = self.begin();
        self.complete(ticket, result);
    }

    pub fn value(&self) -> &Derived<T> {
        &self.value
    }

    pub fn ready(&self) -> Option<&T> {
        match &self.value {
            Derived::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SwapError> {
        match &self.value {
            Derived::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.value, Derived::Loading)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.value, Derived::Idle)
    }
}
