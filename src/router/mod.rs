//! # Router Module
//!
//! Routing primitives for collection swaps: a [`Route`] is the ordered router path
//! between a fungible asset and a collection, either touching one pool or two pools
//! joined by the chain's intermediary. [`RouteResolver`] decides which.

pub mod resolver;

pub use resolver::RouteResolver;

use ethers::prelude::Address;
use serde::{Deserialize, Serialize};

/// Number of pools a route touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Direct,
    MultiHop,
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Direct => write!(f, "direct"),
            RouteKind::MultiHop => write!(f, "multi_hop"),
        }
    }
}

/// A resolved router path.
///
/// Direct routes hold two addresses, multi-hop routes three with the intermediary
/// in the middle. Addresses are route addresses, so a native leg appears as the
/// wrapped-native token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<Address>,
    pub kind: RouteKind,
}

impl Route {
    pub fn direct(from: Address, to: Address) -> Self {
        Self {
            path: vec![from, to],
            kind: RouteKind::Direct,
        }
    }

    pub fn multi_hop(from: Address, intermediary: Address, to: Address) -> Self {
        Self {
            path: vec![from, intermediary, to],
            kind: RouteKind::MultiHop,
        }
    }

    pub fn is_multi_hop(&self) -> bool {
        self.kind == RouteKind::MultiHop
    }

    pub fn from(&self) -> Address {
        self.path[0]
    }

    pub fn to(&self) -> Address {
        self.path[self.path.len() - 1]
    }

    pub fn intermediary(&self) -> Option<Address> {
        if self.is_multi_hop() {
            Some(self.path[1])
        } else {
            None
        }
    }

    /// `(token_in, token_out)` per pool, in path order.
    pub fn legs(&self) -> Vec<(Address, Address)> {
        self.path.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Identifier built from the path, used for logs.
    pub fn get_id(&self) -> String {
        self.path
            .iter()
            .map(|a| format!("{:?}", a))
            .collect::<Vec<_>>()
            .join("-")
    }
}
