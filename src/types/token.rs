use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminates how an asset is held and traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The chain's native currency; routed through the wrapped-native token
    Native,
    /// ERC20 asset with a continuous balance
    Fungible,
    /// ERC721 collection pooled as a per-unit asset
    Discrete,
}

/// Resolved asset metadata. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Contract address (`Address::zero()` for the native currency)
    pub address: Address,
    pub symbol: String,
    /// Base-unit decimals (0 for collections)
    pub decimals: u8,
    pub kind: TokenKind,
}

impl Token {
    pub fn native(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address: Address::zero(),
            symbol: symbol.into(),
            decimals,
            kind: TokenKind::Native,
        }
    }

    pub fn fungible(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            kind: TokenKind::Fungible,
        }
    }

    pub fn collection(address: Address, symbol: impl Into<String>) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals: 0,
            kind: TokenKind::Discrete,
        }
    }

    pub fn is_discrete(&self) -> bool {
        self.kind == TokenKind::Discrete
    }

    pub fn is_native(&self) -> bool {
        self.kind == TokenKind::Native
    }

    /// Address used in router paths and pair lookups.
    pub fn route_address(&self, wrapped_native: Address) -> Address {
        if self.is_native() {
            wrapped_native
        } else {
            self.address
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.symbol, self.address)
    }
}
