pub mod conversions;
pub mod swap;
pub mod token;

pub use swap::{
    validate_token_ids, AddLiquidityParameters, RemoveLiquidityParameters, SwapParameters,
    SwapType,
};
pub use token::{Token, TokenKind};
