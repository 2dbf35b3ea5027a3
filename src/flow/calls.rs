//! Router write-call selection and encoding.

use crate::chain::PreparedCall;
use crate::contracts::{ERC20_INTERFACE, ERC721_INTERFACE, ROUTER_INTERFACE};
use crate::error::SwapError;
use crate::quote::SwapQuote;
use crate::types::{AddLiquidityParameters, RemoveLiquidityParameters, SwapParameters, SwapType};
use ethers::abi::Tokenize;
use ethers::contract::BaseContract;
use ethers::types::{Address, U256};
use serde::Serialize;

/// One value-moving router call, with its slippage bound already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "function")]
pub enum RouterCall {
    SwapTokensForExactTokensCollection {
        token_ids_out: Vec<U256>,
        amount_in_max: U256,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    },
    SwapExactTokensForTokensCollection {
        token_ids_in: Vec<U256>,
        amount_out_min: U256,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    },
    /// Sends `amount_in_max` as value
    SwapEthForExactTokensCollection {
        token_ids_out: Vec<U256>,
        amount_in_max: U256,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    },
    SwapExactTokensForEthCollection {
        token_ids_in: Vec<U256>,
        amount_out_min: U256,
        path: Vec<Address>,
        cap_royalty_fee: bool,
    },
    AddLiquidityCollection {
        token_a: Address,
        collection_b: Address,
        amount_a_desired: U256,
        token_ids_b: Vec<U256>,
        amount_a_min: U256,
    },
    /// Sends `eth_amount` as value
    AddLiquidityEthCollection {
        collection: Address,
        token_ids: Vec<U256>,
        amount_eth_min: U256,
        eth_amount: U256,
    },
    /// Submitted with `amountAMin = 0`
    RemoveLiquidityCollection {
        token_a: Address,
        collection_b: Address,
        liquidity: U256,
        token_ids_b: Vec<U256>,
    },
    /// Submitted with `amountETHMin = 0`
    RemoveLiquidityEthCollection {
        collection: Address,
        liquidity: U256,
        token_ids: Vec<U256>,
    },
}

/// Minimum-out used for every liquidity removal, independent of slippage settings.
pub fn removal_min_amount() -> U256 {
    U256::zero()
}

impl RouterCall {
    /// Picks the swap function for `params` and bounds it with `quote`.
    pub fn for_swap(params: &SwapParameters, quote: &SwapQuote) -> Result<Self, SwapError> {
        let ids = params.ids().to_vec();
        let path = quote.route.path.clone();
        let cap_royalty_fee = params.cap_royalty_fee;

        match params.swap_type() {
            SwapType::ExactOutputCollection => {
                let amount_in_max = quote.maximum_sent().ok_or_else(|| {
                    SwapError::InvalidParameters("quote has no maximum sent bound".to_string())
                })?;
                if params.from_token.is_native() {
                    Ok(RouterCall::SwapEthForExactTokensCollection {
                        token_ids_out: ids,
                        amount_in_max,
                        path,
                        cap_royalty_fee,
                    })
                } else {
                    Ok(RouterCall::SwapTokensForExactTokensCollection {
                        token_ids_out: ids,
                        amount_in_max,
                        path,
                        cap_royalty_fee,
                    })
                }
            }
            SwapType::ExactInputCollection => {
                let amount_out_min = quote.minimum_received().ok_or_else(|| {
                    SwapError::InvalidParameters("quote has no minimum received bound".to_string())
                })?;
                if params.to_token.is_native() {
                    Ok(RouterCall::SwapExactTokensForEthCollection {
                        token_ids_in: ids,
                        amount_out_min,
                        path,
                        cap_royalty_fee,
                    })
                } else {
                    Ok(RouterCall::SwapExactTokensForTokensCollection {
                        token_ids_in: ids,
                        amount_out_min,
                        path,
                        cap_royalty_fee,
                    })
                }
            }
            SwapType::Continuous => Err(SwapError::UnsupportedSwapType(
                "continuous swaps have no collection router call".to_string(),
            )),
        }
    }

    pub fn for_add_liquidity(params: &AddLiquidityParameters) -> Self {
        let minimum = params.slippage.minimum_received(params.amount_desired);
        if params.token.is_native() {
            RouterCall::AddLiquidityEthCollection {
                collection: params.collection.address,
                token_ids: params.token_ids.clone(),
                amount_eth_min: minimum,
                eth_amount: params.amount_desired,
            }
        } else {
            RouterCall::AddLiquidityCollection {
                token_a: params.token.address,
                collection_b: params.collection.address,
                amount_a_desired: params.amount_desired,
                token_ids_b: params.token_ids.clone(),
                amount_a_min: minimum,
            }
        }
    }

    pub fn for_remove_liquidity(params: &RemoveLiquidityParameters) -> Self {
        if params.token.is_native() {
            RouterCall::RemoveLiquidityEthCollection {
                collection: params.collection.address,
                liquidity: params.liquidity,
                token_ids: params.token_ids.clone(),
            }
        } else {
            RouterCall::RemoveLiquidityCollection {
                token_a: params.token.address,
                collection_b: params.collection.address,
                liquidity: params.liquidity,
                token_ids_b: params.token_ids.clone(),
            }
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            RouterCall::SwapTokensForExactTokensCollection { .. } => "swapTokensForExactTokensCollection",
            RouterCall::SwapExactTokensForTokensCollection { .. } => "swapExactTokensForTokensCollection",
            RouterCall::SwapEthForExactTokensCollection { .. } => "swapETHForExactTokensCollection",
            RouterCall::SwapExactTokensForEthCollection { .. } => "swapExactTokensForETHCollection",
            RouterCall::AddLiquidityCollection { .. } => "addLiquidityCollection",
            RouterCall::AddLiquidityEthCollection { .. } => "addLiquidityETHCollection",
            RouterCall::RemoveLiquidityCollection { .. } => "removeLiquidityCollection",
            RouterCall::RemoveLiquidityEthCollection { .. } => "removeLiquidityETHCollection",
        }
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        match self {
            RouterCall::SwapEthForExactTokensCollection { amount_in_max, .. } => *amount_in_max,
            RouterCall::AddLiquidityEthCollection { eth_amount, .. } => *eth_amount,
            _ => U256::zero(),
        }
    }

    /// Encodes the call for `router`, sending proceeds to `to`.
    pub fn prepare(&self, router: Address, to: Address, deadline: u64) -> Result<PreparedCall, SwapError> {
        let deadline = U256::from(deadline);
        let method = self.method();
        let iface = &*ROUTER_INTERFACE;

        let data = match self.clone() {
            RouterCall::SwapTokensForExactTokensCollection {
                token_ids_out,
                amount_in_max,
                path,
                cap_royalty_fee,
            } => encode(iface, method, (token_ids_out, amount_in_max, path, cap_royalty_fee, to, deadline))?,
            RouterCall::SwapExactTokensForTokensCollection {
                token_ids_in,
                amount_out_min,
                path,
                cap_royalty_fee,
            } => encode(iface, method, (token_ids_in, amount_out_min, path, cap_royalty_fee, to, deadline))?,
            RouterCall::SwapEthForExactTokensCollection {
                token_ids_out,
                path,
                cap_royalty_fee,
                ..
            } => encode(iface, method, (token_ids_out, path, cap_royalty_fee, to, deadline))?,
            RouterCall::SwapExactTokensForEthCollection {
                token_ids_in,
                amount_out_min,
                path,
                cap_royalty_fee,
            } => encode(iface, method, (token_ids_in, amount_out_min, path, cap_royalty_fee, to, deadline))?,
            RouterCall::AddLiquidityCollection {
                token_a,
                collection_b,
                amount_a_desired,
                token_ids_b,
                amount_a_min,
            } => encode(
                iface,
                method,
                (token_a, collection_b, amount_a_desired, token_ids_b, amount_a_min, to, deadline),
            )?,
            RouterCall::AddLiquidityEthCollection {
                collection,
                token_ids,
                amount_eth_min,
                ..
            } => encode(iface, method, (collection, token_ids, amount_eth_min, to, deadline))?,
            RouterCall::RemoveLiquidityCollection {
                token_a,
                collection_b,
                liquidity,
                token_ids_b,
            } => encode(
                iface,
                method,
                (token_a, collection_b, liquidity, token_ids_b, removal_min_amount(), to, deadline),
            )?,
            RouterCall::RemoveLiquidityEthCollection {
                collection,
                liquidity,
                token_ids,
            } => encode(
                iface,
                method,
                (collection, liquidity, token_ids, removal_min_amount(), to, deadline),
            )?,
        };

        Ok(PreparedCall {
            to: router,
            data,
            value: self.value(),
            method,
        })
    }
}

/// ERC20 `approve(spender, amount)` on `token`.
pub fn erc20_approve_call(token: Address, spender: Address, amount: U256) -> Result<PreparedCall, SwapError> {
    Ok(PreparedCall {
        to: token,
        data: encode(&ERC20_INTERFACE, "approve", (spender, amount))?,
        value: U256::zero(),
        method: "approve",
    })
}

/// ERC721 `setApprovalForAll(operator, approved)` on `collection`.
pub fn set_approval_for_all_call(collection: Address, operator: Address, approved: bool) -> Result<PreparedCall, SwapError> {
    Ok(PreparedCall {
        to: collection,
        data: encode(&ERC721_INTERFACE, "setApprovalForAll", (operator, approved))?,
        value: U256::zero(),
        method: "setApprovalForAll",
    })
}

fn encode<T: Tokenize>(iface: &BaseContract, method: &str, args: T) -> Result<ethers::types::Bytes, SwapError> {
    iface
        .encode(method, args)
        .map_err(|e| SwapError::InvalidParameters(format!("cannot encode {}: {}", method, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slippage::SlippageTolerance;
    use crate::types::Token;
    use ethers::abi::Token as AbiToken;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_remove_liquidity_min_is_zero_at_any_slippage() {
        let params = RemoveLiquidityParameters {
            token: Token::fungible(addr(1), "WETH", 18),
            collection: Token::collection(addr(2), "PUNK"),
            liquidity: U256::from(1_000),
            token_ids: vec![U256::from(3)],
            slippage: SlippageTolerance::from_bps(500).unwrap(),
        };
        let call = RouterCall::for_remove_liquidity(&params);
        let prepared = call.prepare(addr(9), addr(7), 1_700_000_000).unwrap();

        let function = ROUTER_INTERFACE.abi().function("removeLiquidityCollection").unwrap();
        let tokens = function.decode_input(&prepared.data[4..]).unwrap();
        assert_eq!(tokens[4], AbiToken::Uint(U256::zero()));
        assert_eq!(tokens[5], AbiToken::Address(addr(7)));
        assert_eq!(prepared.value, U256::zero());
    }

    #[test]
    fn test_native_add_liquidity_attaches_value() {
        let params = AddLiquidityParameters {
            token: Token::native("ETH", 18),
            collection: Token::collection(addr(2), "PUNK"),
            amount_desired: U256::from(10_000),
            token_ids: vec![U256::from(1), U256::from(2)],
            slippage: SlippageTolerance::from_bps(100).unwrap(),
        };
        let call = RouterCall::for_add_liquidity(&params);
        assert_eq!(call.method(), "addLiquidityETHCollection");
        assert_eq!(call.value(), U256::from(10_000));
        match call {
            RouterCall::AddLiquidityEthCollection { amount_eth_min, .. } => {
                assert_eq!(amount_eth_min, U256::from(9_900))
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_approve_call_encodes_amount() {
        let call = erc20_approve_call(addr(1), addr(9), U256::from(42)).unwrap();
        let function = ERC20_INTERFACE.abi().function("approve").unwrap();
        let tokens = function.decode_input(&call.data[4..]).unwrap();
        assert_eq!(tokens, vec![AbiToken::Address(addr(9)), AbiToken::Uint(U256::from(42))]);
        assert_eq!(call.to, addr(1));
    }
}
