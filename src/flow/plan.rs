//! One "gated on-chain action": the approvals and balance checks that must pass before
//! a router call may be sent. Swaps and liquidity changes are configurations of it.

use crate::approval::ApprovalKey;
use crate::context::ChainContext;
use crate::error::SwapError;
use crate::flow::calls::RouterCall;
use crate::quote::SwapQuote;
use crate::types::{AddLiquidityParameters, RemoveLiquidityParameters, SwapParameters, SwapType, Token};
use crate::validator::BalanceCheck;
use ethers::types::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedPlan {
    /// Approvals in the order they are requested
    pub approvals: Vec<ApprovalKey>,
    pub checks: Vec<BalanceCheck>,
    pub call: RouterCall,
}

impl GatedPlan {
    /// Buying pulls at most `maximum_sent` of the origin token; selling moves the selected IDs.
    pub fn swap(params: &SwapParameters, quote: &SwapQuote, owner: Address, ctx: &ChainContext) -> Result<Self, SwapError> {
        let call = RouterCall::for_swap(params, quote)?;
        let mut approvals = Vec::new();
        let mut checks = Vec::new();

        match params.swap_type() {
            SwapType::ExactOutputCollection => {
                let amount = quote.maximum_sent().unwrap_or(quote.input_amount);
                let from = &params.from_token;
                if !from.is_native() {
                    approvals.push(ApprovalKey::erc20(
                        owner,
                        ctx.router,
                        from.address,
                        amount,
                        from.symbol.clone(),
                    ));
                }
                checks.push(BalanceCheck::amount(from, owner, amount));
            }
            SwapType::ExactInputCollection => {
                let collection = &params.from_token;
                approvals.push(ApprovalKey::collection(
                    owner,
                    ctx.router,
                    collection.address,
                    collection.symbol.clone(),
                ));
                checks.push(BalanceCheck::ownership(collection, owner, params.ids()));
            }
            SwapType::Continuous => {
                return Err(SwapError::UnsupportedSwapType(
                    "continuous swaps cannot be planned".to_string(),
                ))
            }
        }

        Ok(Self { approvals, checks, call })
    }

    pub fn add_liquidity(params: &AddLiquidityParameters, owner: Address, ctx: &ChainContext) -> Self {
        let mut approvals = Vec::new();
        if !params.token.is_native() {
            approvals.push(ApprovalKey::erc20(
                owner,
                ctx.router,
                params.token.address,
                params.amount_desired,
                params.token.symbol.clone(),
            ));
        }
        approvals.push(ApprovalKey::collection(
            owner,
            ctx.router,
            params.collection.address,
            params.collection.symbol.clone(),
        ));

        let checks = vec![
            BalanceCheck::amount(&params.token, owner, params.amount_desired),
            BalanceCheck::ownership(&params.collection, owner, &params.token_ids),
        ];

        Self {
            approvals,
            checks,
            call: RouterCall::for_add_liquidity(params),
        }
    }

    /// `lp_token` is the pair address; the IDs come out of the pool, so only the LP share is checked.
    pub fn remove_liquidity(
        params: &RemoveLiquidityParameters,
        lp_token: Address,
        owner: Address,
        ctx: &ChainContext,
    ) -> Self {
        let lp = lp_share_token(lp_token, &params.token, &params.collection);
        let approvals = vec![ApprovalKey::erc20(owner, ctx.router, lp_token, params.liquidity, lp.symbol.clone()).lp_share()];
        let checks = vec![BalanceCheck::amount(&lp, owner, params.liquidity)];

        Self {
            approvals,
            checks,
            call: RouterCall::for_remove_liquidity(params),
        }
    }
}

/// Pair LP tokens use 18 decimals.
pub fn lp_share_token(pair: Address, token: &Token, collection: &Token) -> Token {
    Token::fungible(pair, format!("{}-{} LP", token.symbol, collection.symbol), 18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalPurpose, ApprovalTarget};
    use crate::slippage::SlippageTolerance;
    use ethers::types::U256;

    fn ctx() -> ChainContext {
        ChainContext::new(
            1,
            Address::from_low_u64_be(100),
            Address::from_low_u64_be(101),
            Address::from_low_u64_be(102),
        )
    }

    #[test]
    fn test_remove_liquidity_gates_on_lp_share() {
        let params = RemoveLiquidityParameters {
            token: Token::fungible(Address::from_low_u64_be(1), "WETH", 18),
            collection: Token::collection(Address::from_low_u64_be(2), "PUNK"),
            liquidity: U256::from(500),
            token_ids: vec![U256::from(1)],
            slippage: SlippageTolerance::ZERO,
        };
        let lp = Address::from_low_u64_be(50);
        let owner = Address::from_low_u64_be(7);
        let plan = GatedPlan::remove_liquidity(&params, lp, owner, &ctx());

        assert_eq!(plan.approvals.len(), 1);
        assert_eq!(plan.approvals[0].purpose, ApprovalPurpose::LpShare);
        assert_eq!(
            plan.approvals[0].target,
            ApprovalTarget::Erc20 {
                token: lp,
                amount: U256::from(500)
            }
        );
        assert_eq!(plan.checks[0].required_amount(), U256::from(500));
    }

    #[test]
    fn test_native_add_liquidity_only_needs_collection_approval() {
        let params = AddLiquidityParameters {
            token: Token::native("ETH", 18),
            collection: Token::collection(Address::from_low_u64_be(2), "PUNK"),
            amount_desired: U256::from(10),
            token_ids: vec![U256::from(1), U256::from(2)],
            slippage: SlippageTolerance::ZERO,
        };
        let plan = GatedPlan::add_liquidity(&params, Address::from_low_u64_be(7), &ctx());
        assert_eq!(plan.approvals.len(), 1);
        assert!(matches!(plan.approvals[0].target, ApprovalTarget::Collection { .. }));
        assert!(matches!(plan.checks[0], BalanceCheck::Native { .. }));
    }
}
