//! In-memory chain used by the integration tests.
//!
//! Every read is answered from tables the test fills in. Submitted transactions are
//! recorded; approvals take effect when their receipt is awaited, unless the test asked
//! for a revert.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use collection_swap_sdk::chain::{ChainClient, ContractRevert, PairReserves, PreparedCall, TxOutcome};
use collection_swap_sdk::contracts::{ERC20_INTERFACE, ERC721_INTERFACE};
use collection_swap_sdk::context::ChainContext;
use collection_swap_sdk::slippage::SlippageTolerance;
use collection_swap_sdk::types::Token;
use ethers::abi::Token as AbiToken;
use ethers::types::{Address, TxHash, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn router() -> Address {
    addr(0xa1)
}
pub fn factory() -> Address {
    addr(0xa2)
}
pub fn weth() -> Address {
    addr(0xe1)
}
pub fn usdc() -> Address {
    addr(0xe2)
}
/// Intermediary distinct from the wrapped-native token
pub fn x_token() -> Address {
    addr(0xe3)
}
pub fn punk() -> Address {
    addr(0xc1)
}
pub fn user() -> Address {
    addr(0x1001)
}
pub fn stranger() -> Address {
    addr(0x2002)
}

pub fn ctx() -> ChainContext {
    ChainContext::new(1, router(), factory(), weth())
}

pub fn weth_token() -> Token {
    Token::fungible(weth(), "WETH", 18)
}
pub fn usdc_token() -> Token {
    Token::fungible(usdc(), "USDC", 6)
}
pub fn x_token_info() -> Token {
    Token::fungible(x_token(), "X", 18)
}
pub fn punk_token() -> Token {
    Token::collection(punk(), "PUNK")
}
pub fn native_token() -> Token {
    Token::native("ETH", 18)
}

pub fn ids(raw: &[u64]) -> Vec<U256> {
    raw.iter().map(|id| U256::from(*id)).collect()
}

pub fn eth(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn bps(n: u32) -> SlippageTolerance {
    SlippageTolerance::from_bps(n).expect("valid slippage")
}

fn ordered(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone)]
enum Effect {
    Allowance { token: Address, owner: Address, spender: Address, amount: U256 },
    Operator { collection: Address, owner: Address, operator: Address, approved: bool },
    None,
}

#[derive(Default)]
struct State {
    symbols: HashMap<Address, String>,
    decimals: HashMap<Address, u8>,
    collections: HashSet<Address>,
    erc20_balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    native_balances: HashMap<Address, U256>,
    collection_balances: HashMap<(Address, Address), U256>,
    owners: HashMap<(Address, U256), Address>,
    operators: HashMap<(Address, Address, Address), bool>,
    pairs: HashMap<(Address, Address), Address>,
    reserves: HashMap<Address, PairReserves>,
    amounts_in_collection: HashMap<(Vec<Address>, Vec<U256>), Vec<U256>>,
    amounts_out_collection: HashMap<(Vec<Address>, Vec<U256>), Vec<U256>>,
    amounts_in: HashMap<(Vec<Address>, U256), Vec<U256>>,
    amounts_out: HashMap<(Vec<Address>, U256), Vec<U256>>,
    failing: HashMap<String, String>,
    reject_next_send: bool,
    revert_next_tx: bool,
    pending: HashMap<TxHash, (Effect, bool)>,
    sent: Vec<(Address, PreparedCall)>,
    calls: Vec<String>,
    next_id: u64,
}

#[derive(Default)]
pub struct MockChain {
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        let chain = Self::default();
        chain.with_token(weth(), "WETH", 18);
        chain.with_token(usdc(), "USDC", 6);
        chain.with_token(x_token(), "X", 18);
        chain.with_collection(punk(), "PUNK");
        chain
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn with_token(&self, token: Address, symbol: &str, decimals: u8) {
        let mut s = self.state();
        s.symbols.insert(token, symbol.to_string());
        s.decimals.insert(token, decimals);
    }

    pub fn with_collection(&self, collection: Address, symbol: &str) {
        let mut s = self.state();
        s.symbols.insert(collection, symbol.to_string());
        s.collections.insert(collection);
    }

    /// Creates a pair and returns its (LP token) address.
    pub fn add_pair(&self, a: Address, b: Address) -> Address {
        let mut s = self.state();
        s.next_id += 1;
        let pair = addr(0x9000 + s.next_id);
        s.pairs.insert(ordered(a, b), pair);
        pair
    }

    pub fn set_reserves(&self, pair: Address, token0: Address, reserve0: U256, reserve1: U256) {
        self.state().reserves.insert(
            pair,
            PairReserves {
                token0,
                reserve0,
                reserve1,
            },
        );
    }

    pub fn set_amounts_in_collection(&self, path: &[Address], token_ids: &[U256], amounts: Vec<U256>) {
        self.state()
            .amounts_in_collection
            .insert((path.to_vec(), token_ids.to_vec()), amounts);
    }

    pub fn set_amounts_out_collection(&self, path: &[Address], token_ids: &[U256], amounts: Vec<U256>) {
        self.state()
            .amounts_out_collection
            .insert((path.to_vec(), token_ids.to_vec()), amounts);
    }

    pub fn set_amounts_in(&self, path: &[Address], amount_out: U256, amounts: Vec<U256>) {
        self.state().amounts_in.insert((path.to_vec(), amount_out), amounts);
    }

    pub fn set_amounts_out(&self, path: &[Address], amount_in: U256, amounts: Vec<U256>) {
        self.state().amounts_out.insert((path.to_vec(), amount_in), amounts);
    }

    pub fn set_erc20_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state().erc20_balances.insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state().allowances.insert((token, owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.state().native_balances.insert(owner, amount);
    }

    pub fn set_collection_balance(&self, collection: Address, owner: Address, count: u64) {
        self.state()
            .collection_balances
            .insert((collection, owner), U256::from(count));
    }

    pub fn set_owner(&self, collection: Address, token_id: u64, owner: Address) {
        self.state().owners.insert((collection, U256::from(token_id)), owner);
    }

    pub fn set_operator(&self, collection: Address, owner: Address, operator: Address, approved: bool) {
        self.state().operators.insert((collection, owner, operator), approved);
    }

    /// Makes every call to `method` fail with a transport error.
    pub fn fail_method(&self, method: &str) {
        self.fail_method_with(method, &format!("{}: request timed out", method));
    }

    /// Makes every call to `method` fail with a transport error carrying `message`.
    pub fn fail_method_with(&self, method: &str, message: &str) {
        self.state()
            .failing
            .insert(method.to_string(), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    pub fn reject_next_send(&self) {
        self.state().reject_next_send = true;
    }

    pub fn revert_next_tx(&self) {
        self.state().revert_next_tx = true;
    }

    pub fn sent(&self) -> Vec<(Address, PreparedCall)> {
        self.state().sent.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|m| m.as_str() == method).count()
    }

    fn record(&self, method: &str) -> Result<()> {
        let mut s = self.state();
        s.calls.push(method.to_string());
        if let Some(message) = s.failing.get(method) {
            return Err(anyhow!("{}", message));
        }
        Ok(())
    }
}

fn decode_effect(from: Address, call: &PreparedCall) -> Effect {
    match call.method {
        "approve" => {
            let function = ERC20_INTERFACE.abi().function("approve").expect("approve in ABI");
            match function.decode_input(&call.data[4..]).as_deref() {
                Ok([AbiToken::Address(spender), AbiToken::Uint(amount)]) => Effect::Allowance {
                    token: call.to,
                    owner: from,
                    spender: *spender,
                    amount: *amount,
                },
                _ => Effect::None,
            }
        }
        "setApprovalForAll" => {
            let function = ERC721_INTERFACE
                .abi()
                .function("setApprovalForAll")
                .expect("setApprovalForAll in ABI");
            match function.decode_input(&call.data[4..]).as_deref() {
                Ok([AbiToken::Address(operator), AbiToken::Bool(approved)]) => Effect::Operator {
                    collection: call.to,
                    owner: from,
                    operator: *operator,
                    approved: *approved,
                },
                _ => Effect::None,
            }
        }
        _ => Effect::None,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn erc20_symbol(&self, token: Address) -> Result<String> {
        self.record("symbol")?;
        self.state()
            .symbols
            .get(&token)
            .cloned()
            .ok_or_else(|| ContractRevert::new("symbol", None).into())
    }

    async fn erc20_decimals(&self, token: Address) -> Result<u8> {
        self.record("decimals")?;
        self.state()
            .decimals
            .get(&token)
            .copied()
            .ok_or_else(|| ContractRevert::new("decimals", None).into())
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        self.record("balanceOf")?;
        Ok(self
            .state()
            .erc20_balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn erc20_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.record("allowance")?;
        Ok(self.allowance(token, owner, spender))
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.record("eth_getBalance")?;
        Ok(self
            .state()
            .native_balances
            .get(&owner)
            .copied()
            .unwrap_or_default())
    }

    async fn collection_symbol(&self, collection: Address) -> Result<String> {
        self.record("symbol")?;
        self.state()
            .symbols
            .get(&collection)
            .cloned()
            .ok_or_else(|| ContractRevert::new("symbol", None).into())
    }

    /// Registered collections support ERC721; anything else reverts like a plain ERC20.
    async fn supports_interface(&self, contract: Address, _interface_id: [u8; 4]) -> Result<bool> {
        self.record("supportsInterface")?;
        if self.state().collections.contains(&contract) {
            Ok(true)
        } else {
            Err(ContractRevert::new("supportsInterface", None).into())
        }
    }

    async fn collection_balance(&self, collection: Address, owner: Address) -> Result<U256> {
        self.record("collectionBalanceOf")?;
        Ok(self
            .state()
            .collection_balances
            .get(&(collection, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn owner_of(&self, collection: Address, token_id: U256) -> Result<Address> {
        self.record("ownerOf")?;
        self.state()
            .owners
            .get(&(collection, token_id))
            .copied()
            .ok_or_else(|| ContractRevert::new("ownerOf", Some("ERC721: invalid token ID".to_string())).into())
    }

    async fn is_approved_for_all(&self, collection: Address, owner: Address, operator: Address) -> Result<bool> {
        self.record("isApprovedForAll")?;
        Ok(self
            .state()
            .operators
            .get(&(collection, owner, operator))
            .copied()
            .unwrap_or(false))
    }

    async fn get_pair(&self, _factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
        self.record("getPair")?;
        Ok(self
            .state()
            .pairs
            .get(&ordered(token_a, token_b))
            .copied()
            .unwrap_or_default())
    }

    async fn pair_reserves(&self, pair: Address) -> Result<PairReserves> {
        self.record("getReserves")?;
        self.state()
            .reserves
            .get(&pair)
            .copied()
            .ok_or_else(|| anyhow!("no reserves for {:?}", pair))
    }

    async fn get_amounts_out(&self, _router: Address, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>> {
        self.record("getAmountsOut")?;
        self.state()
            .amounts_out
            .get(&(path, amount_in))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: Library: INSUFFICIENT_LIQUIDITY"))
    }

    async fn get_amounts_in(&self, _router: Address, amount_out: U256, path: Vec<Address>) -> Result<Vec<U256>> {
        self.record("getAmountsIn")?;
        self.state()
            .amounts_in
            .get(&(path, amount_out))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: Library: INSUFFICIENT_LIQUIDITY"))
    }

    async fn get_amounts_out_collection(
        &self,
        _router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        _cap_royalty_fee: bool,
    ) -> Result<Vec<U256>> {
        self.record("getAmountsOutCollection")?;
        self.state()
            .amounts_out_collection
            .get(&(path, token_ids))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: Library: INSUFFICIENT_LIQUIDITY"))
    }

    async fn get_amounts_in_collection(
        &self,
        _router: Address,
        token_ids: Vec<U256>,
        path: Vec<Address>,
        _cap_royalty_fee: bool,
    ) -> Result<Vec<U256>> {
        self.record("getAmountsInCollection")?;
        self.state()
            .amounts_in_collection
            .get(&(path, token_ids))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: Library: INSUFFICIENT_LIQUIDITY"))
    }

    async fn send_transaction(&self, from: Address, call: PreparedCall) -> Result<TxHash> {
        self.record(call.method)?;
        let mut s = self.state();
        if s.reject_next_send {
            s.reject_next_send = false;
            return Err(anyhow!("user rejected transaction"));
        }
        s.next_id += 1;
        let tx = TxHash::from_low_u64_be(s.next_id);
        let reverts = std::mem::take(&mut s.revert_next_tx);
        s.pending.insert(tx, (decode_effect(from, &call), reverts));
        s.sent.push((from, call));
        Ok(tx)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TxOutcome> {
        self.record("eth_getTransactionReceipt")?;
        let mut s = self.state();
        let (effect, reverts) = s
            .pending
            .remove(&tx)
            .ok_or_else(|| anyhow!("unknown transaction {:?}", tx))?;
        if !reverts {
            match effect {
                Effect::Allowance {
                    token,
                    owner,
                    spender,
                    amount,
                } => {
                    s.allowances.insert((token, owner, spender), amount);
                }
                Effect::Operator {
                    collection,
                    owner,
                    operator,
                    approved,
                } => {
                    s.operators.insert((collection, owner, operator), approved);
                }
                Effect::None => {}
            }
        }
        Ok(TxOutcome {
            hash: tx,
            block_number: Some(100),
            success: !reverts,
        })
    }
}
