//! Write-side interfaces, encoded without a provider.

use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use once_cell::sync::Lazy;

const ROUTER_WRITE_FUNCTIONS: &[&str] = &[
    "function swapTokensForExactTokensCollection(uint256[] tokenIdsOut, uint256 amountInMax, address[] path, bool capRoyaltyFee, address to, uint256 deadline) external returns (uint256[] amounts)",
    "function swapExactTokensForTokensCollection(uint256[] tokenIdsIn, uint256 amountOutMin, address[] path, bool capRoyaltyFee, address to, uint256 deadline) external returns (uint256[] amounts)",
    "function swapETHForExactTokensCollection(uint256[] tokenIdsOut, address[] path, bool capRoyaltyFee, address to, uint256 deadline) external payable returns (uint256[] amounts)",
    "function swapExactTokensForETHCollection(uint256[] tokenIdsIn, uint256 amountOutMin, address[] path, bool capRoyaltyFee, address to, uint256 deadline) external returns (uint256[] amounts)",
    "function addLiquidityCollection(address tokenA, address collectionB, uint256 amountADesired, uint256[] tokenIdsB, uint256 amountAMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB, uint256 liquidity)",
    "function addLiquidityETHCollection(address collection, uint256[] tokenIds, uint256 amountETHMin, address to, uint256 deadline) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity)",
    "function removeLiquidityCollection(address tokenA, address collectionB, uint256 liquidity, uint256[] tokenIdsB, uint256 amountAMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB)",
    "function removeLiquidityETHCollection(address collection, uint256 liquidity, uint256[] tokenIds, uint256 amountETHMin, address to, uint256 deadline) external returns (uint256 amountToken, uint256 amountETH)",
];

const ERC20_WRITE_FUNCTIONS: &[&str] =
    &["function approve(address spender, uint256 amount) external returns (bool)"];

const ERC721_WRITE_FUNCTIONS: &[&str] =
    &["function setApprovalForAll(address operator, bool approved) external"];

pub static ROUTER_INTERFACE: Lazy<BaseContract> = Lazy::new(|| {
    BaseContract::from(parse_abi(ROUTER_WRITE_FUNCTIONS).expect("router write ABI is well-formed"))
});

pub static ERC20_INTERFACE: Lazy<BaseContract> = Lazy::new(|| {
    BaseContract::from(parse_abi(ERC20_WRITE_FUNCTIONS).expect("ERC20 write ABI is well-formed"))
});

pub static ERC721_INTERFACE: Lazy<BaseContract> = Lazy::new(|| {
    BaseContract::from(parse_abi(ERC721_WRITE_FUNCTIONS).expect("ERC721 write ABI is well-formed"))
});

/// 4-byte selector of `name` in `iface`, if declared.
pub fn selector(iface: &BaseContract, name: &str) -> Option<[u8; 4]> {
    iface.abi().function(name).ok().map(|f| f.short_signature())
}
