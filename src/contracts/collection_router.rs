use ethers::prelude::abigen;

// Read side of the collection-aware router. Writes are encoded through
// `interfaces::ROUTER_INTERFACE` so call construction needs no provider.
abigen!(
    CollectionRouter,
    r#"[
        function factory() external view returns (address)
        function WETH() external view returns (address)
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts)
        function getAmountsIn(uint256 amountOut, address[] path) external view returns (uint256[] amounts)
        function getAmountsOutCollection(uint256[] tokenIdsIn, address[] path, bool capRoyaltyFee) external view returns (uint256[] amounts)
        function getAmountsInCollection(uint256[] tokenIdsOut, address[] path, bool capRoyaltyFee) external view returns (uint256[] amounts)
    ]"#
);
