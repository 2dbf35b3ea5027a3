use ethers::prelude::abigen;

// Pairs are ERC20 LP-share tokens; reserves of a collection side count units.
abigen!(
    CollectionPair,
    r#"[
        function token0() external view returns (address)
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)
    ]"#
);
