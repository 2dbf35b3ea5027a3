use ethers::prelude::abigen;

abigen!(
    CollectionFactory,
    r#"[
        function getPair(address tokenA, address tokenB) external view returns (address pair)
    ]"#
);
