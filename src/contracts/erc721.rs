use ethers::prelude::abigen;

abigen!(
    Erc721,
    r#"[
        function symbol() external view returns (string)
        function supportsInterface(bytes4 interfaceId) external view returns (bool)
        function balanceOf(address owner) external view returns (uint256)
        function ownerOf(uint256 tokenId) external view returns (address)
        function isApprovedForAll(address owner, address operator) external view returns (bool)
        function setApprovalForAll(address operator, bool approved) external
    ]"#
);
