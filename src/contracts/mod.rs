// Contracts Module - Router, factory, pair and token ABIs

pub mod collection_factory;
pub mod collection_pair;
pub mod collection_router;
pub mod erc20;
pub mod erc721;
pub mod interfaces;

// Public exports
pub use collection_factory::CollectionFactory;
pub use collection_pair::CollectionPair;
pub use collection_router::CollectionRouter;
pub use erc20::Erc20;
pub use erc721::Erc721;
pub use interfaces::{selector, ERC20_INTERFACE, ERC721_INTERFACE, ROUTER_INTERFACE};
