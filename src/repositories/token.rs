use crate::cache::CacheManager;
use crate::chain::{ChainClient, ContractRevert};
use crate::context::ChainContext;
use crate::error::SwapError;
use crate::types::{Token, TokenKind};
use ethers::types::Address;
use log::{debug, warn};
use std::sync::Arc;

/// ERC165 interface id of ERC721.
const ERC721_INTERFACE_ID: [u8; 4] = [0x80, 0xac, 0x58, 0xcd];

/// Resolves and caches token metadata per `(chain_id, address)`.
///
/// Entries live as long as the shared [`CacheManager`]; a token cached under another
/// kind is resolved again, and an address that is not of the requested kind is rejected
/// with [`SwapError::InvalidParameters`].
pub struct TokenRepository<C: ChainClient> {
    client: Arc<C>,
    cache: Arc<CacheManager>,
    ctx: ChainContext,
}

impl<C: ChainClient> Clone for TokenRepository<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cache: Arc::clone(&self.cache),
            ctx: self.ctx.clone(),
        }
    }
}

impl<C: ChainClient> TokenRepository<C> {
    pub fn new(client: Arc<C>, cache: Arc<CacheManager>, ctx: ChainContext) -> Self {
        Self { client, cache, ctx }
    }

    pub fn native(&self) -> Token {
        self.ctx.native_token()
    }

    /// Resolves `address` as the given kind; the native kind ignores `address`.
    pub async fn resolve(&self, address: Address, kind: TokenKind) -> Result<Token, SwapError> {
        match kind {
            TokenKind::Native => Ok(self.native()),
            TokenKind::Fungible => self.resolve_fungible(address).await,
            TokenKind::Discrete => self.resolve_collection(address).await,
        }
    }

    pub async fn resolve_fungible(&self, address: Address) -> Result<Token, SwapError> {
        if let Some(token) = self.cached(address, TokenKind::Fungible) {
            return Ok(token);
        }

        let (symbol, decimals) = futures::try_join!(
            self.client.erc20_symbol(address),
            self.client.erc20_decimals(address)
        )
        .map_err(|e| {
            if ContractRevert::is_revert(&e) {
                SwapError::InvalidParameters(format!("{:?} is not an ERC20 token", address))
            } else {
                SwapError::contract_call(format!("ERC20 metadata of {:?}", address), e)
            }
        })?;

        let token = Token::fungible(address, symbol, decimals);
        debug!("Resolved token {} with {} decimals", token, decimals);
        self.cache.put_token(self.ctx.chain_id, token.clone());
        Ok(token)
    }

    pub async fn resolve_collection(&self, address: Address) -> Result<Token, SwapError> {
        if let Some(token) = self.cached(address, TokenKind::Discrete) {
            return Ok(token);
        }

        let is_collection = match self.client.supports_interface(address, ERC721_INTERFACE_ID).await {
            Ok(supported) => supported,
            Err(e) if ContractRevert::is_revert(&e) => false,
            Err(e) => {
                return Err(SwapError::contract_call(
                    format!("supportsInterface of {:?}", address),
                    e,
                ))
            }
        };
        if !is_collection {
            return Err(SwapError::InvalidParameters(format!(
                "{:?} is not an ERC721 collection",
                address
            )));
        }

        let symbol = self
            .client
            .collection_symbol(address)
            .await
            .map_err(|e| SwapError::contract_call(format!("collection metadata of {:?}", address), e))?;

        let token = Token::collection(address, symbol);
        debug!("Resolved collection {}", token);
        self.cache.put_token(self.ctx.chain_id, token.clone());
        Ok(token)
    }

    fn cached(&self, address: Address, kind: TokenKind) -> Option<Token> {
        let token = self.cache.get_token(self.ctx.chain_id, &address)?;
        if token.kind != kind {
            warn!(
                "Token {:?} cached as {:?} but requested as {:?}, re-resolving",
                address, token.kind, kind
            );
            return None;
        }
        Some(token)
    }
}
