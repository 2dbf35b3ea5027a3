use crate::metrics;
use crate::settings::CacheSettings;
use crate::types::Token;
use dashmap::DashMap;
use ethers::prelude::Address;
use log::debug;
use std::sync::Arc;

/// Order-insensitive pair key scoped to a chain.
pub type PairKey = (u64, Address, Address);

pub fn pair_key(chain_id: u64, a: Address, b: Address) -> PairKey {
    if a <= b {
        (chain_id, a, b)
    } else {
        (chain_id, b, a)
    }
}

#[derive(Debug, Clone)]
/// Read-mostly caches shared by the repositories.
///
/// Entries are derived facts (token metadata, pair addresses), so population is
/// idempotent and concurrent duplicate reads only cost an extra RPC call.
///
/// ## Features
///
/// - **Chain Scoped**: Keys carry the chain id, one manager can serve several sessions
/// - **Positive Pair Cache**: Only existing pairs are cached; pairs are never destroyed,
///   but a missing pair may be created at any time
/// - **Bounded**: Manual eviction once a cache exceeds its configured size
pub struct CacheManager {
    pub token_cache: Arc<DashMap<(u64, Address), Token>>,
    pub pair_cache: Arc<DashMap<PairKey, Address>>,
    max_tokens: usize,
    max_pairs: usize,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::with_settings(&CacheSettings::default())
    }

    pub fn with_settings(settings: &CacheSettings) -> Self {
        Self {
            token_cache: Arc::new(DashMap::new()),
            pair_cache: Arc::new(DashMap::new()),
            max_tokens: settings.max_tokens.max(1),
            max_pairs: settings.max_pairs.max(1),
        }
    }

    pub fn get_token(&self, chain_id: u64, address: &Address) -> Option<Token> {
        match self.token_cache.get(&(chain_id, *address)) {
            Some(token) => {
                metrics::increment_cache_hit("token");
                Some(token.clone())
            }
            None => {
                metrics::increment_cache_miss("token");
                None
            }
        }
    }

    pub fn put_token(&self, chain_id: u64, token: Token) {
        self.token_cache.insert((chain_id, token.address), token);
        evict_over(&self.token_cache, self.max_tokens, "token");
    }

    pub fn get_pair(&self, chain_id: u64, a: Address, b: Address) -> Option<Address> {
        match self.pair_cache.get(&pair_key(chain_id, a, b)) {
            Some(pair) => {
                metrics::increment_cache_hit("pair");
                Some(*pair)
            }
            None => {
                metrics::increment_cache_miss("pair");
                None
            }
        }
    }

    pub fn put_pair(&self, chain_id: u64, a: Address, b: Address, pair: Address) {
        if pair.is_zero() {
            return;
        }
        self.pair_cache.insert(pair_key(chain_id, a, b), pair);
        evict_over(&self.pair_cache, self.max_pairs, "pair");
    }

    pub fn record_cache_sizes(&self) {
        metrics::set_cache_size("token", self.token_cache.len() as f64);
        metrics::set_cache_size("pair", self.pair_cache.len() as f64);
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

// Simple eviction: drop arbitrary entries until back under the bound
fn evict_over<K, V>(map: &DashMap<K, V>, max: usize, name: &str)
where
    K: Eq + std::hash::Hash + Clone,
{
    if map.len() <= max {
        return;
    }
    let to_remove = map.len() - max;
    let victims: Vec<K> = map.iter().take(to_remove).map(|e| e.key().clone()).collect();
    for key in &victims {
        map.remove(key);
    }
    debug!("Evicted {} entries from {} cache (size: {})", victims.len(), name, map.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_insensitive() {
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        assert_eq!(pair_key(1, a, b), pair_key(1, b, a));
        assert_ne!(pair_key(1, a, b), pair_key(5, a, b));
    }

    #[test]
    fn test_zero_pair_is_not_cached() {
        let cache = CacheManager::new();
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        cache.put_pair(1, a, b, Address::zero());
        assert!(cache.get_pair(1, a, b).is_none());

        cache.put_pair(1, a, b, Address::from_low_u64_be(9));
        assert_eq!(cache.get_pair(1, b, a), Some(Address::from_low_u64_be(9)));
    }

    #[test]
    fn test_eviction_bounds_size() {
        let cache = CacheManager::with_settings(&CacheSettings {
            max_tokens: 2,
            max_pairs: 2,
        });
        for i in 1..=5u64 {
            cache.put_token(1, Token::fungible(Address::from_low_u64_be(i), "T", 18));
        }
        assert_eq!(cache.token_cache.len(), 2);
    }
}
