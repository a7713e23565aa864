//! Shared cache of off-chain discovered pools.

use crate::{PoolDiscoveryInterface, SamplerError};
use dashmap::DashMap;
use router_types::{Address, Source};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
	source: Source,
	maker_token: Address,
	taker_token: Address,
}

#[derive(Debug, Clone)]
struct CachedPools {
	pools: Vec<Address>,
	fetched_at: Instant,
}

/// Pools per (source, pair), each entry valid for a fixed time to live.
///
/// Entries are only ever replaced whole, so readers see either the old or
/// the new pool list.
#[derive(Debug)]
pub struct PoolsCache {
	entries: DashMap<PoolKey, CachedPools>,
	ttl: Duration,
}

impl PoolsCache {
	pub fn new(ttl: Duration) -> Self {
		Self {
			entries: DashMap::new(),
			ttl,
		}
	}

	/// Cached pools for the pair, if present and not stale.
	pub fn lookup(&self, source: Source, maker_token: Address, taker_token: Address) -> Option<Vec<Address>> {
		let key = PoolKey {
			source,
			maker_token,
			taker_token,
		};
		self.entries
			.get(&key)
			.filter(|entry| entry.fetched_at.elapsed() < self.ttl)
			.map(|entry| entry.pools.clone())
	}

	pub fn insert(&self, source: Source, maker_token: Address, taker_token: Address, pools: Vec<Address>) {
		let key = PoolKey {
			source,
			maker_token,
			taker_token,
		};
		self.entries.insert(
			key,
			CachedPools {
				pools,
				fetched_at: Instant::now(),
			},
		);
	}

	pub fn is_fresh(&self, source: Source, maker_token: Address, taker_token: Address) -> bool {
		self.lookup(source, maker_token, taker_token).is_some()
	}

	/// Returns cached pools, refreshing them through `discovery` when the
	/// entry is missing or stale.
	pub async fn get_or_refresh(
		&self,
		discovery: &dyn PoolDiscoveryInterface,
		source: Source,
		maker_token: Address,
		taker_token: Address,
	) -> Result<Vec<Address>, SamplerError> {
		if let Some(pools) = self.lookup(source, maker_token, taker_token) {
			return Ok(pools);
		}
		let pools = discovery
			.discover_pools(source, maker_token, taker_token)
			.await?;
		debug!(source = %source, count = pools.len(), "Refreshed pool cache");
		self.insert(source, maker_token, taker_token, pools.clone());
		Ok(pools)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingDiscovery {
		calls: AtomicUsize,
	}

	#[async_trait]
	impl PoolDiscoveryInterface for CountingDiscovery {
		async fn discover_pools(
			&self,
			_source: Source,
			_maker_token: Address,
			_taker_token: Address,
		) -> Result<Vec<Address>, SamplerError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(vec![Address::repeat_byte(0xba)])
		}
	}

	#[tokio::test]
	async fn test_refresh_only_when_missing() {
		let cache = PoolsCache::new(Duration::from_secs(60));
		let discovery = CountingDiscovery {
			calls: AtomicUsize::new(0),
		};
		let maker = Address::repeat_byte(1);
		let taker = Address::repeat_byte(2);

		let first = cache
			.get_or_refresh(&discovery, Source::Balancer, maker, taker)
			.await
			.unwrap();
		let second = cache
			.get_or_refresh(&discovery, Source::Balancer, maker, taker)
			.await
			.unwrap();
		assert_eq!(first, second);
		assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

		// Other direction is a separate entry.
		cache
			.get_or_refresh(&discovery, Source::Balancer, taker, maker)
			.await
			.unwrap();
		assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
		assert_eq!(cache.len(), 2);
	}

	#[tokio::test]
	async fn test_stale_entries_are_refreshed() {
		let cache = PoolsCache::new(Duration::ZERO);
		let discovery = CountingDiscovery {
			calls: AtomicUsize::new(0),
		};
		let maker = Address::repeat_byte(1);
		let taker = Address::repeat_byte(2);

		cache.insert(Source::Cream, maker, taker, vec![]);
		assert!(!cache.is_fresh(Source::Cream, maker, taker));
		let pools = cache
			.get_or_refresh(&discovery, Source::Cream, maker, taker)
			.await
			.unwrap();
		assert_eq!(pools.len(), 1);
		assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
	}
}
