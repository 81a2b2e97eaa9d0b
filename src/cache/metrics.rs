// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for a [`TokenCache`](crate::cache::TokenCache).
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Returns how many calls were served from the cache, including waiters that received
	/// another caller's fresh token.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns how many exchanges the cache started.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns how many exchanges failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
