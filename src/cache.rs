//! Single-flight installation token cache.
//!
//! [`TokenCache`] wraps any [`TokenSource`] and hands out the same [`AccessToken`] for as
//! long as it stays valid. A stale or missing token sends the caller through one shared
//! critical section: the first caller exchanges, callers queued behind it receive that
//! result instead of exchanging again. Failures are never stored, so the next call retries.

mod metrics;

pub use metrics::CacheMetrics;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	exchange::{TokenFuture, TokenSource},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// What the cache does with a token that carries no expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoExpiryPolicy {
	/// Keep the token until [`TokenCache::invalidate`] is called.
	#[default]
	CacheForever,
	/// Treat the token as stale immediately, so every call exchanges again.
	AlwaysRefresh,
}

/// Observable state of the cache at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
	/// No token has been issued yet, or the last one was invalidated.
	Empty,
	/// The cached token can be served without a network call.
	Valid,
	/// The cached token must be replaced before use.
	Stale,
}

#[derive(Debug, Default)]
struct CacheSlot {
	token: Option<Arc<AccessToken>>,
	// Bumped on every replacement so queued callers can tell a fresh result apart.
	generation: u64,
}

/// Caches the token produced by `S` until it goes stale.
pub struct TokenCache<S>
where
	S: ?Sized + TokenSource,
{
	source: Arc<S>,
	slot: RwLock<CacheSlot>,
	singleflight: AsyncMutex<()>,
	no_expiry: NoExpiryPolicy,
	refresh_margin: Duration,
	metrics: Arc<CacheMetrics>,
}
impl<S> TokenCache<S>
where
	S: ?Sized + TokenSource,
{
	/// Creates an empty cache over `source`.
	pub fn new(source: impl Into<Arc<S>>) -> Self {
		Self {
			source: source.into(),
			slot: RwLock::new(CacheSlot::default()),
			singleflight: AsyncMutex::new(()),
			no_expiry: NoExpiryPolicy::default(),
			refresh_margin: Duration::ZERO,
			metrics: Default::default(),
		}
	}

	/// Overrides how tokens without expiry are treated.
	pub fn with_no_expiry_policy(mut self, policy: NoExpiryPolicy) -> Self {
		self.no_expiry = policy;

		self
	}

	/// Treats tokens as stale `margin` before their expiry; negative margins clamp to zero.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Returns the wrapped token source.
	pub fn source(&self) -> &Arc<S> {
		&self.source
	}

	/// Returns the configured no-expiry policy.
	pub fn no_expiry_policy(&self) -> NoExpiryPolicy {
		self.no_expiry
	}

	/// Returns the cache counters.
	pub fn metrics(&self) -> Arc<CacheMetrics> {
		self.metrics.clone()
	}

	/// Returns the cached token without checking freshness or exchanging.
	pub fn peek(&self) -> Option<Arc<AccessToken>> {
		self.slot.read().token.clone()
	}

	/// Reports the cache state relative to the current clock.
	pub fn state(&self) -> CacheState {
		self.state_at(OffsetDateTime::now_utc())
	}

	/// Reports the cache state at `instant`.
	pub fn state_at(&self, instant: OffsetDateTime) -> CacheState {
		self.classify(self.slot.read().token.as_deref(), instant)
	}

	/// Drops the cached token so the next call exchanges again.
	pub fn invalidate(&self) {
		let mut slot = self.slot.write();

		slot.token = None;
		slot.generation += 1;
	}

	/// Returns a valid token, exchanging at most once across concurrent callers.
	///
	/// Dropping the returned future abandons the wait; an abandoned exchange stores nothing.
	pub async fn get_token(&self) -> Result<Arc<AccessToken>> {
		const KIND: FlowKind = FlowKind::CachedToken;

		let span = FlowSpan::new(KIND, "get_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let observed = {
					let slot = self.slot.read();
					let state = self.classify(slot.token.as_deref(), OffsetDateTime::now_utc());

					match (&slot.token, state) {
						(Some(token), CacheState::Valid) => {
							self.metrics.record_hit();

							#[cfg(feature = "tracing")]
							tracing::debug!("Serving cached installation token.");

							return Ok(token.clone());
						},
						_ => slot.generation,
					}
				};
				let _singleflight = self.singleflight.lock().await;

				{
					let slot = self.slot.read();

					// Another caller replaced the token while this one was queued.
					let replaced = slot.token.as_ref().filter(|_| slot.generation != observed);

					if let Some(token) = replaced {
						self.metrics.record_hit();

						#[cfg(feature = "tracing")]
						tracing::debug!("Serving installation token exchanged by another caller.");

						return Ok(token.clone());
					}
				}

				#[cfg(feature = "tracing")]
				tracing::debug!("Cached installation token is missing or stale; exchanging.");

				self.metrics.record_exchange();

				match self.source.token().await {
					Ok(token) => {
						let token = Arc::new(token);
						let mut slot = self.slot.write();

						slot.token = Some(token.clone());
						slot.generation += 1;

						Ok(token)
					},
					Err(e) => {
						self.metrics.record_failure();

						Err(e)
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn classify(&self, token: Option<&AccessToken>, instant: OffsetDateTime) -> CacheState {
		let Some(token) = token else {
			return CacheState::Empty;
		};

		match (token.expires_at, self.no_expiry) {
			(None, NoExpiryPolicy::CacheForever) => CacheState::Valid,
			(None, NoExpiryPolicy::AlwaysRefresh) => CacheState::Stale,
			(Some(_), _) if token.is_expired_at(instant + self.refresh_margin) => CacheState::Stale,
			(Some(_), _) => CacheState::Valid,
		}
	}
}
impl<S> TokenSource for TokenCache<S>
where
	S: ?Sized + TokenSource,
{
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.get_token().await.map(|token| (*token).clone()) })
	}
}
impl<S> Debug for TokenCache<S>
where
	S: ?Sized + TokenSource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("token", &self.slot.read().token)
			.field("no_expiry", &self.no_expiry)
			.field("refresh_margin", &self.refresh_margin)
			.field("metrics", &self.metrics)
			.finish()
	}
}
