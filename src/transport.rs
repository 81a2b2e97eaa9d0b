//! Authenticating round-trip decorators.
//!
//! [`AuthTransport`] asks its [`BearerSource`] for a credential on every request, replaces
//! the `Authorization` header with it, and only then hands the request to the inner
//! transport. A credential failure fails the request before anything is sent.

// crates.io
use oauth2::http::{
	HeaderValue,
	header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::TokenCache,
	exchange::TokenSource,
	http::{
		DEFAULT_USER_AGENT, GITHUB_V3_MEDIA_TYPE, HttpRequest, RoundTrip, RoundTripFuture,
		bearer_header,
	},
	jwt::AppIdentity,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Boxed future returned by [`BearerSource::bearer`].
pub type BearerFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret>> + 'a + Send>>;

/// Produces the bearer credential attached to each outgoing request.
pub trait BearerSource
where
	Self: 'static + Send + Sync,
{
	/// Returns the credential for the next request.
	fn bearer(&self) -> BearerFuture<'_>;
}
/// App identities sign a fresh assertion per request.
impl BearerSource for AppIdentity {
	fn bearer(&self) -> BearerFuture<'_> {
		Box::pin(async move { self.sign() })
	}
}
/// Token caches serve the current installation token, exchanging when stale.
impl<S> BearerSource for TokenCache<S>
where
	S: ?Sized + TokenSource,
{
	fn bearer(&self) -> BearerFuture<'_> {
		Box::pin(async move { self.get_token().await.map(|token| token.value.clone()) })
	}
}

/// Round-tripper that authenticates every request with credentials from `B`.
pub struct AuthTransport<B, T>
where
	B: ?Sized + BearerSource,
	T: ?Sized + RoundTrip,
{
	/// Credential source consulted per request.
	pub source: Arc<B>,
	/// Transport the authenticated request is delegated to.
	pub inner: Arc<T>,
}
impl<B, T> AuthTransport<B, T>
where
	B: ?Sized + BearerSource,
	T: ?Sized + RoundTrip,
{
	/// Wraps `inner` so its requests carry credentials from `source`.
	pub fn new(source: impl Into<Arc<B>>, inner: impl Into<Arc<T>>) -> Self {
		Self { source: source.into(), inner: inner.into() }
	}

	/// Adds the credential and default headers to `request`.
	pub async fn authorize(&self, mut request: HttpRequest) -> Result<HttpRequest> {
		let secret = self.source.bearer().await?;
		let headers = request.headers_mut();

		headers.insert(AUTHORIZATION, bearer_header(&secret)?);

		if !headers.contains_key(ACCEPT) {
			headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_MEDIA_TYPE));
		}
		if !headers.contains_key(USER_AGENT) {
			headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
		}

		Ok(request)
	}
}
impl<B, T> Clone for AuthTransport<B, T>
where
	B: ?Sized + BearerSource,
	T: ?Sized + RoundTrip,
{
	fn clone(&self) -> Self {
		Self { source: self.source.clone(), inner: self.inner.clone() }
	}
}
impl<B, T> RoundTrip for AuthTransport<B, T>
where
	B: ?Sized + BearerSource,
	T: ?Sized + RoundTrip,
{
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
		Box::pin(async move {
			const KIND: FlowKind = FlowKind::Transport;

			let span = FlowSpan::new(KIND, "authorize");

			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			let request = match span.instrument(self.authorize(request)).await {
				Ok(request) => request,
				Err(e) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %e, "Request dropped: credential unavailable.");

					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					return Err(e);
				},
			};

			obs::record_flow_outcome(KIND, FlowOutcome::Success);

			self.inner.round_trip(request).await
		})
	}
}
impl<B, T> Debug for AuthTransport<B, T>
where
	B: ?Sized + BearerSource,
	T: ?Sized + RoundTrip,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthTransport(..)")
	}
}

/// Transport authenticating as the App itself.
pub type AppTransport<T> = AuthTransport<AppIdentity, T>;
/// Transport authenticating as an installation through a token cache.
pub type InstallationTransport<S, T> = AuthTransport<TokenCache<S>, T>;

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use oauth2::http::StatusCode;
	use parking_lot::Mutex;
	// self
	use super::*;
	use crate::{
		_preludet::{test_app_id, test_app_key},
		auth::AccessToken,
		error::TokenRetrievalError,
		exchange::TokenFuture,
		http::HttpResponse,
	};

	#[derive(Default)]
	struct RecordingTransport {
		seen: Mutex<Vec<HttpRequest>>,
	}
	impl RoundTrip for RecordingTransport {
		fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
			self.seen.lock().push(request);

			Box::pin(async { Ok(HttpResponse::new(Vec::new())) })
		}
	}

	struct ScriptedSource {
		calls: AtomicUsize,
		fail: bool,
	}
	impl TokenSource for ScriptedSource {
		fn token(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				if self.fail {
					return Err(TokenRetrievalError {
						status: StatusCode::UNAUTHORIZED,
						body: b"bad credentials".to_vec(),
					}
					.into());
				}

				Ok(AccessToken::new(format!("ghs_{call}"))
					.with_expires_at(OffsetDateTime::now_utc() + Duration::hours(1)))
			})
		}
	}

	fn authorization(request: &HttpRequest) -> &str {
		request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.expect("Authorization header expected.")
	}

	#[tokio::test]
	async fn app_transport_signs_each_request_and_replaces_header() {
		let inner = Arc::new(RecordingTransport::default());
		let identity = AppIdentity::new(test_app_id(), test_app_key());
		let transport = <AppTransport<RecordingTransport>>::new(identity, inner.clone());
		let mut request = HttpRequest::new(Vec::new());

		request.headers_mut().insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
		request.headers_mut().insert(ACCEPT, HeaderValue::from_static("application/json"));

		transport.round_trip(request).await.expect("Round trip should succeed.");
		transport
			.round_trip(HttpRequest::new(Vec::new()))
			.await
			.expect("Round trip should succeed.");

		let seen = inner.seen.lock();

		assert_eq!(seen.len(), 2);

		for request in seen.iter() {
			let auth = authorization(request);

			assert!(auth.starts_with("Bearer "));
			assert_ne!(auth, "Bearer stale");
			assert_eq!(auth.split('.').count(), 3);
			assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
			assert_eq!(
				request.headers().get(USER_AGENT),
				Some(&HeaderValue::from_static(DEFAULT_USER_AGENT))
			);
		}

		assert_eq!(
			seen[0].headers().get(ACCEPT),
			Some(&HeaderValue::from_static("application/json"))
		);
		assert_eq!(
			seen[1].headers().get(ACCEPT),
			Some(&HeaderValue::from_static(GITHUB_V3_MEDIA_TYPE))
		);
	}

	#[tokio::test]
	async fn installation_transport_reuses_cached_token() {
		let inner = Arc::new(RecordingTransport::default());
		let source = Arc::new(ScriptedSource { calls: AtomicUsize::new(0), fail: false });
		let cache = TokenCache::<ScriptedSource>::new(source.clone());
		let transport =
			<InstallationTransport<ScriptedSource, RecordingTransport>>::new(cache, inner.clone());

		for transport in [transport.clone(), transport] {
			transport
				.round_trip(HttpRequest::new(Vec::new()))
				.await
				.expect("Round trip should succeed.");
		}

		let seen = inner.seen.lock();

		assert_eq!(seen.len(), 2);
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert!(seen.iter().all(|request| authorization(request) == "Bearer ghs_1"));
	}

	#[tokio::test]
	async fn credential_failure_prevents_dispatch() {
		let inner = Arc::new(RecordingTransport::default());
		let source = ScriptedSource { calls: AtomicUsize::new(0), fail: true };
		let transport = <InstallationTransport<ScriptedSource, RecordingTransport>>::new(
			TokenCache::<ScriptedSource>::new(source),
			inner.clone(),
		);
		let err = transport
			.round_trip(HttpRequest::new(Vec::new()))
			.await
			.expect_err("Round trip should fail without a credential.");

		assert!(matches!(
			err,
			Error::TokenRetrieval(ref e) if e.status == StatusCode::UNAUTHORIZED
		));
		assert!(inner.seen.lock().is_empty());
	}
}
