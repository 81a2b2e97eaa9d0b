//! Round-trip transport seam shared by the token exchanger and the authenticating
//! transports.
//!
//! [`RoundTrip`] is the crate's only dependency on an HTTP stack: it takes an
//! [`HttpRequest`] and resolves to an [`HttpResponse`] with the full (possibly limited)
//! body. Decorators such as [`AuthTransport`](crate::transport::AuthTransport) implement the
//! same trait, so they stack over any inner transport. Requests may carry a [`BodyLimit`]
//! extension; transports that stream bodies should stop reading once it is reached.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::http::HeaderValue;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};
#[cfg(feature = "reqwest")] use crate::error::TransportError;

pub use oauth2::{HttpRequest, HttpResponse};

/// Media type GitHub expects for v3 REST calls and token exchanges.
pub const GITHUB_V3_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
/// `User-Agent` sent when a request does not carry one; GitHub rejects requests without it.
pub const DEFAULT_USER_AGENT: &str = concat!("github-app-auth/", env!("CARGO_PKG_VERSION"));

/// Boxed future returned by [`RoundTrip::round_trip`].
pub type RoundTripFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Executes one HTTP request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can serve many
/// concurrent callers, and the returned future must be `Send`.
pub trait RoundTrip
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the response.
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_>;
}
impl<T> RoundTrip for Arc<T>
where
	T: ?Sized + RoundTrip,
{
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
		(**self).round_trip(request)
	}
}

/// Upper bound on the number of response body bytes a caller wants to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyLimit(pub usize);
impl BodyLimit {
	/// Reads the limit attached to `request`, if any.
	pub fn of(request: &HttpRequest) -> Option<Self> {
		request.extensions().get::<Self>().copied()
	}

	/// Truncates `body` to the limit.
	pub fn apply(self, body: &mut Vec<u8>) {
		body.truncate(self.0);
	}
}

/// Renders `Bearer <secret>` as a sensitive header value.
pub fn bearer_header(secret: &TokenSecret) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(&secret.bearer()).map_err(ConfigError::from)?;

	value.set_sensitive(true);

	Ok(value)
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Bodies are streamed chunk by chunk and reading stops at the request's [`BodyLimit`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl RoundTrip for ReqwestHttpClient {
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let limit = BodyLimit::of(&request);
			let request: reqwest::Request = request.try_into().map_err(ConfigError::from)?;
			let mut response = client.execute(request).await.map_err(TransportError::from)?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let mut body = Vec::new();

			while let Some(chunk) = response.chunk().await.map_err(TransportError::from)? {
				match limit {
					Some(BodyLimit(max)) => {
						let room = max.saturating_sub(body.len());

						body.extend_from_slice(&chunk[..chunk.len().min(room)]);

						if body.len() >= max {
							break;
						}
					},
					None => body.extend_from_slice(&chunk),
				}
			}

			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
