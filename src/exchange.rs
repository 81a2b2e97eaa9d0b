//! Installation token exchange.
//!
//! [`TokenExchanger`] signs a fresh App assertion, POSTs it as a bearer credential to the
//! installation's `access_tokens` URL (with an optional repository scope body), and turns
//! the response into an [`AccessToken`]. Non-2xx responses become
//! [`TokenRetrievalError`]s carrying the status and raw body; nothing is retried here.

// crates.io
use oauth2::http::{
	self, Method, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
use serde::{Deserializer, de::Error as DeError};
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Extras, RepositoryScope, TokenSecret},
	error::{ConfigError, TokenRetrievalError},
	http::{
		BodyLimit, DEFAULT_USER_AGENT, GITHUB_V3_MEDIA_TYPE, HttpRequest, RoundTrip, bearer_header,
	},
	jwt::AppIdentity,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Largest token response body the exchanger reads.
pub const MAX_TOKEN_RESPONSE_BYTES: usize = 1 << 20;

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Anything that can produce an installation access token on demand.
pub trait TokenSource
where
	Self: 'static + Send + Sync,
{
	/// Produces a token; implementations decide whether a network call is needed.
	fn token(&self) -> TokenFuture<'_>;
}

/// Redeems App assertions for installation access tokens.
pub struct TokenExchanger<T>
where
	T: ?Sized + RoundTrip,
{
	/// Identity that signs the assertion for each exchange.
	pub identity: AppIdentity,
	/// Installation `access_tokens` URL.
	pub token_url: Url,
	/// Repository narrowing sent with each exchange.
	pub scope: RepositoryScope,
	/// Transport used for the exchange call.
	pub http_client: Arc<T>,
}
impl<T> TokenExchanger<T>
where
	T: ?Sized + RoundTrip,
{
	/// Creates an exchanger for `token_url` without repository narrowing.
	pub fn new(identity: AppIdentity, token_url: Url, http_client: impl Into<Arc<T>>) -> Self {
		Self {
			identity,
			token_url,
			scope: RepositoryScope::default(),
			http_client: http_client.into(),
		}
	}

	/// Replaces the repository scope.
	pub fn with_scope(mut self, scope: RepositoryScope) -> Self {
		self.scope = scope;

		self
	}

	/// Performs one exchange: sign, POST, parse.
	pub async fn exchange(&self) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let assertion = self.identity.sign()?;
				let request = self.build_request(&assertion)?;
				let response = self.http_client.round_trip(request).await?;
				let status = response.status();
				let mut body = response.into_body();

				BodyLimit(MAX_TOKEN_RESPONSE_BYTES).apply(&mut body);

				if !status.is_success() {
					#[cfg(feature = "tracing")]
					tracing::warn!(
						status = status.as_u16(),
						"Token endpoint rejected the exchange."
					);

					return Err(TokenRetrievalError { status, body }.into());
				}

				parse_token_response(status, &body)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Builds the exchange request for an already signed assertion.
	pub fn build_request(&self, assertion: &TokenSecret) -> Result<HttpRequest> {
		let body = self.scope.to_request_body().map_err(ConfigError::ScopeEncode)?;
		let mut builder = http::Request::builder()
			.method(Method::POST)
			.uri(self.token_url.as_str())
			.header(ACCEPT, GITHUB_V3_MEDIA_TYPE)
			.header(USER_AGENT, DEFAULT_USER_AGENT)
			.header(AUTHORIZATION, bearer_header(assertion)?);

		if body.is_some() {
			builder = builder.header(CONTENT_TYPE, "application/json");
		}

		let mut request = builder.body(body.unwrap_or_default()).map_err(ConfigError::from)?;

		request.extensions_mut().insert(BodyLimit(MAX_TOKEN_RESPONSE_BYTES));

		Ok(request)
	}
}
impl<T> TokenSource for TokenExchanger<T>
where
	T: ?Sized + RoundTrip,
{
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(self.exchange())
	}
}
impl<T> Debug for TokenExchanger<T>
where
	T: ?Sized + RoundTrip,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger")
			.field("app_id", &self.identity.app_id)
			.field("token_url", &self.token_url.as_str())
			.field("scope", &self.scope)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	token: String,
	#[serde(default, deserialize_with = "deserialize_expiry")]
	expires_at: Option<OffsetDateTime>,
}

/// Parses a 2xx token response body.
///
/// `token` is required and `expires_at` must be RFC 3339 when present; the whole body is
/// then decoded again, best effort, into the token's [`Extras`].
pub fn parse_token_response(status: StatusCode, body: &[u8]) -> Result<AccessToken> {
	let mut de = serde_json::Deserializer::from_slice(body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::TokenResponseParse { source, status: status.as_u16() })?;
	let mut token = AccessToken::new(parsed.token).with_extras(Extras::from_body(body));

	if let Some(expiry) = parsed.expires_at {
		token = token.with_expires_at(expiry);
	}

	Ok(token)
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	match <Option<String>>::deserialize(deserializer)?.as_deref() {
		None | Some("") => Ok(None),
		Some(raw) => OffsetDateTime::parse(raw, &Rfc3339).map(Some).map_err(DeError::custom),
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use oauth2::http::{HeaderValue, StatusCode};
	use parking_lot::Mutex;
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::{test_app_id, test_app_key},
		auth::TOKEN_TYPE,
		http::{HttpResponse, RoundTripFuture},
		jwt::DEFAULT_ASSERTION_LIFETIME,
	};

	struct CannedTransport {
		status: StatusCode,
		body: Vec<u8>,
		seen: Mutex<Vec<HttpRequest>>,
		calls: AtomicUsize,
	}
	impl CannedTransport {
		fn new(status: StatusCode, body: &[u8]) -> Self {
			Self {
				status,
				body: body.to_vec(),
				seen: Default::default(),
				calls: AtomicUsize::new(0),
			}
		}
	}
	impl RoundTrip for CannedTransport {
		fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.seen.lock().push(request);

			let mut response = HttpResponse::new(self.body.clone());

			*response.status_mut() = self.status;

			Box::pin(async move { Ok(response) })
		}
	}

	fn exchanger(transport: Arc<CannedTransport>) -> TokenExchanger<CannedTransport> {
		let identity = AppIdentity::new(test_app_id(), test_app_key())
			.with_expires(DEFAULT_ASSERTION_LIFETIME);
		let url = Url::parse("https://api.github.com/app/installations/1337/access_tokens")
			.expect("Token URL fixture should parse.");

		TokenExchanger::new(identity, url, transport)
	}

	#[tokio::test]
	async fn exchange_parses_token_expiry_and_extras() {
		let transport = Arc::new(CannedTransport::new(
			StatusCode::CREATED,
			concat!(
				r#"{"token":"v1.abc","expires_at":"2050-01-01T00:00:00Z","#,
				r#""repository_selection":"all","token_type":"bearer"}"#,
			)
			.as_bytes(),
		));
		let token =
			exchanger(transport.clone()).exchange().await.expect("Exchange should succeed.");

		assert_eq!(token.value.expose(), "v1.abc");
		assert_eq!(token.token_type, TOKEN_TYPE);
		assert_eq!(token.expires_at, Some(macros::datetime!(2050-01-01 00:00 UTC)));
		assert_eq!(token.extras.str("repository_selection"), Ok("all"));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

		let seen = transport.seen.lock();
		let request = seen.first().expect("Transport should have seen the request.");
		let auth = request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.expect("Authorization header expected.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.uri(), "https://api.github.com/app/installations/1337/access_tokens");
		assert_eq!(
			request.headers().get(ACCEPT),
			Some(&HeaderValue::from_static(GITHUB_V3_MEDIA_TYPE))
		);
		assert!(auth.starts_with("Bearer "));
		assert_eq!(auth.trim_start_matches("Bearer ").split('.').count(), 3);
		assert!(request.body().is_empty(), "Unscoped exchanges send no body.");
		assert_eq!(BodyLimit::of(request), Some(BodyLimit(MAX_TOKEN_RESPONSE_BYTES)));
	}

	#[tokio::test]
	async fn exchange_without_expiry_has_no_expiry() {
		let transport =
			Arc::new(CannedTransport::new(StatusCode::OK, br#"{"token":"v1.forever"}"#));
		let token = exchanger(transport).exchange().await.expect("Exchange should succeed.");

		assert_eq!(token.expires_at, None);
		assert_eq!(token.extras.len(), 1);
	}

	#[tokio::test]
	async fn non_success_status_carries_status_and_body() {
		let transport = Arc::new(CannedTransport::new(
			StatusCode::BAD_REQUEST,
			br#"{"error":"invalid_grant"}"#,
		));
		let err = exchanger(transport).exchange().await.expect_err("Exchange should fail.");

		match &err {
			Error::TokenRetrieval(inner) => {
				assert_eq!(inner.status, StatusCode::BAD_REQUEST);
				assert_eq!(inner.body_text(), r#"{"error":"invalid_grant"}"#);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let message = err.to_string();

		assert!(message.contains("400 Bad Request"));
		assert!(message.contains(r#"{"error":"invalid_grant"}"#));
	}

	#[tokio::test]
	async fn scoped_exchange_sends_json_body() {
		let transport =
			Arc::new(CannedTransport::new(StatusCode::CREATED, br#"{"token":"v1.scoped"}"#));
		let scope = RepositoryScope::names(["a", "b"])
			.expect("Scope fixture should be valid.")
			.with_ids([42]);

		exchanger(transport.clone())
			.with_scope(scope.clone())
			.exchange()
			.await
			.expect("Exchange should succeed.");

		let seen = transport.seen.lock();
		let request = seen.first().expect("Transport should have seen the request.");
		let decoded: RepositoryScope =
			serde_json::from_slice(request.body()).expect("Body should decode as a scope.");

		assert_eq!(decoded, scope);
		assert_eq!(
			request.headers().get(CONTENT_TYPE),
			Some(&HeaderValue::from_static("application/json"))
		);
	}

	#[test]
	fn required_fields_are_strict() {
		let missing =
			parse_token_response(StatusCode::OK, br#"{"expires_at":"2050-01-01T00:00:00Z"}"#)
				.expect_err("Missing token must fail.");

		assert!(matches!(missing, Error::TokenResponseParse { status: 200, .. }));

		let bad_expiry =
			parse_token_response(StatusCode::OK, br#"{"token":"t","expires_at":"soon"}"#)
				.expect_err("Malformed expiry must fail.");

		match bad_expiry {
			Error::TokenResponseParse { source, .. } =>
				assert_eq!(source.path().to_string(), "expires_at"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn empty_expiry_is_treated_as_absent() {
		let token = parse_token_response(StatusCode::OK, br#"{"token":"t","expires_at":""}"#)
			.expect("Empty expiry should parse.");

		assert_eq!(token.expires_at, None);
	}

	#[test]
	fn oversized_bodies_are_truncated_before_parsing() {
		let mut body = br#"{"token":"t"}"#.to_vec();

		body.resize(MAX_TOKEN_RESPONSE_BYTES + 10, b' ');
		BodyLimit(MAX_TOKEN_RESPONSE_BYTES).apply(&mut body);

		assert_eq!(body.len(), MAX_TOKEN_RESPONSE_BYTES);
		assert!(parse_token_response(StatusCode::OK, &body).is_ok());
	}
}
