//! RS256 App assertions.
//!
//! An assertion is `base64url(header) "." base64url(claims) "." base64url(signature)`,
//! with the header fixed to `{"alg":"RS256","typ":"JWT"}` and the signature computed over
//! the first two segments. Every call to [`AppIdentity::sign`] builds a fresh claim set from
//! the current clock; nothing is cached.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::{AppId, TokenSecret},
	error::SigningError,
	key::AppKey,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Assertion lifetime used by the App and installation configurations.
pub const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::minutes(10);

/// Fixed JOSE header of every assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
	/// Signing algorithm; always `RS256`.
	pub alg: Cow<'static, str>,
	/// Token type; always `JWT`.
	pub typ: Cow<'static, str>,
}
impl JwtHeader {
	/// The only header this crate emits.
	pub const RS256: Self = Self { alg: Cow::Borrowed("RS256"), typ: Cow::Borrowed("JWT") };
}

/// Claims signed into an assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
	/// Issuer; the App identifier.
	pub iss: String,
	/// Expiry as a Unix timestamp, omitted when the identity has no lifetime.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
}
impl ClaimSet {
	/// Builds the claim set for `identity` as of `now`.
	pub fn at(identity: &AppIdentity, now: OffsetDateTime) -> Self {
		Self {
			iss: identity.app_id.to_string(),
			exp: identity.expires.map(|lifetime| (now + lifetime).unix_timestamp()),
		}
	}
}

/// Credentials needed to sign assertions as a GitHub App.
///
/// The key is shared read-only; cloning an identity never copies key material.
#[derive(Clone, Debug)]
pub struct AppIdentity {
	/// App identifier placed in the `iss` claim.
	pub app_id: AppId,
	/// Signing key.
	pub key: Arc<AppKey>,
	/// Lifetime of each assertion; `None` omits the `exp` claim.
	pub expires: Option<Duration>,
}
impl AppIdentity {
	/// Creates an identity whose assertions carry no expiry.
	pub fn new(app_id: AppId, key: impl Into<Arc<AppKey>>) -> Self {
		Self { app_id, key: key.into(), expires: None }
	}

	/// Sets the assertion lifetime; non-positive durations remove the `exp` claim.
	pub fn with_expires(mut self, lifetime: Duration) -> Self {
		self.expires = if lifetime.is_positive() { Some(lifetime) } else { None };

		self
	}

	/// Signs a fresh assertion using the current clock.
	pub fn sign(&self) -> Result<TokenSecret> {
		self.sign_at(OffsetDateTime::now_utc())
	}

	/// Signs a fresh assertion as of `now`.
	pub fn sign_at(&self, now: OffsetDateTime) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::AppAssertion;

		let _span = FlowSpan::new(KIND, "sign").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = encode(&JwtHeader::RS256, &ClaimSet::at(self, now), &self.key);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result.map(TokenSecret::new).map_err(Error::from)
	}
}

/// Produces the compact `header.claims.signature` form.
pub fn encode(
	header: &JwtHeader,
	claims: &ClaimSet,
	key: &AppKey,
) -> Result<String, SigningError> {
	let header = serde_json::to_vec(header).map_err(SigningError::Serialize)?;
	let claims = serde_json::to_vec(claims).map_err(SigningError::Serialize)?;
	let signing_input =
		format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
	// Already base64url without padding.
	let signature =
		jsonwebtoken::crypto::sign(signing_input.as_bytes(), key.encoding_key(), Algorithm::RS256)
			.map_err(SigningError::Signature)?;

	Ok(format!("{signing_input}.{signature}"))
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::{test_app_id, test_app_key};

	fn decode_segment<T>(segment: &str) -> T
	where
		T: for<'de> Deserialize<'de>,
	{
		let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Segment should be base64url.");

		serde_json::from_slice(&bytes).expect("Segment should hold JSON.")
	}

	#[test]
	fn assertion_has_three_base64url_segments() {
		let identity = AppIdentity::new(test_app_id(), test_app_key())
			.with_expires(DEFAULT_ASSERTION_LIFETIME);
		let now = macros::datetime!(2030-06-01 12:00 UTC);
		let assertion = identity.sign_at(now).expect("Signing should succeed.");
		let segments = assertion.expose().split('.').collect::<Vec<_>>();

		assert_eq!(segments.len(), 3);

		for segment in &segments {
			assert!(!segment.is_empty());
			assert!(!segment.contains('='), "Segments must not be padded.");
			assert!(URL_SAFE_NO_PAD.decode(segment).is_ok());
		}

		let header: JwtHeader = decode_segment(segments[0]);
		let claims: ClaimSet = decode_segment(segments[1]);

		assert_eq!(header, JwtHeader::RS256);
		assert_eq!(claims.iss, "4242");
		assert_eq!(claims.exp, Some((now + Duration::minutes(10)).unix_timestamp()));
	}

	#[test]
	fn assertions_without_expiry_omit_exp() {
		let identity = AppIdentity::new(test_app_id(), test_app_key());
		let first = identity.sign().expect("First signature should succeed.");
		let second = identity.sign().expect("Second signature should succeed.");
		let claims_of = |secret: &TokenSecret| {
			let segment = secret.expose().split('.').nth(1).expect("Claims segment expected.");
			let bytes = URL_SAFE_NO_PAD.decode(segment).expect("Claims should be base64url.");

			serde_json::from_slice::<serde_json::Value>(&bytes).expect("Claims should be JSON.")
		};

		assert_eq!(claims_of(&first), serde_json::json!({ "iss": "4242" }));
		assert_eq!(claims_of(&first), claims_of(&second));
		// PKCS#1 v1.5 signatures are deterministic, so identical claims sign identically.
		assert_eq!(first, second);
	}

	#[test]
	fn non_positive_lifetime_disables_expiry() {
		let identity =
			AppIdentity::new(test_app_id(), test_app_key()).with_expires(Duration::ZERO);

		assert_eq!(identity.expires, None);
		assert_eq!(ClaimSet::at(&identity, OffsetDateTime::now_utc()).exp, None);
	}
}
