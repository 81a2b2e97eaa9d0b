//! Installation access tokens and their freshness rules.

// self
use crate::{
	_prelude::*,
	auth::token::{extras::Extras, secret::TokenSecret},
};

/// Token type reported for every installation access token, whatever the server sent.
pub const TOKEN_TYPE: &str = "token";

/// Freshness of a token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// The instant is strictly before the expiry, or the token has no expiry.
	Valid,
	/// The instant is at or after the expiry.
	Stale,
}

/// Immutable access token issued for an installation.
#[derive(Clone, PartialEq)]
pub struct AccessToken {
	/// Token value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Always [`TOKEN_TYPE`].
	pub token_type: &'static str,
	/// Absolute expiry, when the response carried `expires_at`.
	pub expires_at: Option<OffsetDateTime>,
	/// Every top-level response field, including `permissions` and `repository_selection`.
	pub extras: Extras,
}
impl AccessToken {
	/// Creates a token without expiry or extras.
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: TokenSecret::new(value),
			token_type: TOKEN_TYPE,
			expires_at: None,
			extras: Extras::default(),
		}
	}

	/// Sets the absolute expiry.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Attaches the extras bag.
	pub fn with_extras(mut self, extras: Extras) -> Self {
		self.extras = extras;

		self
	}

	/// Computes the status at `instant`; the expiry instant itself is already stale.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expires_at {
			Some(expiry) if instant >= expiry => TokenStatus::Stale,
			_ => TokenStatus::Valid,
		}
	}

	/// Returns `true` if the token is stale at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Stale)
	}

	/// Remaining lifetime at `instant`, or `None` for tokens without expiry.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|expiry| expiry - instant)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.field("extras", &self.extras.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_boundary_is_stale() {
		let expiry = macros::datetime!(2050-01-01 00:00 UTC);
		let token = AccessToken::new("v1.abc").with_expires_at(expiry);

		assert_eq!(token.status_at(expiry - Duration::nanoseconds(1)), TokenStatus::Valid);
		assert_eq!(token.status_at(expiry), TokenStatus::Stale);
		assert_eq!(token.status_at(expiry + Duration::seconds(1)), TokenStatus::Stale);
		assert_eq!(
			token.remaining_at(macros::datetime!(2049-12-31 23:00 UTC)),
			Some(Duration::hours(1))
		);
	}

	#[test]
	fn tokens_without_expiry_never_go_stale() {
		let token = AccessToken::new("v1.forever");

		assert_eq!(token.token_type, TOKEN_TYPE);
		assert!(!token.is_expired_at(macros::datetime!(9999-12-31 23:59 UTC)));
		assert_eq!(token.remaining_at(OffsetDateTime::now_utc()), None);
	}

	#[test]
	fn debug_redacts_value() {
		let rendered = format!("{:?}", AccessToken::new("ghs_visible"));

		assert!(!rendered.contains("ghs_visible"));
		assert!(rendered.contains("<redacted>"));
	}
}
