//! GitHub API endpoint resolution for public and enterprise hosts.

// self
use crate::{_prelude::*, auth::InstallationId, error::ConfigError};

/// Public GitHub REST API host.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Immutable API base URL.
///
/// The base path always ends in `/`, so `https://ghe.example.com/api/v3` and
/// `https://ghe.example.com/api/v3/` behave the same. Paths are resolved with URL reference
/// resolution rather than string concatenation: relative paths extend the base path, an
/// absolute path such as `/meta` replaces it, and `..` segments and query strings follow the
/// URL standard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	base: Url,
}
impl Endpoint {
	/// Endpoint for the public GitHub API.
	pub fn public() -> Result<Self> {
		Self::parse(DEFAULT_API_URL)
	}

	/// Endpoint for a GitHub Enterprise Server API host.
	pub fn enterprise(url: &str) -> Result<Self> {
		Self::parse(url)
	}

	fn parse(raw: &str) -> Result<Self> {
		let mut base = Url::parse(raw)
			.map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })?;

		if base.cannot_be_a_base() {
			return Err(ConfigError::NotABaseUrl { url: raw.to_owned() }.into());
		}
		// Relative references must extend the base path, not replace its last segment.
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		Ok(Self { base })
	}

	/// Base URL this endpoint resolves against.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Resolves `reference` against the base URL.
	pub fn resolve(&self, reference: &str) -> Result<Url> {
		self.base
			.join(reference)
			.map_err(|source| ConfigError::InvalidUrl { url: reference.to_owned(), source }.into())
	}

	/// URL that mints access tokens for `installation`.
	pub fn installation_token_url(&self, installation: &InstallationId) -> Result<Url> {
		self.resolve(&format!("app/installations/{installation}/access_tokens"))
	}
}
