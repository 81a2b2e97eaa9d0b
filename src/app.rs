//! Composition roots wiring identities, caches, and transports into ready clients.
//!
//! [`AppConfig`] authenticates as the App itself; [`AppConfig::installation`] (or the
//! [`InstallationConfig`] constructors) derives an installation client that exchanges and
//! caches installation tokens.

pub mod installation;

pub use installation::{InstallationConfig, InstallationTokenCache};

// self
use crate::{
	_prelude::*,
	auth::{AppId, InstallationId},
	endpoint::Endpoint,
	http::RoundTrip,
	jwt::{AppIdentity, DEFAULT_ASSERTION_LIFETIME},
	key::AppKey,
	transport::AppTransport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// App-level client configuration.
pub struct AppConfig<T>
where
	T: ?Sized + RoundTrip,
{
	/// Identity used to sign each request.
	pub identity: AppIdentity,
	/// API host requests and token URLs resolve against.
	pub endpoint: Endpoint,
	/// Transport that carries the signed requests.
	pub http_client: Arc<T>,
}
#[cfg(feature = "reqwest")]
impl AppConfig<ReqwestHttpClient> {
	/// Configures the public GitHub API with a default reqwest transport.
	pub fn new(app_id: AppId, key: impl Into<Arc<AppKey>>) -> Result<Self> {
		Ok(Self::with_transport(app_id, key, Endpoint::public()?, ReqwestHttpClient::default()))
	}

	/// Configures a GitHub Enterprise Server API host with a default reqwest transport.
	pub fn enterprise(base_url: &str, app_id: AppId, key: impl Into<Arc<AppKey>>) -> Result<Self> {
		Ok(Self::with_transport(
			app_id,
			key,
			Endpoint::enterprise(base_url)?,
			ReqwestHttpClient::default(),
		))
	}
}
impl<T> AppConfig<T>
where
	T: ?Sized + RoundTrip,
{
	/// Builds a configuration over an arbitrary transport; assertions last ten minutes.
	pub fn with_transport(
		app_id: AppId,
		key: impl Into<Arc<AppKey>>,
		endpoint: Endpoint,
		http_client: impl Into<Arc<T>>,
	) -> Self {
		Self {
			identity: AppIdentity::new(app_id, key).with_expires(DEFAULT_ASSERTION_LIFETIME),
			endpoint,
			http_client: http_client.into(),
		}
	}

	/// Replaces the transport.
	pub fn with_http_client<U>(self, http_client: impl Into<Arc<U>>) -> AppConfig<U>
	where
		U: ?Sized + RoundTrip,
	{
		AppConfig {
			identity: self.identity,
			endpoint: self.endpoint,
			http_client: http_client.into(),
		}
	}

	/// Overrides the assertion lifetime; non-positive values drop the `exp` claim.
	pub fn with_expires(mut self, lifetime: Duration) -> Self {
		self.identity = self.identity.with_expires(lifetime);

		self
	}

	/// Resolves an API path against the configured host.
	pub fn url(&self, path: &str) -> Result<Url> {
		self.endpoint.resolve(path)
	}

	/// Builds a transport that signs every request as the App.
	pub fn transport(&self) -> AppTransport<T> {
		AppTransport::new(self.identity.clone(), self.http_client.clone())
	}

	/// Derives the configuration for one of this App's installations.
	///
	/// The installation shares the identity, host, and transport of the App.
	pub fn installation(&self, installation_id: InstallationId) -> Result<InstallationConfig<T>> {
		InstallationConfig::with_transport(
			self.identity.clone(),
			installation_id,
			self.endpoint.clone(),
			self.http_client.clone(),
		)
	}
}
impl<T> Debug for AppConfig<T>
where
	T: ?Sized + RoundTrip,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppConfig")
			.field("identity", &self.identity)
			.field("endpoint", &self.endpoint.base().as_str())
			.finish()
	}
}
