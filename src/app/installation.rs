//! Installation-level client configuration.

// std
use std::sync::OnceLock;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, InstallationId, RepositoryScope},
	cache::{NoExpiryPolicy, TokenCache},
	endpoint::Endpoint,
	error::ConfigError,
	exchange::TokenExchanger,
	http::RoundTrip,
	jwt::AppIdentity,
	transport::InstallationTransport,
};
#[cfg(feature = "reqwest")]
use crate::{auth::AppId, http::ReqwestHttpClient, jwt::DEFAULT_ASSERTION_LIFETIME, key::AppKey};

/// Token cache used by an [`InstallationConfig`] over transport `T`.
pub type InstallationTokenCache<T> = TokenCache<TokenExchanger<T>>;

/// Configuration for acting as one installation of an App.
///
/// The token cache is created lazily on first use and shared by every transport built from
/// this configuration. Setters that change what an exchange would send start from a fresh
/// cache; tokens issued before the change stay with transports that already hold them.
pub struct InstallationConfig<T>
where
	T: ?Sized + RoundTrip,
{
	identity: AppIdentity,
	installation_id: InstallationId,
	endpoint: Endpoint,
	token_url: Url,
	scope: RepositoryScope,
	no_expiry: NoExpiryPolicy,
	refresh_margin: Duration,
	http_client: Arc<T>,
	cache: OnceLock<Arc<InstallationTokenCache<T>>>,
}
#[cfg(feature = "reqwest")]
impl InstallationConfig<ReqwestHttpClient> {
	/// Configures an installation on the public GitHub API with a default reqwest transport.
	pub fn new(
		app_id: AppId,
		installation_id: InstallationId,
		key: impl Into<Arc<AppKey>>,
	) -> Result<Self> {
		Self::with_transport(
			AppIdentity::new(app_id, key).with_expires(DEFAULT_ASSERTION_LIFETIME),
			installation_id,
			Endpoint::public()?,
			ReqwestHttpClient::default(),
		)
	}

	/// Configures an installation on a GitHub Enterprise Server host with a default reqwest
	/// transport.
	pub fn enterprise(
		base_url: &str,
		app_id: AppId,
		installation_id: InstallationId,
		key: impl Into<Arc<AppKey>>,
	) -> Result<Self> {
		Self::with_transport(
			AppIdentity::new(app_id, key).with_expires(DEFAULT_ASSERTION_LIFETIME),
			installation_id,
			Endpoint::enterprise(base_url)?,
			ReqwestHttpClient::default(),
		)
	}
}
impl<T> InstallationConfig<T>
where
	T: ?Sized + RoundTrip,
{
	/// Builds a configuration over an arbitrary transport.
	pub fn with_transport(
		identity: AppIdentity,
		installation_id: InstallationId,
		endpoint: Endpoint,
		http_client: impl Into<Arc<T>>,
	) -> Result<Self> {
		let token_url = endpoint.installation_token_url(&installation_id)?;

		Ok(Self {
			identity,
			installation_id,
			endpoint,
			token_url,
			scope: RepositoryScope::default(),
			no_expiry: NoExpiryPolicy::default(),
			refresh_margin: Duration::ZERO,
			http_client: http_client.into(),
			cache: OnceLock::new(),
		})
	}

	/// Replaces the transport used for exchanges and API requests.
	pub fn with_http_client<U>(self, http_client: impl Into<Arc<U>>) -> InstallationConfig<U>
	where
		U: ?Sized + RoundTrip,
	{
		InstallationConfig {
			identity: self.identity,
			installation_id: self.installation_id,
			endpoint: self.endpoint,
			token_url: self.token_url,
			scope: self.scope,
			no_expiry: self.no_expiry,
			refresh_margin: self.refresh_margin,
			http_client: http_client.into(),
			cache: OnceLock::new(),
		}
	}

	/// Narrows issued tokens to the named repositories.
	pub fn with_repositories<I, S>(self, names: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let scope = self.scope.clone().with_names(names).map_err(ConfigError::from)?;

		Ok(self.with_scope(scope))
	}

	/// Narrows issued tokens to the given repository identifiers.
	pub fn with_repository_ids(self, ids: impl IntoIterator<Item = u64>) -> Self {
		let scope = self.scope.clone().with_ids(ids);

		self.with_scope(scope)
	}

	/// Replaces the whole repository scope.
	pub fn with_scope(mut self, scope: RepositoryScope) -> Self {
		self.scope = scope;
		self.cache = OnceLock::new();

		self
	}

	/// Sets how tokens without expiry are cached.
	pub fn with_no_expiry_policy(mut self, policy: NoExpiryPolicy) -> Self {
		self.no_expiry = policy;
		self.cache = OnceLock::new();

		self
	}

	/// Refreshes tokens `margin` before they expire.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = margin;
		self.cache = OnceLock::new();

		self
	}

	/// Identity signing the exchange assertions.
	pub fn identity(&self) -> &AppIdentity {
		&self.identity
	}

	/// Installation this configuration acts as.
	pub fn installation_id(&self) -> &InstallationId {
		&self.installation_id
	}

	/// Repository scope sent with each exchange.
	pub fn scope(&self) -> &RepositoryScope {
		&self.scope
	}

	/// URL that mints this installation's access tokens.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Resolves an API path against the configured host.
	pub fn url(&self, path: &str) -> Result<Url> {
		self.endpoint.resolve(path)
	}

	/// Shared token cache, created on first use.
	pub fn token_cache(&self) -> Arc<InstallationTokenCache<T>> {
		self.cache
			.get_or_init(|| {
				let exchanger = TokenExchanger::new(
					self.identity.clone(),
					self.token_url.clone(),
					self.http_client.clone(),
				)
				.with_scope(self.scope.clone());

				Arc::new(
					TokenCache::new(exchanger)
						.with_no_expiry_policy(self.no_expiry)
						.with_refresh_margin(self.refresh_margin),
				)
			})
			.clone()
	}

	/// Builds a transport that authenticates every request with the cached token.
	pub fn transport(&self) -> InstallationTransport<TokenExchanger<T>, T> {
		InstallationTransport::new(self.token_cache(), self.http_client.clone())
	}

	/// Returns a valid installation token, exchanging only when the cached one is stale.
	pub async fn token(&self) -> Result<Arc<AccessToken>> {
		self.token_cache().get_token().await
	}

	/// Permissions granted to the current token, keyed by permission name.
	pub async fn permissions(&self) -> Result<BTreeMap<String, String>> {
		let token = self.token().await?;

		Ok(token.extras.string_map("permissions")?)
	}

	/// Repository selection mode of the current token (`all` or `selected`).
	pub async fn repository_selection(&self) -> Result<String> {
		let token = self.token().await?;

		Ok(token.extras.str("repository_selection")?.to_owned())
	}
}
impl<T> Debug for InstallationConfig<T>
where
	T: ?Sized + RoundTrip,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationConfig")
			.field("app_id", &self.identity.app_id)
			.field("installation_id", &self.installation_id)
			.field("token_url", &self.token_url.as_str())
			.field("scope", &self.scope)
			.field("no_expiry", &self.no_expiry)
			.finish()
	}
}
