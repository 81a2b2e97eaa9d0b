//! Demonstrates plugging a custom [`RoundTrip`] implementation underneath the installation
//! client.
//!
//! 1. Implement [`RoundTrip`] for any `Send + Sync + 'static` type.
//! 2. Hand it to [`InstallationConfig::with_transport`] together with an [`AppIdentity`].
//! 3. Requests sent through [`InstallationConfig::transport`] reach the custom transport with
//!    the installation token already attached.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
// self
use github_app_auth::{
	app::InstallationConfig,
	auth::{AppId, InstallationId},
	endpoint::Endpoint,
	error::Error,
	http::{HttpRequest, HttpResponse, RoundTrip, RoundTripFuture},
	http_types::{Method, Request, StatusCode, header::AUTHORIZATION},
	jwt::{AppIdentity, DEFAULT_ASSERTION_LIFETIME},
	key::AppKey,
};

/// In-memory stand-in for the GitHub API.
#[derive(Default)]
struct InMemoryGitHub {
	exchanges: AtomicUsize,
	reject_exchanges: bool,
}
impl InMemoryGitHub {
	fn respond(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}
}
impl RoundTrip for InMemoryGitHub {
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
		let response = if request.uri().path().ends_with("/access_tokens") {
			let call = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;

			if self.reject_exchanges {
				Self::respond(StatusCode::UNAUTHORIZED, "{\"message\":\"Bad credentials\"}")
			} else {
				let body = format!(
					"{{\"token\":\"ghs_memory_{call}\",\"expires_at\":\"2050-01-01T00:00:00Z\"}}"
				);

				Self::respond(StatusCode::CREATED, &body)
			}
		} else {
			let caller = request
				.headers()
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.unwrap_or("anonymous")
				.to_owned();

			Self::respond(StatusCode::OK, &format!("{{\"caller\":\"{caller}\"}}"))
		};

		Box::pin(async move { Ok(response) })
	}
}

fn identity() -> Result<AppIdentity> {
	let key = AppKey::parse(include_bytes!("../tests/fixtures/app-key.pem"))?;

	Ok(AppIdentity::new(AppId::new("4242")?, key).with_expires(DEFAULT_ASSERTION_LIFETIME))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let github = Arc::new(InMemoryGitHub::default());
	let installation = <InstallationConfig<InMemoryGitHub>>::with_transport(
		identity()?,
		InstallationId::new("1337")?,
		Endpoint::public()?,
		github.clone(),
	)?;
	let transport = installation.transport();

	for attempt in 1..=2 {
		let request = Request::builder()
			.method(Method::GET)
			.uri(installation.url("installation/repositories")?.as_str())
			.body(Vec::new())?;
		let response = transport.round_trip(request).await?;

		println!("Attempt {attempt}: {}.", String::from_utf8_lossy(response.body()));
	}

	println!("Exchanges performed: {}.", github.exchanges.load(Ordering::SeqCst));

	let rejecting = <InstallationConfig<InMemoryGitHub>>::with_transport(
		identity()?,
		InstallationId::new("1337")?,
		Endpoint::public()?,
		InMemoryGitHub { reject_exchanges: true, ..Default::default() },
	)?;

	match rejecting.token().await {
		Err(Error::TokenRetrieval(e)) =>
			println!("Exchange rejected with {}: {}.", e.status, e.body_text()),
		other => println!("Unexpected outcome: {other:?}."),
	}

	Ok(())
}
