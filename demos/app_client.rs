//! Demonstrates authenticating as a GitHub App: every request through the App transport
//! carries a freshly signed assertion.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use github_app_auth::{
	app::AppConfig,
	auth::AppId,
	http::RoundTrip,
	http_types::{Method, Request},
	key::AppKey,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let app_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/app").header_exists("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":4242,\"slug\":\"demo-app\"}");
		})
		.await;
	let key = AppKey::parse(include_bytes!("../tests/fixtures/app-key.pem"))?;

	println!("Loaded App key with fingerprint {}.", key.fingerprint());

	let config = AppConfig::enterprise(&server.base_url(), AppId::new("4242")?, key)?;
	let transport = config.transport();

	for attempt in 1..=2 {
		let request = Request::builder()
			.method(Method::GET)
			.uri(config.url("app")?.as_str())
			.body(Vec::new())?;
		let response = transport.round_trip(request).await?;

		println!(
			"Attempt {attempt}: {} {}.",
			response.status(),
			String::from_utf8_lossy(response.body())
		);
	}

	app_mock.assert_calls_async(2).await;

	Ok(())
}
