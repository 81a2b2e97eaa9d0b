//! Demonstrates acting as an installation: the first request exchanges an App assertion for
//! an installation token, later requests reuse it until it goes stale.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use github_app_auth::{
	app::AppConfig,
	auth::{AppId, InstallationId},
	http::RoundTrip,
	http_types::{Method, Request},
	key::AppKey,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let exchange_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/app/installations/1337/access_tokens");
			then.status(201).json_body(serde_json::json!({
				"token": "ghs_demo",
				"expires_at": "2050-01-01T00:00:00Z",
				"permissions": { "contents": "read", "metadata": "read" },
				"repository_selection": "selected"
			}));
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/installation/repositories")
				.header("authorization", "Bearer ghs_demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"total_count\":1,\"repositories\":[{\"name\":\"octo-repo\"}]}");
		})
		.await;
	let key = AppKey::parse(include_bytes!("../tests/fixtures/app-key.pem"))?;
	let installation = AppConfig::enterprise(&server.base_url(), AppId::new("4242")?, key)?
		.installation(InstallationId::new("1337")?)?
		.with_repositories(["octo-repo"])?;
	let transport = installation.transport();

	for attempt in 1..=3 {
		let request = Request::builder()
			.method(Method::GET)
			.uri(installation.url("installation/repositories")?.as_str())
			.body(Vec::new())?;
		let response = transport.round_trip(request).await?;

		println!("Attempt {attempt}: {}.", response.status());
	}

	println!("Repository selection: {}.", installation.repository_selection().await?);

	for (permission, access) in installation.permissions().await? {
		println!("Permission {permission}: {access}.");
	}

	let metrics = installation.token_cache().metrics();

	println!("Cache hits: {}, exchanges: {}.", metrics.hits(), metrics.exchanges());

	exchange_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(3).await;

	Ok(())
}
