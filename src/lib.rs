//! GitHub App and installation credentials: RS256 app assertions, single-flight installation
//! token caching, and an HTTP transport that injects whichever credential is current.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod app;
pub mod auth;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod http;
pub mod jwt;
pub mod key;
pub mod obs;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AppId, InstallationId},
		http::ReqwestHttpClient,
		key::AppKey,
	};

	/// PKCS#1 RSA key used by tests; never use it outside fixtures.
	pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/app-key.pem");

	/// Parses [`TEST_PRIVATE_KEY_PEM`].
	pub fn test_app_key() -> AppKey {
		AppKey::parse(TEST_PRIVATE_KEY_PEM.as_bytes()).expect("Test private key should parse.")
	}

	/// App identifier shared by tests.
	pub fn test_app_id() -> AppId {
		AppId::new("4242").expect("Test app identifier should be valid.")
	}

	/// Installation identifier shared by tests.
	pub fn test_installation_id() -> InstallationId {
		InstallationId::new("1337").expect("Test installation identifier should be valid.")
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}
}

mod _prelude {
	pub use std::{
		borrow::Cow,
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
