//! Crate-level error types shared by the signer, exchanger, cache, and transports.

// std
use std::path::PathBuf;
// crates.io
use oauth2::http::StatusCode;
// self
use crate::{_prelude::*, auth::ExtraError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (bad key, bad URL, bad identifier).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Assertion could not be produced.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Token endpoint answered with a non-2xx status.
	#[error(transparent)]
	TokenRetrieval(#[from] TokenRetrievalError),
	/// Token endpoint answered 2xx but the required fields did not parse.
	#[error("Token endpoint returned a malformed token response.")]
	TokenResponseParse {
		/// Structured parsing failure naming the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Extras lookup failed.
	#[error(transparent)]
	Extra(#[from] ExtraError),
}

/// Configuration and validation failures; never retried.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A base URL or relative reference could not be parsed.
	#[error("`{url}` is not a valid URL.")]
	InvalidUrl {
		/// Offending input.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL parsed but cannot carry relative references (e.g. `mailto:`).
	#[error("`{url}` cannot be used as an API base URL.")]
	NotABaseUrl {
		/// Offending input.
		url: String,
	},
	/// Private key file could not be read.
	#[error("Failed to read private key from `{}`.", path.display())]
	KeyRead {
		/// Path that was attempted.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Private key bytes are not a usable RSA key.
	#[error("Private key is not a valid RSA signing key.")]
	InvalidKey {
		/// Underlying parsing or validation failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// App or installation identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Repository scope failed validation.
	#[error(transparent)]
	InvalidScope(#[from] crate::auth::RepositoryScopeError),
	/// Repository scope could not be encoded as a request body.
	#[error("Repository scope could not be encoded.")]
	ScopeEncode(#[source] serde_json::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Credential could not be encoded as a header value.
	#[error("Credential contains characters that are not allowed in an HTTP header.")]
	InvalidHeaderValue(#[from] oauth2::http::header::InvalidHeaderValue),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while producing a signed assertion.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// Header or claim set could not be serialized.
	#[error("Assertion header or claims could not be serialized.")]
	Serialize(#[source] serde_json::Error),
	/// The signature operation itself failed.
	#[error("Assertion signature could not be computed.")]
	Signature(#[source] jsonwebtoken::errors::Error),
}

/// Non-2xx response from the token endpoint.
///
/// The raw body is kept verbatim for diagnostics; callers decide whether to retry.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Cannot fetch token: {status}\nResponse: {}", String::from_utf8_lossy(.body))]
pub struct TokenRetrievalError {
	/// HTTP status returned by the token endpoint.
	pub status: StatusCode,
	/// Response body, truncated to the exchanger's read limit.
	pub body: Vec<u8>,
}
impl TokenRetrievalError {
	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn body_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

/// Transport-level failures: the request never produced a response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for a response.
	#[error("Request timed out.")]
	TimedOut {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timed_out(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::TimedOut { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timed_out(e) } else { Self::network(e) }
	}
}
