//! Coordinator-level error types shared across the session, transport, and response layers.
//!
//! Every variant is cheap to clone so a single outcome can be handed to each caller that joined
//! a deduplicated request.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error surfaced by coordinator operations.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Session check or CSRF token acquisition failed.
	#[error(transparent)]
	Session(#[from] SessionError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The backend answered with a non-2xx status.
	#[error("{message}")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Message extracted from the error body, or a status-derived fallback.
		message: String,
	},
	/// A JSON response body could not be decoded.
	#[error("Failed to parse response.")]
	Parse {
		/// HTTP status code of the response being decoded.
		status: u16,
		/// Structured decoding failure with the offending field path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// The request did not settle within the configured timeout.
	#[error("Request timed out after {after}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// The request was dropped by the scheduler before it could be dispatched.
	#[error("Request was cancelled before it was dispatched.")]
	Cancelled,
}
impl Error {
	/// Returns the HTTP status tied to this error, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } | Self::Parse { status, .. } => Some(*status),
			Self::Session(SessionError::SessionInvalid { status }) => *status,
			Self::Session(SessionError::TokenFetchFailed { status, .. }) => *status,
			_ => None,
		}
	}

	pub(crate) fn parse(
		status: u16,
		source: serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		Self::Parse { status, source: Arc::new(source) }
	}
}

/// Configuration and request construction failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying `http` builder failure.
		#[source]
		source: Arc<http::Error>,
	},
	/// A request path could not be resolved against the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Path or URL that failed to resolve.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains characters that cannot be sent.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeaderValue {
		/// Header name.
		name: String,
	},
	/// A GET request carries a body that cannot be expressed as query pairs.
	#[error("GET request `{path}` has a body that is not a JSON object.")]
	GetBodyNotObject {
		/// Path of the offending request.
		path: String,
	},
	/// A request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize {
		/// Underlying serializer failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<http::Error> for ConfigError {
	fn from(e: http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::BodySerialize { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Session and CSRF token failures.
///
/// Requests never fail because of these; they proceed without a token header and the backend
/// decides. The variants surface through [`RequestCoordinator::refresh_session`].
///
/// [`RequestCoordinator::refresh_session`]: crate::RequestCoordinator::refresh_session
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// The auth-check endpoint rejected the session cookie.
	#[error("Auth check failed; the session may be invalid.")]
	SessionInvalid {
		/// HTTP status returned by the auth check.
		status: Option<u16>,
	},
	/// The session is valid but no usable CSRF token was issued.
	#[error("CSRF token fetch failed: {reason}.")]
	TokenFetchFailed {
		/// Human-readable failure summary.
		reason: String,
		/// HTTP status returned by the token endpoint, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
