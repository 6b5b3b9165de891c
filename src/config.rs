//! Client configuration consumed by the request coordinator.
//!
//! [`ClientConfig`] carries the backend base URL, the resolved session endpoints, the CSRF
//! header name, and the token and batching policies. Build it with [`ClientConfig::builder`]
//! so endpoint paths and header names are validated once, up front.

/// Builder API for assembling client configurations.
pub mod builder;
/// Token and batching policy knobs.
pub mod policy;

pub use builder::*;
pub use policy::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Session endpoints resolved against the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
	/// Endpoint that answers 2xx while the session cookie is valid.
	pub auth_check: Url,
	/// Endpoint that issues the CSRF token as JSON.
	pub csrf_token: Url,
}

/// Immutable configuration shared by every clone of a coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL that request paths are resolved against.
	pub base_url: Url,
	/// Session endpoints used by the token protocol.
	pub endpoints: SessionEndpoints,
	/// Header carrying the CSRF token on outgoing requests.
	pub csrf_header: String,
	/// CSRF token validation and fetch pacing.
	pub token: TokenPolicy,
	/// Request batching behavior.
	pub batching: BatchPolicy,
	/// Upper bound for every network call; `None` waits indefinitely.
	pub request_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Default auth-check path.
	pub const DEFAULT_AUTH_CHECK_PATH: &'static str = "/api/v1/auth/check";
	/// Default CSRF token path.
	pub const DEFAULT_CSRF_TOKEN_PATH: &'static str = "/api/v1/auth/csrf-token";
	/// Default CSRF header name.
	pub const DEFAULT_CSRF_HEADER: &'static str = "X-CSRFToken";
	/// Default request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request path (or absolute URL) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { url: path.to_owned(), source })
	}
}
