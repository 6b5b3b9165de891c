// self
use crate::{
	_prelude::*,
	config::{BatchPolicy, ClientConfig, SessionEndpoints, TokenPolicy},
};

/// Errors raised while constructing or validating client configurations.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot have paths joined onto it.
	#[error("The base URL cannot act as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// A session endpoint path does not resolve against the base URL.
	#[error("The {endpoint} endpoint `{path}` does not resolve against the base URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Configured path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// CSRF header name is not a valid HTTP header name.
	#[error("`{name}` is not a valid header name.")]
	InvalidHeaderName {
		/// Header name that failed validation.
		name: String,
	},
	/// The minimum token length must be positive.
	#[error("The minimum token length must be positive.")]
	ZeroTokenLength,
	/// Durations must not be negative.
	#[error("The {field} duration must not be negative.")]
	NegativeDuration {
		/// Which duration failed validation.
		field: &'static str,
	},
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL that request paths are resolved against.
	pub base_url: Url,
	/// Auth-check path or absolute URL.
	pub auth_check_path: String,
	/// CSRF token path or absolute URL.
	pub csrf_token_path: String,
	/// CSRF header name.
	pub csrf_header: String,
	/// Token validation and pacing.
	pub token: TokenPolicy,
	/// Batching behavior.
	pub batching: BatchPolicy,
	/// Per-call timeout.
	pub request_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the backend base URL and default settings.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			auth_check_path: ClientConfig::DEFAULT_AUTH_CHECK_PATH.into(),
			csrf_token_path: ClientConfig::DEFAULT_CSRF_TOKEN_PATH.into(),
			csrf_header: ClientConfig::DEFAULT_CSRF_HEADER.into(),
			token: TokenPolicy::default(),
			batching: BatchPolicy::default(),
			request_timeout: Some(ClientConfig::DEFAULT_REQUEST_TIMEOUT),
		}
	}

	/// Overrides the auth-check path.
	pub fn auth_check_path(mut self, path: impl Into<String>) -> Self {
		self.auth_check_path = path.into();

		self
	}

	/// Overrides the CSRF token path.
	pub fn csrf_token_path(mut self, path: impl Into<String>) -> Self {
		self.csrf_token_path = path.into();

		self
	}

	/// Overrides the CSRF header name.
	pub fn csrf_header(mut self, name: impl Into<String>) -> Self {
		self.csrf_header = name.into();

		self
	}

	/// Overrides the minimum token length (tokens must be strictly longer).
	pub fn min_token_length(mut self, len: usize) -> Self {
		self.token.min_length = len;

		self
	}

	/// Overrides the minimum spacing between token fetch attempts.
	pub fn token_refresh_interval(mut self, interval: Duration) -> Self {
		self.token.refresh_interval = interval;

		self
	}

	/// Enables or disables request batching.
	pub fn batching(mut self, enabled: bool) -> Self {
		self.batching.enabled = enabled;

		self
	}

	/// Overrides the drain delay of the batch queue.
	pub fn batch_delay(mut self, delay: Duration) -> Self {
		self.batching.delay = delay;

		self
	}

	/// Overrides the per-call timeout; `None` disables it.
	pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		validate_base(&self.base_url)?;

		let endpoints = SessionEndpoints {
			auth_check: resolve_endpoint(&self.base_url, "auth_check", &self.auth_check_path)?,
			csrf_token: resolve_endpoint(&self.base_url, "csrf_token", &self.csrf_token_path)?,
		};

		if http::HeaderName::from_bytes(self.csrf_header.as_bytes()).is_err() {
			return Err(ClientConfigError::InvalidHeaderName { name: self.csrf_header });
		}
		if self.token.min_length == 0 {
			return Err(ClientConfigError::ZeroTokenLength);
		}

		validate_duration("token_refresh_interval", self.token.refresh_interval)?;
		validate_duration("batch_delay", self.batching.delay)?;

		if let Some(timeout) = self.request_timeout {
			validate_duration("request_timeout", timeout)?;
		}

		Ok(ClientConfig {
			base_url: self.base_url,
			endpoints,
			csrf_header: self.csrf_header,
			token: self.token,
			batching: self.batching,
			request_timeout: self.request_timeout,
		})
	}
}

fn validate_base(url: &Url) -> Result<(), ClientConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ClientConfigError::UnsupportedScheme { url: url.to_string() });
	}
	if url.cannot_be_a_base() {
		return Err(ClientConfigError::CannotBeABase { url: url.to_string() });
	}

	Ok(())
}

fn resolve_endpoint(
	base: &Url,
	endpoint: &'static str,
	path: &str,
) -> Result<Url, ClientConfigError> {
	base.join(path).map_err(|source| ClientConfigError::InvalidEndpoint {
		endpoint,
		path: path.to_owned(),
		source,
	})
}

fn validate_duration(field: &'static str, value: Duration) -> Result<(), ClientConfigError> {
	if value.is_negative() { Err(ClientConfigError::NegativeDuration { field }) } else { Ok(()) }
}
