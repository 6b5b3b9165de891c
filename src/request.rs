//! Request descriptions and the signatures used to deduplicate them.

// std
use std::sync::OnceLock;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use http::{HeaderValue, Method, header};
use serde_json::Value;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*, config::ClientConfig, error::ConfigError, http::HttpRequest,
	session::SessionToken,
};

/// Header marking requests as issued by script rather than by navigation.
pub const REQUESTED_WITH: &str = "x-requested-with";
/// Value sent in [`REQUESTED_WITH`].
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// A business request routed through the coordinator.
///
/// Paths are resolved against [`ClientConfig::base_url`]; absolute URLs are kept as-is. Only
/// requests marked [`batchable`](Self::batchable) are dispatched concurrently within a drain
/// cycle, all others are dispatched one at a time in submission order.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path or absolute URL.
	pub path: String,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// JSON body; on GET its object fields become query pairs instead.
	pub body: Option<Value>,
	/// Whether the request may run concurrently with other batchable requests.
	pub batchable: bool,
	/// Per-request timeout overriding [`ClientConfig::request_timeout`].
	pub timeout: Option<Duration>,
}
impl ApiRequest {
	/// Creates a request for `method` and `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
			batchable: false,
			timeout: None,
		}
	}

	/// Creates a GET request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Creates a POST request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Creates a PUT request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Creates a DELETE request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Sets a JSON body that is already a [`Value`].
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` into the JSON body.
	pub fn with_json<B>(self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		Ok(self.with_body(serde_json::to_value(body)?))
	}

	/// Appends query pairs.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Marks the request as batchable.
	pub fn batchable(mut self) -> Self {
		self.batchable = true;

		self
	}

	/// Overrides the configured timeout for this request.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns true for verbs that change server state and therefore carry the CSRF token.
	pub fn is_mutating(&self) -> bool {
		!matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
	}

	/// Resolves the full URL, query included.
	///
	/// A GET body must be a JSON object; its non-null fields are appended after the explicit
	/// query pairs, strings verbatim and other values as their JSON text.
	pub fn resolve_url(&self, config: &ClientConfig) -> Result<Url, ConfigError> {
		let mut url = config.resolve(&self.path)?;
		let body_pairs = self.get_body_pairs()?;

		if !self.query.is_empty() || !body_pairs.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query).extend_pairs(&body_pairs);
		}

		Ok(url)
	}

	fn get_body_pairs(&self) -> Result<Vec<(String, String)>, ConfigError> {
		if self.method != Method::GET {
			return Ok(Vec::new());
		}

		match &self.body {
			None => Ok(Vec::new()),
			Some(Value::Object(fields)) => Ok(fields
				.iter()
				.filter(|(_, value)| !value.is_null())
				.map(|(key, value)| {
					let value = match value {
						Value::String(text) => text.clone(),
						other => other.to_string(),
					};

					(key.clone(), value)
				})
				.collect()),
			Some(_) => Err(ConfigError::GetBodyNotObject { path: self.path.clone() }),
		}
	}

	/// Returns the body as the JSON text that is both sent and keyed on.
	fn body_text(&self) -> Option<String> {
		if self.method == Method::GET {
			return None;
		}

		self.body.as_ref().map(Value::to_string)
	}

	pub(crate) fn key(&self, url: &Url) -> RequestKey {
		RequestKey::new(&self.method, url, self.body_text().as_deref())
	}

	/// Builds the transport request with the standard header set.
	pub(crate) fn to_http(
		&self,
		url: &Url,
		csrf_header: &str,
		token: Option<&SessionToken>,
	) -> Result<HttpRequest, ConfigError> {
		let body = self.body_text();
		let mut builder = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(REQUESTED_WITH, REQUESTED_WITH_VALUE);

		if body.is_some() {
			builder = builder.header(header::CONTENT_TYPE, "application/json");
		}
		if let Some(token) = token {
			let value = HeaderValue::from_str(token.expose())
				.map_err(|_| ConfigError::InvalidHeaderValue { name: csrf_header.to_owned() })?;

			builder = builder.header(csrf_header, value);
		}

		Ok(builder.body(body.map(String::into_bytes).unwrap_or_default())?)
	}
}

/// Signature of a request: `METHOD:URL:BODY`, with an empty body segment when there is none.
///
/// Two requests with the same key are interchangeable and share one network call while in
/// flight.
#[derive(Clone, Debug)]
pub struct RequestKey {
	raw: Arc<str>,
	fingerprint_cache: Arc<OnceLock<String>>,
}
impl RequestKey {
	/// Builds a key from its parts.
	pub fn new(method: &Method, url: &Url, body: Option<&str>) -> Self {
		let raw = format!("{method}:{url}:{}", body.unwrap_or_default());

		Self { raw: Arc::from(raw), fingerprint_cache: Default::default() }
	}

	/// Full key text. May contain request payloads; prefer [`fingerprint`](Self::fingerprint)
	/// in logs.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Base64 (no padding) SHA-256 digest of the key, safe to log.
	pub fn fingerprint(&self) -> &str {
		self.fingerprint_cache.get_or_init(|| {
			let mut hasher = Sha256::new();

			hasher.update(self.raw.as_bytes());

			STANDARD_NO_PAD.encode(hasher.finalize())
		})
	}
}
impl PartialEq for RequestKey {
	fn eq(&self, other: &Self) -> bool {
		self.raw == other.raw
	}
}
impl Eq for RequestKey {}
impl std::hash::Hash for RequestKey {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.raw.hash(state);
	}
}
impl Display for RequestKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.fingerprint())
	}
}
