//! Fixtures shared by the coordinator integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use http::{HeaderMap, StatusCode, header};
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use treasury_client::{
	RequestCoordinator,
	config::{ClientConfig, ClientConfigBuilder},
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	url::Url,
};

/// Token issued by [`session_backend`].
pub const TOKEN: &str = "csrf-token-0123456789abcdef";
/// Auth-check path used by the default configuration.
pub const AUTH_CHECK: &str = "/api/v1/auth/check";
/// CSRF token path used by the default configuration.
pub const CSRF_TOKEN: &str = "/api/v1/auth/csrf-token";

pub type Reply = Result<HttpResponse, TransportError>;

/// One request observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct Call {
	pub method: http::Method,
	pub path: String,
	pub query: Option<String>,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}
impl Call {
	pub fn csrf(&self) -> Option<&str> {
		self.headers.get("x-csrftoken").and_then(|v| v.to_str().ok())
	}
}

struct InFlight<'a>(&'a AtomicUsize);
impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

/// In-process transport that records every call and answers through a responder closure.
pub struct ScriptedTransport {
	responder: Box<dyn Fn(&Call) -> Reply + Send + Sync>,
	delay: StdDuration,
	path_delays: HashMap<String, StdDuration>,
	calls: Mutex<Vec<Call>>,
	completed: Mutex<Vec<String>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedTransport {
	pub fn new(responder: impl Fn(&Call) -> Reply + 'static + Send + Sync) -> Self {
		Self {
			responder: Box::new(responder),
			delay: StdDuration::from_millis(20),
			path_delays: Default::default(),
			calls: Default::default(),
			completed: Default::default(),
			in_flight: Default::default(),
			max_in_flight: Default::default(),
		}
	}

	pub fn with_delay(mut self, delay: StdDuration) -> Self {
		self.delay = delay;

		self
	}

	/// Overrides the latency of calls to `path`.
	pub fn with_path_delay(mut self, path: &str, delay: StdDuration) -> Self {
		self.path_delays.insert(path.to_owned(), delay);

		self
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	/// Calls made to `path`, in dispatch order.
	pub fn calls_to(&self, path: &str) -> Vec<Call> {
		self.calls.lock().iter().filter(|call| call.path == path).cloned().collect()
	}

	pub fn count(&self, path: &str) -> usize {
		self.calls_to(path).len()
	}

	/// Number of calls to `path` whose reply was delivered, as opposed to dropped mid-flight.
	pub fn completed(&self, path: &str) -> usize {
		self.completed.lock().iter().filter(|done| *done == path).count()
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let (parts, body) = request.into_parts();
		let call = Call {
			method: parts.method,
			path: parts.uri.path().to_owned(),
			query: parts.uri.query().map(ToOwned::to_owned),
			headers: parts.headers,
			body,
		};
		let reply = (self.responder)(&call);
		let path = call.path.clone();
		let delay = self.path_delays.get(&path).copied().unwrap_or(self.delay);

		self.calls.lock().push(call);

		Box::pin(async move {
			let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
			let _guard = InFlight(&self.in_flight);

			self.max_in_flight.fetch_max(current, Ordering::SeqCst);

			tokio::time::sleep(delay).await;

			self.completed.lock().push(path);

			reply
		})
	}
}

pub fn respond(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Reply {
	let mut response = HttpResponse::new(body.into());

	*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");

	if let Some(content_type) = content_type {
		response.headers_mut().insert(
			header::CONTENT_TYPE,
			content_type.parse().expect("Fixture content type should parse."),
		);
	}

	Ok(response)
}

pub fn respond_json(status: u16, body: Value) -> Reply {
	respond(status, Some("application/json"), body.to_string())
}

/// Backend that accepts the session, issues `token`, and echoes every other call as JSON.
pub fn session_backend(token: &'static str) -> impl Fn(&Call) -> Reply + 'static + Send + Sync {
	move |call: &Call| match call.path.as_str() {
		AUTH_CHECK => respond_json(200, json!({ "authenticated": true })),
		CSRF_TOKEN => respond_json(200, json!({ "csrf_token": token })),
		path => respond_json(
			200,
			json!({
				"method": call.method.as_str(),
				"path": path,
				"csrf": call.csrf(),
			}),
		),
	}
}

pub fn base_url() -> Url {
	Url::parse("https://treasury.test/").expect("Base URL fixture should parse.")
}

/// Builder seeded with a short drain delay.
pub fn config_builder() -> ClientConfigBuilder {
	ClientConfig::builder(base_url()).batch_delay(time::Duration::milliseconds(10))
}

pub fn config() -> ClientConfig {
	config_builder().build().expect("Test configuration should build.")
}

pub fn coordinator(
	config: ClientConfig,
	transport: &Arc<ScriptedTransport>,
) -> RequestCoordinator<ScriptedTransport> {
	RequestCoordinator::with_transport(config, transport.clone())
}
