//! Session-aware request coordinator.
//!
//! [`RequestCoordinator`] is the single entry point for backend calls. Each request goes through
//! three layers:
//!
//! 1. Deduplication: identical requests (method, URL with query, JSON body) issued while one is
//!    pending share that call and each receive their own copy of its outcome.
//! 2. Scheduling: the call waits for a drain cycle of the batch queue before it is dispatched.
//! 3. Dispatch: mutating verbs attach the CSRF token, fetching one first when none is cached and
//!    the fetch rate limit allows it; the call then runs under the configured timeout.
//!
//! Dropping every caller of a pending request abandons it: the network call is dropped, the
//! in-flight entry is released, and the queue slot is skipped.

mod batch;
mod registry;

// crates.io
use futures::future::{self, FutureExt};
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestHttpClient};
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::ClientConfig,
	http::{self as transport, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{ApiRequest, RequestKey},
	response::ApiResponse,
	session::{self, SessionToken, TokenCache, TokenMetrics, TokenStatus},
};
use batch::BatchScheduler;
use registry::{InFlightRegistry, Release};

#[cfg(feature = "reqwest")]
/// Coordinator specialized for the crate's default reqwest transport.
pub type ReqwestCoordinator = RequestCoordinator<ReqwestHttpClient>;

/// Point-in-time view of the coordinator's internal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorStats {
	/// Requests currently registered as in flight.
	pub in_flight: usize,
	/// Requests waiting for the next drain cycle.
	pub queued: usize,
	/// CSRF token state.
	pub token: TokenStatus,
}

/// Coordinates CSRF tokens, deduplication, and batching over one transport.
///
/// Clones share all state, so a coordinator is built once and handed to every consumer.
pub struct RequestCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call.
	pub http_client: Arc<C>,
	/// Configuration shared by every clone.
	pub config: Arc<ClientConfig>,
	tokens: Arc<TokenCache>,
	registry: Arc<InFlightRegistry>,
	scheduler: Arc<BatchScheduler>,
}
impl<C> RequestCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a coordinator over a caller-provided transport.
	pub fn with_transport(config: ClientConfig, http_client: impl Into<Arc<C>>) -> Self {
		let tokens = TokenCache::new(Arc::new(SystemClock), config.token);
		let scheduler = BatchScheduler::new(config.batching);

		Self {
			http_client: http_client.into(),
			config: Arc::new(config),
			tokens: Arc::new(tokens),
			registry: Default::default(),
			scheduler: Arc::new(scheduler),
		}
	}

	/// Replaces the clock driving the token rate limiter. Resets the token state.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.tokens = Arc::new(TokenCache::new(clock, self.config.token));

		self
	}

	/// Sends a GET request.
	pub async fn get(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a GET request with query parameters.
	pub async fn get_with_query<I, K, V>(
		&self,
		path: impl Into<String>,
		params: I,
	) -> Result<ApiResponse>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.send(ApiRequest::get(path).with_query(params)).await
	}

	/// Sends a POST request with a JSON body.
	pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Sends a PUT request with a JSON body.
	pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await
	}

	/// Sends a DELETE request.
	pub async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Sends a GET request and decodes the JSON body into `T`.
	pub async fn get_json<T>(&self, path: impl Into<String>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.get(path).await?.json()
	}

	/// Sends a POST request and decodes the JSON body into `T`.
	pub async fn post_json<T, B>(&self, path: impl Into<String>, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.post(path, body).await?.json()
	}

	/// Sends `request`, joining an identical pending request when there is one.
	///
	/// The response is returned as-is whatever its status; use [`ApiResponse::parse`] or
	/// [`ApiResponse::json`] to turn non-2xx statuses into errors.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let url = request.resolve_url(&self.config)?;
		let key = request.key(&url);
		let (shared, joined) = self.registry.join_or_insert(key.clone(), |release| {
			self.clone().dispatch(request, url, key.clone(), release).boxed()
		});

		if joined {
			obs::record_call_outcome(CallKind::Request, CallOutcome::Deduplicated);
			obs::debug_event(CallKind::Request, &format!("Joining in-flight request {key}."));
		}

		shared.await
	}

	/// Sends every request concurrently and returns the responses in input order.
	///
	/// Every request runs to completion, so writes are never cut off by a failing sibling. The
	/// first error in input order is returned once all of them have settled.
	pub async fn send_all<I>(&self, requests: I) -> Result<Vec<ApiResponse>>
	where
		I: IntoIterator<Item = ApiRequest>,
	{
		future::join_all(requests.into_iter().map(|request| self.send(request)))
			.await
			.into_iter()
			.collect()
	}

	/// Forgets the cached token. The fetch rate limit still applies to the next fetch.
	pub fn clear_token(&self) {
		self.tokens.clear();
	}

	/// Discards the token and fetches a new one right away, ignoring the rate limit.
	pub async fn refresh_session(&self) -> Result<()> {
		self.tokens
			.refresh(|| session::fetch_csrf_token(&*self.http_client, &self.config))
			.await
			.map(|_| ())
	}

	/// Resets the token state and forgets every in-flight entry.
	///
	/// Pending calls still complete for the callers already waiting on them; later identical
	/// requests start new calls. Queued requests are kept.
	pub fn clear_cache(&self) {
		self.tokens.reset();
		self.registry.clear();
	}

	/// Returns a snapshot of the coordinator's internal state.
	pub fn stats(&self) -> CoordinatorStats {
		CoordinatorStats {
			in_flight: self.registry.len(),
			queued: self.scheduler.queued(),
			token: self.tokens.status(),
		}
	}

	/// Returns the CSRF token state.
	pub fn token_status(&self) -> TokenStatus {
		self.tokens.status()
	}

	/// Token fetch counters.
	pub fn token_metrics(&self) -> &TokenMetrics {
		self.tokens.metrics()
	}

	async fn dispatch(
		self,
		request: ApiRequest,
		url: Url,
		key: RequestKey,
		_release: Release,
	) -> Result<ApiResponse> {
		let _permit = self.scheduler.admit(key.fingerprint().to_owned(), request.batchable).await?;
		let span = CallSpan::new(CallKind::Request, "dispatch");

		obs::record_call_outcome(CallKind::Request, CallOutcome::Attempt);

		let outcome = span.instrument(self.execute(&request, &url)).await;

		match &outcome {
			Ok(_) => obs::record_call_outcome(CallKind::Request, CallOutcome::Success),
			Err(e) => {
				obs::record_call_outcome(CallKind::Request, CallOutcome::Failure);
				obs::debug_event(CallKind::Request, &format!("Request {key} failed: {e}"));
			},
		}

		outcome
	}

	async fn execute(&self, request: &ApiRequest, url: &Url) -> Result<ApiResponse> {
		let token = if request.is_mutating() { self.token().await } else { self.tokens.cached() };
		let http_request = request.to_http(url, &self.config.csrf_header, token.as_ref())?;
		let timeout = request.timeout.or(self.config.request_timeout);
		let response =
			transport::execute_with_timeout(&*self.http_client, http_request, timeout).await?;

		Ok(response.into())
	}

	async fn token(&self) -> Option<SessionToken> {
		self.tokens.acquire(|| session::fetch_csrf_token(&*self.http_client, &self.config)).await
	}
}
#[cfg(feature = "reqwest")]
impl RequestCoordinator<ReqwestHttpClient> {
	/// Creates a coordinator backed by a reqwest client with a cookie store.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(config, ReqwestHttpClient::new()?))
	}
}
impl<C> Clone for RequestCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			config: self.config.clone(),
			tokens: self.tokens.clone(),
			registry: self.registry.clone(),
			scheduler: self.scheduler.clone(),
		}
	}
}
impl<C> Debug for RequestCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestCoordinator")
			.field("base_url", &self.config.base_url.as_str())
			.field("stats", &self.stats())
			.finish()
	}
}
