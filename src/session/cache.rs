//! Token state machine with singleflight fetches and a fetch rate limiter.
//!
//! Callers ask [`TokenCache::acquire`] for a token. A cached token is returned directly. While a
//! fetch is running every caller waits for it and receives its outcome, so concurrent demand
//! never triggers a second fetch. With nothing cached and nothing running, a new fetch starts
//! unless the previous attempt began less than the configured interval ago, in which case the
//! caller proceeds with no token.

// self
use crate::{
	_prelude::*,
	clock::Clock,
	config::TokenPolicy,
	obs::{self, CallKind},
	session::{SessionToken, TokenMetrics},
};

/// Observable state of the token cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// No token is cached and no fetch is running.
	NoToken,
	/// A fetch is in progress.
	Fetching,
	/// A validated token is cached.
	Valid,
}

#[derive(Debug, Default)]
struct TokenState {
	token: Option<SessionToken>,
	last_attempt: Option<OffsetDateTime>,
	fetching: bool,
	// Bumped when a fetch settles; waiters compare it to detect a finished fetch.
	completed: u64,
	// Bumped by invalidation; a fetch only caches its result if this did not move.
	generation: u64,
	last_outcome: Option<SessionToken>,
}

/// Fetch started by [`TokenCache::begin`].
#[derive(Clone, Copy, Debug)]
struct Attempt {
	generation: u64,
	started_at: OffsetDateTime,
	previous: Option<OffsetDateTime>,
}

/// Resets the `fetching` flag even when the fetching future is dropped mid-flight.
///
/// A fetch dropped before it settles did not fail, so it hands the rate-limiter window back and
/// the next waiter starts a fresh fetch.
struct FetchingFlag<'a> {
	state: &'a Mutex<TokenState>,
	attempt: Attempt,
	settled: bool,
}
impl Drop for FetchingFlag<'_> {
	fn drop(&mut self) {
		let mut state = self.state.lock();

		state.fetching = false;

		if !self.settled && state.last_attempt == Some(self.attempt.started_at) {
			state.last_attempt = self.attempt.previous;
		}
	}
}

/// Owner of the CSRF token and its fetch lifecycle.
pub struct TokenCache {
	state: Mutex<TokenState>,
	fetch_guard: AsyncMutex<()>,
	clock: Arc<dyn Clock>,
	policy: TokenPolicy,
	metrics: TokenMetrics,
}
impl TokenCache {
	/// Creates an empty cache.
	pub fn new(clock: Arc<dyn Clock>, policy: TokenPolicy) -> Self {
		Self {
			state: Default::default(),
			fetch_guard: AsyncMutex::new(()),
			clock,
			policy,
			metrics: Default::default(),
		}
	}

	/// Returns the current state.
	pub fn status(&self) -> TokenStatus {
		let state = self.state.lock();

		if state.fetching {
			TokenStatus::Fetching
		} else if state.token.is_some() {
			TokenStatus::Valid
		} else {
			TokenStatus::NoToken
		}
	}

	/// Returns the cached token without triggering a fetch.
	pub fn cached(&self) -> Option<SessionToken> {
		self.state.lock().token.clone()
	}

	/// Fetch counters.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Forgets the cached token. The rate-limiter window is kept.
	pub fn clear(&self) {
		let mut state = self.state.lock();

		state.token = None;
		state.generation += 1;
	}

	/// Forgets the cached token and the rate-limiter window.
	pub fn reset(&self) {
		let mut state = self.state.lock();

		state.token = None;
		state.last_attempt = None;
		state.generation += 1;
	}

	/// Returns a token, fetching one with `fetch` when allowed.
	///
	/// `fetch` resolves to the raw token string; it is validated against the policy before it
	/// is cached. Fetch failures and rejected tokens resolve to `None`.
	pub async fn acquire<F, Fut>(&self, fetch: F) -> Option<SessionToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<String>>,
	{
		let seen = {
			let state = self.state.lock();

			if let Some(token) = &state.token {
				return Some(token.clone());
			}
			if !state.fetching && self.rate_limited(&state) {
				self.note_skipped();

				return None;
			}

			state.completed
		};
		let _singleflight = self.fetch_guard.lock().await;
		let attempt = {
			let mut state = self.state.lock();

			if state.completed != seen {
				return state.last_outcome.clone();
			}
			if let Some(token) = &state.token {
				return Some(token.clone());
			}
			if self.rate_limited(&state) {
				drop(state);
				self.note_skipped();

				return None;
			}

			self.begin(&mut state)
		};

		match self.run_fetch(attempt, fetch).await {
			Ok(token) => Some(token),
			Err(e) => {
				obs::warn_event(CallKind::TokenFetch, &format!("Proceeding without token: {e}"));

				None
			},
		}
	}

	/// Clears the token and the rate-limiter window, then fetches immediately.
	pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<SessionToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<String>>,
	{
		self.reset();

		let _singleflight = self.fetch_guard.lock().await;
		let attempt = self.begin(&mut self.state.lock());

		self.run_fetch(attempt, fetch).await
	}

	fn begin(&self, state: &mut TokenState) -> Attempt {
		let started_at = self.clock.now();
		let previous = state.last_attempt.replace(started_at);

		state.fetching = true;

		Attempt { generation: state.generation, started_at, previous }
	}

	async fn run_fetch<F, Fut>(&self, attempt: Attempt, fetch: F) -> Result<SessionToken>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<String>>,
	{
		let mut flag = FetchingFlag { state: &self.state, attempt, settled: false };

		self.metrics.record_attempt();

		let outcome = fetch().await.and_then(|raw| {
			SessionToken::validate(raw, self.policy.min_length, self.clock.now())
				.map_err(Error::from)
		});

		{
			let mut state = self.state.lock();

			state.completed += 1;
			state.last_outcome = outcome.as_ref().ok().cloned();

			if state.generation == attempt.generation {
				state.token = state.last_outcome.clone();
			}
		}

		flag.settled = true;

		drop(flag);

		match &outcome {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		outcome
	}

	fn rate_limited(&self, state: &TokenState) -> bool {
		state
			.last_attempt
			.is_some_and(|at| self.clock.now() - at < self.policy.refresh_interval)
	}

	fn note_skipped(&self) {
		self.metrics.record_skipped();
		obs::record_call_outcome(CallKind::TokenFetch, obs::CallOutcome::Skipped);
		obs::debug_event(CallKind::TokenFetch, "Rate limiting CSRF token fetch.");
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("status", &self.status())
			.field("policy", &self.policy)
			.finish()
	}
}
