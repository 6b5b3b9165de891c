//! Tracing spans and metrics for coordinator calls; each is a no-op unless its feature is on.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `treasury_client.call` with the `call`
//!   (operation) and `stage` (call site) fields, plus debug events for deduplicated requests,
//!   rate-limited token fetches, and batch drain cycles.
//! - Enable `metrics` to increment the `treasury_client_call_total` counter for every
//!   attempt/success/failure/dedup/skip, labeled by `call` + `outcome`, and to record the
//!   `treasury_client_drain_requests` histogram per drain cycle, labeled by `mode`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Coordinator operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Auth check + CSRF token fetch.
	TokenFetch,
	/// Business request sent through the coordinator.
	Request,
	/// One drain cycle of the batch queue.
	BatchDrain,
}
impl CallKind {
	/// Label used for the `call` span field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::TokenFetch => "token_fetch",
			CallKind::Request => "request",
			CallKind::BatchDrain => "batch_drain",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What happened to a call, as counted by `treasury_client_call_total`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// The call started.
	Attempt,
	/// The call produced a response or token.
	Success,
	/// The call ended in an error.
	Failure,
	/// The caller joined an identical in-flight request.
	Deduplicated,
	/// The call was skipped (rate-limited token fetch).
	Skipped,
}
impl CallOutcome {
	/// Label used for the `outcome` metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
			CallOutcome::Deduplicated => "deduplicated",
			CallOutcome::Skipped => "skipped",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
