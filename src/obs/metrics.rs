// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"treasury_client_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how many requests one drain cycle admitted, split by admission mode.
pub fn record_drain_size(batchable: usize, sequential: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("treasury_client_drain_requests", "mode" => "batchable")
			.record(batchable as f64);
		metrics::histogram!("treasury_client_drain_requests", "mode" => "sequential")
			.record(sequential as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (batchable, sequential);
	}
}
