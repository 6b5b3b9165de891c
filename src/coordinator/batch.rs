//! Timer-driven admission queue.
//!
//! Requests wait in a queue until a drain cycle admits them. The first arrival into an empty
//! queue arms a timer; when it fires, the queued batchable requests are admitted together and the
//! cycle waits for all of them to settle, then sequential requests are admitted one at a time in
//! arrival order. Cycles never overlap.

// crates.io
use futures::future;
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	config::BatchPolicy,
	obs::{self, CallKind, CallSpan},
};

/// Admission ticket held by a dispatched request; dropping it tells the drain cycle the request
/// settled.
#[derive(Debug)]
pub(crate) struct Permit {
	_settled: Option<oneshot::Sender<()>>,
}
impl Permit {
	fn immediate() -> Self {
		Self { _settled: None }
	}
}

#[derive(Debug)]
struct QueuedRequest {
	label: String,
	batchable: bool,
	admit: oneshot::Sender<Permit>,
}
impl QueuedRequest {
	/// Hands the request its permit, returning a receiver that resolves once it settles.
	///
	/// `None` means the caller already went away.
	fn admit(self) -> Option<oneshot::Receiver<()>> {
		let (settled_tx, settled_rx) = oneshot::channel();

		match self.admit.send(Permit { _settled: Some(settled_tx) }) {
			Ok(()) => Some(settled_rx),
			Err(_) => {
				obs::debug_event(
					CallKind::BatchDrain,
					&format!("Skipping abandoned request {}.", self.label),
				);

				None
			},
		}
	}
}

#[derive(Debug, Default)]
struct QueueState {
	pending: Vec<QueuedRequest>,
	armed: bool,
}

/// Queue plus the timer task that drains it.
#[derive(Debug)]
pub(crate) struct BatchScheduler {
	policy: BatchPolicy,
	queue: Mutex<QueueState>,
	cycle: AsyncMutex<()>,
}
impl BatchScheduler {
	pub(crate) fn new(policy: BatchPolicy) -> Self {
		Self { policy, queue: Default::default(), cycle: AsyncMutex::new(()) }
	}

	/// Number of requests waiting for the next drain cycle.
	pub(crate) fn queued(&self) -> usize {
		self.queue.lock().pending.len()
	}

	/// Waits until a drain cycle admits the request.
	///
	/// The request joins the queue synchronously on the first poll, so requests polled in order
	/// queue in that order. With batching disabled the request is admitted at once.
	pub(crate) async fn admit(self: &Arc<Self>, label: String, batchable: bool) -> Result<Permit> {
		if !self.policy.enabled {
			return Ok(Permit::immediate());
		}

		let (admit, admitted) = oneshot::channel();
		let arm = {
			let mut queue = self.queue.lock();

			queue.pending.push(QueuedRequest { label, batchable, admit });

			!std::mem::replace(&mut queue.armed, true)
		};

		if arm {
			tokio::spawn(self.clone().drain_after_delay());
		}

		admitted.await.map_err(|_| Error::Cancelled)
	}

	async fn drain_after_delay(self: Arc<Self>) {
		tokio::time::sleep(self.policy.delay_std()).await;

		let _cycle = self.cycle.lock().await;
		let pending = {
			let mut queue = self.queue.lock();

			queue.armed = false;

			std::mem::take(&mut queue.pending)
		};
		let span = CallSpan::new(CallKind::BatchDrain, "drain_after_delay");

		span.instrument(drain(pending)).await;
	}
}

async fn drain(pending: Vec<QueuedRequest>) {
	let (batch, sequential): (Vec<_>, Vec<_>) =
		pending.into_iter().partition(|request| request.batchable);

	obs::debug_event(
		CallKind::BatchDrain,
		&format!(
			"Draining {} batchable and {} sequential requests.",
			batch.len(),
			sequential.len()
		),
	);
	obs::record_drain_size(batch.len(), sequential.len());

	let running = batch.into_iter().filter_map(QueuedRequest::admit).collect::<Vec<_>>();

	future::join_all(running).await;

	for request in sequential {
		if let Some(settled) = request.admit() {
			let _ = settled.await;
		}
	}
}
