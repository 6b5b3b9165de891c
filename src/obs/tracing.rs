// self
use crate::{_prelude::*, obs::CallKind};

/// Future returned by [`CallSpan::instrument`]: wrapped in the call span.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`CallSpan::instrument`]: the input future untouched.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// `treasury_client.call` span covering one token fetch, dispatch, or drain cycle.
///
/// Zero-sized without the `tracing` feature.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Opens the span; `stage` names the coordinator function that owns it.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("treasury_client.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span each time it is polled.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for `kind`; `detail` is a preformatted, secret-free summary.
pub fn debug_event(kind: CallKind, detail: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(call = kind.as_str(), "{detail}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, detail);
	}
}

/// Emits a warning event for `kind`; `detail` is a preformatted, secret-free summary.
pub fn warn_event(kind: CallKind, detail: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(call = kind.as_str(), "{detail}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, detail);
	}
}
