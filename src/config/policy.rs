// self
use crate::_prelude::*;

/// CSRF token validation and fetch pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPolicy {
	/// Tokens must be strictly longer than this many characters to be accepted.
	pub min_length: usize,
	/// Minimum spacing between two fetch attempts, successful or not.
	pub refresh_interval: Duration,
}
impl Default for TokenPolicy {
	fn default() -> Self {
		Self { min_length: 20, refresh_interval: Duration::seconds(2) }
	}
}

/// Request batching behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPolicy {
	/// Routes requests through the drain queue when true; dispatches immediately otherwise.
	pub enabled: bool,
	/// Delay between the first enqueue and the drain of a queue.
	pub delay: Duration,
}
impl BatchPolicy {
	/// Returns the drain delay as a [`std::time::Duration`], clamping negatives to zero.
	pub fn delay_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.delay).unwrap_or_default()
	}
}
impl Default for BatchPolicy {
	fn default() -> Self {
		Self { enabled: true, delay: Duration::milliseconds(50) }
	}
}
