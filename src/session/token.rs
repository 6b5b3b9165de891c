//! Redacted CSRF token wrapper.

// self
use crate::{_prelude::*, error::SessionError};

/// CSRF token issued by the backend, redacted in every formatter.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
	value: Arc<str>,
	fetched_at: OffsetDateTime,
}
impl SessionToken {
	/// Accepts `raw` when it is non-empty and strictly longer than `min_length` characters.
	pub fn validate(
		raw: impl AsRef<str>,
		min_length: usize,
		fetched_at: OffsetDateTime,
	) -> Result<Self, SessionError> {
		let raw = raw.as_ref();

		if raw.is_empty() {
			return Err(SessionError::TokenFetchFailed {
				reason: "token endpoint returned an empty token".into(),
				status: None,
			});
		}

		let len = raw.chars().count();

		if len <= min_length {
			return Err(SessionError::TokenFetchFailed {
				reason: format!("token has {len} characters, expected more than {min_length}"),
				status: None,
			});
		}

		Ok(Self { value: Arc::from(raw), fetched_at })
	}

	/// Returns the token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.value
	}

	/// Instant the token was accepted.
	pub fn fetched_at(&self) -> OffsetDateTime {
		self.fetched_at
	}
}
impl Debug for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionToken")
			.field("value", &"<redacted>")
			.field("fetched_at", &self.fetched_at)
			.finish()
	}
}
impl Display for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
