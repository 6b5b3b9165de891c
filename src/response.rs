//! Buffered responses and the parsing contract applied to them.
//!
//! The coordinator reads every body exactly once into an [`ApiResponse`]. Clones share that
//! buffer, so each caller joined onto a deduplicated request reads the full body on its own.

// crates.io
use http::{HeaderMap, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, http::HttpResponse};

/// Decoded success body.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
	/// Body of a response whose content type is JSON.
	Json(Value),
	/// Body of any other response, decoded lossily as UTF-8.
	Text(String),
}

/// Immutable snapshot of a backend response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Arc<[u8]>,
}
impl ApiResponse {
	/// Creates a snapshot from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Arc<[u8]>>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded lossily as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns true when the content type names JSON.
	pub fn is_json(&self) -> bool {
		self.headers
			.get(header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v.contains("application/json"))
	}

	/// Fails with [`Error::Http`] unless the status is 2xx.
	pub fn error_for_status(&self) -> Result<&Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Http { status: self.status.as_u16(), message: self.error_message() })
		}
	}

	/// Decodes the body according to its content type.
	///
	/// Non-2xx responses fail with [`Error::Http`]; a JSON content type with an undecodable
	/// body fails with [`Error::Parse`].
	pub fn parse(&self) -> Result<ResponseBody> {
		self.error_for_status()?;

		if self.is_json() {
			self.decode().map(ResponseBody::Json)
		} else {
			Ok(ResponseBody::Text(self.text()))
		}
	}

	/// Decodes a 2xx JSON body into `T`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.error_for_status()?;
		self.decode()
	}

	/// Message describing a failed response.
	///
	/// Preference order: the JSON body's `message`, the JSON body's `error`, the raw body when
	/// it is not JSON, then `HTTP {status}: {reason}`.
	pub fn error_message(&self) -> String {
		let text = self.text();

		match serde_json::from_str::<Value>(&text) {
			Ok(json) => ["message", "error"]
				.into_iter()
				.find_map(|field| {
					json.get(field).and_then(Value::as_str).filter(|m| !m.is_empty())
				})
				.map(ToOwned::to_owned)
				.unwrap_or_else(|| self.status_message()),
			Err(_) if !text.trim().is_empty() => text,
			Err(_) => self.status_message(),
		}
	}

	fn status_message(&self) -> String {
		format!(
			"HTTP {}: {}",
			self.status.as_u16(),
			self.status.canonical_reason().unwrap_or("Unknown Status")
		)
	}

	fn decode<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| Error::parse(self.status.as_u16(), e))
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self::new(parts.status, parts.headers, body)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, content_type: Option<&str>, body: &str) -> ApiResponse {
		let mut headers = HeaderMap::new();

		if let Some(content_type) = content_type {
			headers.insert(
				header::CONTENT_TYPE,
				content_type.parse().expect("Content type fixture should parse."),
			);
		}

		ApiResponse::new(
			StatusCode::from_u16(status).expect("Status fixture should be valid."),
			headers,
			body.as_bytes(),
		)
	}

	#[test]
	fn not_found_uses_json_message() {
		let err = response(404, Some("application/json"), r#"{"message": "Not found"}"#)
			.parse()
			.expect_err("404 should fail.");

		assert_eq!(err.to_string(), "Not found");
		assert_eq!(err.status(), Some(404));
	}

	#[test]
	fn server_error_uses_raw_text() {
		let err = response(500, Some("text/plain"), "Internal Server Error")
			.parse()
			.expect_err("500 should fail.");

		assert_eq!(err.to_string(), "Internal Server Error");
	}

	#[test]
	fn empty_forbidden_uses_status_reason() {
		let err = response(403, None, "").parse().expect_err("403 should fail.");

		assert_eq!(err.to_string(), "HTTP 403: Forbidden");
	}

	#[test]
	fn falls_back_to_error_field_then_status() {
		let with_error = response(400, Some("application/json"), r#"{"error": "Bad amount"}"#);
		let empty_message = response(422, Some("application/json"), r#"{"message": ""}"#);
		let unknown = response(599, None, "");

		assert_eq!(with_error.error_message(), "Bad amount");
		assert_eq!(empty_message.error_message(), "HTTP 422: Unprocessable Entity");
		assert_eq!(unknown.error_message(), "HTTP 599: Unknown Status");
	}

	#[test]
	fn success_decodes_by_content_type() {
		let json = response(200, Some("application/json; charset=utf-8"), r#"{"total": 3}"#);
		let text = response(200, Some("text/csv"), "a,b\n1,2");

		assert_eq!(
			json.parse().expect("JSON body should decode."),
			ResponseBody::Json(serde_json::json!({ "total": 3 }))
		);
		assert_eq!(
			text.parse().expect("Text body should decode."),
			ResponseBody::Text("a,b\n1,2".into())
		);
	}

	#[test]
	fn invalid_json_reports_parse_failure_with_path() {
		#[derive(Debug, Deserialize)]
		struct Summary {
			#[allow(dead_code)]
			total: u32,
		}

		let broken = response(200, Some("application/json"), "{not json");
		let err = broken.parse().expect_err("Broken JSON should fail.");

		assert!(matches!(err, Error::Parse { status: 200, .. }));
		assert_eq!(err.to_string(), "Failed to parse response.");

		let mistyped = response(200, Some("application/json"), r#"{"total": "three"}"#);
		let err = mistyped.json::<Summary>().expect_err("Mistyped field should fail.");

		match err {
			Error::Parse { source, .. } => assert_eq!(source.path().to_string(), "total"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn clones_read_independently() {
		let original = response(200, Some("application/json"), r#"{"id": 1}"#);
		let copy = original.clone();

		assert_eq!(
			original.parse().expect("Original should decode."),
			copy.parse().expect("Clone should decode.")
		);
		assert_eq!(copy.text(), r#"{"id": 1}"#);
		assert_eq!(original.text(), r#"{"id": 1}"#);
	}
}
