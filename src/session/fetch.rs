// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, SessionError},
	http::{self as transport, HttpRequest, HttpResponse, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{REQUESTED_WITH, REQUESTED_WITH_VALUE},
};

#[derive(Debug, Deserialize)]
struct CsrfTokenPayload {
	#[serde(alias = "csrfToken")]
	csrf_token: Option<String>,
}

/// Runs the auth check followed by the CSRF token request and returns the raw token string.
///
/// Length validation is left to the token cache.
pub(crate) async fn fetch_csrf_token<C>(transport: &C, config: &ClientConfig) -> Result<String>
where
	C: ?Sized + HttpTransport,
{
	let span = CallSpan::new(CallKind::TokenFetch, "fetch_csrf_token");

	obs::record_call_outcome(CallKind::TokenFetch, CallOutcome::Attempt);

	let outcome = span.instrument(exchange(transport, config)).await;

	match &outcome {
		Ok(_) => obs::record_call_outcome(CallKind::TokenFetch, CallOutcome::Success),
		Err(e) => {
			obs::record_call_outcome(CallKind::TokenFetch, CallOutcome::Failure);
			obs::warn_event(CallKind::TokenFetch, &format!("CSRF token fetch failed: {e}"));
		},
	}

	outcome
}

async fn exchange<C>(transport: &C, config: &ClientConfig) -> Result<String>
where
	C: ?Sized + HttpTransport,
{
	let check = http::Request::get(config.endpoints.auth_check.as_str())
		.header(http::header::CACHE_CONTROL, "no-cache")
		.header(http::header::PRAGMA, "no-cache")
		.body(Vec::new())
		.map_err(ConfigError::from)?;
	let status = execute(transport, check, config).await?.status();

	if !status.is_success() {
		return Err(SessionError::SessionInvalid { status: Some(status.as_u16()) }.into());
	}

	let issue = http::Request::get(config.endpoints.csrf_token.as_str())
		.header(REQUESTED_WITH, REQUESTED_WITH_VALUE)
		.body(Vec::new())
		.map_err(ConfigError::from)?;
	let response = execute(transport, issue, config).await?;
	let status = response.status();

	if !status.is_success() {
		return Err(SessionError::TokenFetchFailed {
			reason: format!("token endpoint returned {status}"),
			status: Some(status.as_u16()),
		}
		.into());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let payload: CsrfTokenPayload = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| SessionError::TokenFetchFailed {
			reason: format!("token response is malformed: {e}"),
			status: Some(status.as_u16()),
		})?;

	payload.csrf_token.ok_or_else(|| {
		SessionError::TokenFetchFailed {
			reason: "token response has no csrf_token field".into(),
			status: Some(status.as_u16()),
		}
		.into()
	})
}

async fn execute<C>(
	transport: &C,
	request: HttpRequest,
	config: &ClientConfig,
) -> Result<HttpResponse>
where
	C: ?Sized + HttpTransport,
{
	transport::execute_with_timeout(transport, request, config.request_timeout).await
}
