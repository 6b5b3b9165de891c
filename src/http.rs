//! Transport primitives for coordinator requests.
//!
//! The module exposes [`HttpTransport`], the coordinator's only dependency on an HTTP stack.
//! Requests and responses are plain [`http`] values with fully buffered bodies so the
//! coordinator can hand independent copies of one response to every deduplicated waiter.
//! [`ReqwestHttpClient`] is the default implementation and keeps a cookie store so the
//! backend's session cookie travels with every call.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Outbound request with a buffered body.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Inbound response with a buffered body.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Runs `request` on `transport`, failing with [`Error::Timeout`] once `timeout` elapses.
///
/// Negative timeouts are treated as zero.
pub(crate) async fn execute_with_timeout<C>(
	transport: &C,
	request: HttpRequest,
	timeout: Option<Duration>,
) -> Result<HttpResponse>
where
	C: ?Sized + HttpTransport,
{
	let call = transport.execute(request);
	let Some(after) = timeout else {
		return Ok(call.await?);
	};
	let limit = std::time::Duration::try_from(after).unwrap_or_default();

	match tokio::time::timeout(limit, call).await {
		Ok(outcome) => Ok(outcome?),
		Err(_) => Err(Error::Timeout { after }),
	}
}

/// Abstraction over HTTP stacks capable of executing coordinator requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a coordinator, and the returned future must be `Send` so deduplicated requests can
/// be polled from whichever task awaits them. Implementations are expected to keep session
/// cookies between calls; the coordinator never sets the `Cookie` header itself.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Custom clients passed to [`ReqwestHttpClient::with_client`] should enable the cookie store,
/// otherwise the auth check and every later call run without the session cookie.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a reqwest client with a cookie store enabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut buffered = HttpResponse::new(response.bytes().await?.to_vec());

			*buffered.status_mut() = status;
			*buffered.headers_mut() = headers;

			Ok::<_, TransportError>(buffered)
		})
	}
}
