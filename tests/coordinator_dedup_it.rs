mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use serde_json::{Value, json};
// self
use common::*;
use treasury_client::{
	error::{Error, TransportError},
	request::ApiRequest,
	response::ResponseBody,
};

#[tokio::test]
async fn identical_concurrent_requests_share_one_call() {
	let transport = Arc::new(ScriptedTransport::new(session_backend(TOKEN)));
	let coordinator = coordinator(config(), &transport);
	let (a, b, c) = tokio::join!(
		coordinator.get("/api/v1/clients"),
		coordinator.get("/api/v1/clients"),
		coordinator.get("/api/v1/clients"),
	);
	let a = a.expect("First caller should succeed.");
	let b = b.expect("Second caller should succeed.");
	let c = c.expect("Third caller should succeed.");

	assert_eq!(transport.count("/api/v1/clients"), 1);

	let first = a.parse().expect("First copy should decode.");

	assert_eq!(first, b.parse().expect("Second copy should decode."));
	assert_eq!(first, c.parse().expect("Third copy should decode."));
	assert_eq!(a.text(), c.text());
}

#[tokio::test]
async fn differing_bodies_or_queries_are_separate_calls() {
	let transport = Arc::new(ScriptedTransport::new(session_backend(TOKEN)));
	let coordinator = coordinator(config(), &transport);
	let ten = json!({ "amount": 10 });
	let twenty = json!({ "amount": 20 });
	let (first, second) = tokio::join!(
		coordinator.post("/api/v1/transactions", &ten),
		coordinator.post("/api/v1/transactions", &twenty),
	);

	first.expect("First body should be sent.");
	second.expect("Second body should be sent.");

	assert_eq!(transport.count("/api/v1/transactions"), 2);

	let (page_one, page_two) = tokio::join!(
		coordinator.get_with_query("/api/v1/psp", [("page", "1")]),
		coordinator.get_with_query("/api/v1/psp", [("page", "2")]),
	);

	page_one.expect("First page should load.");
	page_two.expect("Second page should load.");

	let queries = transport
		.calls_to("/api/v1/psp")
		.into_iter()
		.filter_map(|call| call.query)
		.collect::<Vec<_>>();

	assert_eq!(queries, ["page=1", "page=2"]);
}

#[tokio::test]
async fn settled_requests_leave_the_registry() {
	let transport = Arc::new(ScriptedTransport::new(session_backend(TOKEN)));
	let coordinator = coordinator(config(), &transport);

	coordinator.get("/api/v1/summary").await.expect("First call should succeed.");

	assert_eq!(coordinator.stats().in_flight, 0);

	coordinator.get("/api/v1/summary").await.expect("Second call should succeed.");

	assert_eq!(transport.count("/api/v1/summary"), 2);
}

#[tokio::test]
async fn shared_failures_reach_every_caller_and_are_cleaned_up() {
	let transport = Arc::new(ScriptedTransport::new(|call| {
		if call.path == "/api/v1/rates" {
			Err(TransportError::network(std::io::Error::new(
				std::io::ErrorKind::ConnectionRefused,
				"connection refused",
			)))
		} else {
			respond_json(200, json!({}))
		}
	}));
	let coordinator = coordinator(config(), &transport);
	let (a, b) = tokio::join!(coordinator.get("/api/v1/rates"), coordinator.get("/api/v1/rates"));

	assert!(matches!(a, Err(Error::Transport(TransportError::Network { .. }))));
	assert!(matches!(b, Err(Error::Transport(TransportError::Network { .. }))));
	assert_eq!(transport.count("/api/v1/rates"), 1);
	assert_eq!(coordinator.stats().in_flight, 0);

	let retry = coordinator.get("/api/v1/rates").await;

	assert!(retry.is_err());
	assert_eq!(transport.count("/api/v1/rates"), 2);
}

#[tokio::test]
async fn error_statuses_surface_with_extracted_messages() {
	let transport = Arc::new(ScriptedTransport::new(|call| match call.path.as_str() {
		"/api/v1/clients/404" => respond_json(404, json!({ "message": "Not found" })),
		"/api/v1/clients/500" => respond(500, Some("text/html"), "Internal Server Error"),
		"/api/v1/clients/403" => respond(403, None, ""),
		_ => respond_json(200, json!({})),
	}));
	let coordinator = coordinator(config(), &transport);
	let not_found = coordinator
		.get_json::<Value>("/api/v1/clients/404")
		.await
		.expect_err("404 should surface as an error.");

	assert!(matches!(not_found, Error::Http { status: 404, .. }));
	assert_eq!(not_found.to_string(), "Not found");

	let server_error = coordinator
		.get("/api/v1/clients/500")
		.await
		.expect("The response itself should arrive.")
		.parse()
		.expect_err("500 should fail to parse.");

	assert_eq!(server_error.to_string(), "Internal Server Error");

	let forbidden = coordinator
		.get("/api/v1/clients/403")
		.await
		.expect("The response itself should arrive.")
		.parse()
		.expect_err("403 should fail to parse.");

	assert_eq!(forbidden.to_string(), "HTTP 403: Forbidden");
}

#[tokio::test]
async fn text_bodies_are_returned_verbatim() {
	let transport = Arc::new(ScriptedTransport::new(|_| {
		respond(200, Some("text/csv"), "date,amount\n2024-01-02,10")
	}));
	let coordinator = coordinator(config(), &transport);
	let body = coordinator
		.get("/api/v1/export")
		.await
		.expect("Export should succeed.")
		.parse()
		.expect("Text body should decode.");

	assert_eq!(body, ResponseBody::Text("date,amount\n2024-01-02,10".into()));
}

#[tokio::test]
async fn abandoned_requests_release_their_entry() {
	let transport = Arc::new(
		ScriptedTransport::new(session_backend(TOKEN)).with_delay(StdDuration::from_millis(500)),
	);
	let coordinator = coordinator(config(), &transport);
	let abandoned =
		tokio::time::timeout(StdDuration::from_millis(50), coordinator.get("/api/v1/slow")).await;

	assert!(abandoned.is_err());
	assert_eq!(coordinator.stats().in_flight, 0);
	assert_eq!(coordinator.stats().queued, 0);

	coordinator.get("/api/v1/slow").await.expect("Fresh call should succeed.");

	assert_eq!(transport.count("/api/v1/slow"), 2);
}

#[tokio::test]
async fn slow_calls_time_out() {
	let transport = Arc::new(
		ScriptedTransport::new(session_backend(TOKEN)).with_delay(StdDuration::from_millis(500)),
	);
	let timed = config_builder()
		.request_timeout(Some(time::Duration::milliseconds(30)))
		.build()
		.expect("Timed configuration should build.");
	let coordinator = coordinator(timed, &transport);
	let err = coordinator.get("/api/v1/slow").await.expect_err("Slow call should time out.");

	assert!(matches!(err, Error::Timeout { .. }));
	assert_eq!(coordinator.stats().in_flight, 0);

	let untimed = config_builder()
		.request_timeout(None)
		.build()
		.expect("Untimed configuration should build.");
	let untimed = common::coordinator(untimed, &transport);
	let err = untimed
		.send(ApiRequest::get("/api/v1/slow").with_timeout(time::Duration::milliseconds(30)))
		.await
		.expect_err("Per-request timeout should apply.");

	assert!(matches!(err, Error::Timeout { .. }));
}

#[tokio::test]
async fn send_all_returns_responses_in_input_order() {
	let transport = Arc::new(ScriptedTransport::new(session_backend(TOKEN)));
	let coordinator = coordinator(config(), &transport);
	let responses = coordinator
		.send_all([
			ApiRequest::get("/api/v1/analytics/volume").batchable(),
			ApiRequest::get("/api/v1/analytics/psp").batchable(),
			ApiRequest::get("/api/v1/analytics/volume").batchable(),
		])
		.await
		.expect("Every request should succeed.");
	let paths = responses
		.iter()
		.map(|response| response.json::<Value>().expect("Echo body should decode.")["path"].clone())
		.collect::<Vec<_>>();

	assert_eq!(
		paths,
		[
			json!("/api/v1/analytics/volume"),
			json!("/api/v1/analytics/psp"),
			json!("/api/v1/analytics/volume"),
		]
	);
	assert_eq!(transport.count("/api/v1/analytics/volume"), 1);
}

#[tokio::test]
async fn send_all_lets_writes_finish_when_a_sibling_fails() {
	let backend = session_backend(TOKEN);
	let transport = Arc::new(
		ScriptedTransport::new(move |call: &Call| match call.path.as_str() {
			"/api/v1/fail" => Err(TransportError::network(std::io::Error::new(
				std::io::ErrorKind::ConnectionReset,
				"connection reset",
			))),
			_ => backend(call),
		})
		.with_path_delay("/api/v1/transactions", StdDuration::from_millis(150)),
	);
	let config = config_builder().batching(false).build().expect("Configuration should build.");
	let coordinator = coordinator(config, &transport);
	let amount = json!({ "amount": 40 });
	let err = coordinator
		.send_all([
			ApiRequest::post("/api/v1/transactions")
				.with_json(&amount)
				.expect("Body should serialize."),
			ApiRequest::get("/api/v1/fail"),
		])
		.await
		.expect_err("The failing sibling should surface.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert_eq!(transport.completed("/api/v1/transactions"), 1);
	assert_eq!(transport.calls_to("/api/v1/transactions")[0].csrf(), Some(TOKEN));
}
