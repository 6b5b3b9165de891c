//! Demonstrates a dashboard session against a mock backend: concurrent reads collapse onto one
//! call, and a write fetches the CSRF token once before it is sent.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
use url::Url;
// self
use treasury_client::{
	config::ClientConfig,
	coordinator::ReqwestCoordinator,
	request::ApiRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let auth_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/check");
			then.status(200);
		})
		.await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/csrf-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"csrf_token\":\"demo-csrf-token-0123456789\"}");
		})
		.await;
	let summary_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/daily-summary");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"date\":\"2024-06-01\",\"total\":1250.5}");
		})
		.await;
	let create_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/transactions")
				.header("x-csrftoken", "demo-csrf-token-0123456789");
			then.status(201).header("content-type", "application/json").body("{\"id\":42}");
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let coordinator = ReqwestCoordinator::new(config)?;
	let (first, second) = tokio::join!(
		coordinator.get_json::<Value>("/api/v1/daily-summary"),
		coordinator.get_json::<Value>("/api/v1/daily-summary"),
	);

	println!("Daily summary: {}.", first?);
	println!("Shared copy: {}.", second?);

	let created = coordinator
		.send(ApiRequest::post("/api/v1/transactions").with_json(&json!({ "amount": 125 }))?)
		.await?
		.parse()?;

	println!("Created transaction: {created:?}.");
	println!("Coordinator state: {:?}.", coordinator.stats());

	auth_mock.assert_async().await;
	token_mock.assert_async().await;
	summary_mock.assert_async().await;
	create_mock.assert_async().await;

	Ok(())
}
