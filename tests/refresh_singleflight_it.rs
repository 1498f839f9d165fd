mod support;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use fitbit_client::{FitbitClient, url::Url};
use support::*;
use time::Duration;

#[tokio::test]
async fn concurrent_requests_share_one_refresh_exchange() {
	let server = MockServer::start_async().await;
	let base = Url::parse(&server.base_url()).expect("Mock base URL should parse.");
	let cache_path = temp_cache_path("singleflight");

	seed_cache(&cache_path, &test_token("stale-access", Duration::seconds(-60)));

	let config = test_config(&base).with_token_cache_path(&cache_path);
	let client =
		Arc::new(FitbitClient::new(config).expect("Test client fixture should build."));

	client.load_cached_token().await.expect("Loading the seeded cache should succeed.");

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").body_includes("grant_type=refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(r#"{"access_token":"access-shared","refresh_token":"refresh-shared","token_type":"bearer","expires_in":28800}"#);
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1/user/-/profile.json")
				.header("authorization", "Bearer access-shared");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"user":{"fullName":"Shared User"}}"#);
		})
		.await;
	let mut handles = Vec::new();

	for _ in 0..4 {
		let client = client.clone();

		handles.push(tokio::spawn(async move { client.get_profile().await }));
	}

	for handle in handles {
		let body = handle
			.await
			.expect("Concurrent request task should not panic.")
			.expect("Concurrent request should succeed.");

		assert_eq!(
			body.into_json().expect("Response should be JSON.")["user"]["fullName"],
			"Shared User"
		);
	}

	// One refresh for four concurrent wakers; every call then used its result.
	refresh.assert_calls_async(1).await;
	profile.assert_calls_async(4).await;
	assert_eq!(client.refresh_metrics().attempts(), 1);

	std::fs::remove_file(&cache_path).expect("Removing the temp cache should succeed.");
}
