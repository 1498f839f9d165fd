mod support;

// crates.io
use httpmock::prelude::*;
// self
use fitbit_client::{
	AuthenticateOutcome,
	error::{Error, OAuthError},
	url::Url,
};
use support::*;
use time::Duration;

const TOKEN_RESPONSE: &str = r#"{"access_token":"access-success","refresh_token":"refresh-success","token_type":"bearer","expires_in":28800,"scope":"activity sleep"}"#;

fn base_url(server: &MockServer) -> Url {
	Url::parse(&server.base_url()).expect("Mock base URL should parse.")
}

#[tokio::test]
async fn full_authenticate_exchanges_the_code_and_persists_the_token() {
	let server = MockServer::start_async().await;
	let cache_path = temp_cache_path("full_authenticate");
	let config = test_config(&base_url(&server)).with_token_cache_path(&cache_path);
	let client =
		fitbit_client::FitbitClient::new(config).expect("Test client fixture should build.");
	let outcome = client
		.authenticate(false, |_| {})
		.await
		.expect("Starting the manual flow should succeed.");
	let AuthenticateOutcome::AwaitingRedirect(url) = outcome else {
		panic!("Manual mode should hand back the authorize URL.");
	};
	let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
	let state = pairs.get("state").expect("Authorize URL should carry a state nonce.").clone();

	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&REDIRECT_URI.into()));
	assert_eq!(pairs.get("scope"), Some(&"activity sleep".into()));
	assert_eq!(pairs.get("code_challenge_method"), Some(&"S256".into()));
	assert!(pairs.contains_key("code_challenge"));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=ABC")
				.body_includes("code_verifier=");
			then.status(200).header("content-type", "application/json").body(TOKEN_RESPONSE);
		})
		.await;

	client
		.complete_authorization(&format!("{REDIRECT_URI}?code=ABC&state={state}"))
		.await
		.expect("Completing the flow should succeed.");

	mock.assert_async().await;

	assert!(client.is_authenticated());

	let cached = std::fs::read_to_string(&cache_path)
		.expect("Token cache file should exist after authentication.");
	let cached: serde_json::Value =
		serde_json::from_str(&cached).expect("Token cache should be valid JSON.");

	assert_eq!(cached["access_token"], "access-success");
	assert_eq!(cached["refresh_token"], "refresh-success");
	assert_eq!(cached["scope"], "activity sleep");

	std::fs::remove_file(&cache_path).expect("Removing the temp cache should succeed.");
}

#[tokio::test]
async fn mismatched_state_never_reaches_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&base_url(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_RESPONSE);
		})
		.await;
	let outcome = client
		.authenticate(false, |_| {})
		.await
		.expect("Starting the manual flow should succeed.");
	let AuthenticateOutcome::AwaitingRedirect(_) = outcome else {
		panic!("Manual mode should hand back the authorize URL.");
	};
	let err = client
		.complete_authorization(&format!("{REDIRECT_URI}?code=ABC&state=OTHER"))
		.await
		.expect_err("A mismatched state must fail.");

	assert!(matches!(err, Error::OAuth(OAuthError::AuthMismatch)));
	assert!(!client.is_authenticated());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn provider_denials_surface_without_an_exchange() {
	let server = MockServer::start_async().await;
	let client = build_test_client(&base_url(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_RESPONSE);
		})
		.await;

	client.begin_authorization().expect("Begin should succeed.");

	let err = client
		.complete_authorization(&format!(
			"{REDIRECT_URI}?error=access_denied&error_description=denied+by+user"
		))
		.await
		.expect_err("A provider denial must fail.");

	assert!(matches!(
		err,
		Error::OAuth(OAuthError::Denied { ref code, .. }) if code == "access_denied"
	));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn exceeding_the_flow_timeout_discards_the_attempt() {
	let server = MockServer::start_async().await;
	let mut config = test_config(&base_url(&server));

	config.flow_timeout_seconds = 0;

	let client =
		fitbit_client::FitbitClient::new(config).expect("Test client fixture should build.");
	let url = client.begin_authorization().expect("Begin should succeed.");
	let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
	let state = pairs.get("state").expect("Authorize URL should carry a state nonce.").clone();

	tokio::time::sleep(std::time::Duration::from_millis(20)).await;

	let err = client
		.complete_authorization(&format!("{REDIRECT_URI}?code=ABC&state={state}"))
		.await
		.expect_err("A timed-out attempt must fail.");

	assert!(matches!(err, Error::OAuth(OAuthError::FlowTimeout { .. })));

	// The attempt was discarded; the flow can restart from begin.
	assert!(client.begin_authorization().is_ok());
}

#[tokio::test]
async fn stale_cached_tokens_refresh_silently_on_authenticate() {
	let server = MockServer::start_async().await;
	let cache_path = temp_cache_path("silent_refresh");

	seed_cache(&cache_path, &test_token("stale-access", Duration::seconds(-60)));

	let config = test_config(&base_url(&server)).with_token_cache_path(&cache_path);
	let client =
		fitbit_client::FitbitClient::new(config).expect("Test client fixture should build.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=stale-access-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"access-new","refresh_token":"refresh-new","token_type":"bearer","expires_in":28800}"#);
		})
		.await;
	let outcome = client
		.authenticate(false, |_| panic!("No interactive flow should start."))
		.await
		.expect("Silent refresh should succeed.");

	assert!(matches!(outcome, AuthenticateOutcome::AlreadyAuthenticated));
	mock.assert_async().await;
	assert_eq!(client.refresh_metrics().successes(), 1);

	let cached = std::fs::read_to_string(&cache_path)
		.expect("Token cache file should exist after the refresh.");

	assert!(cached.contains("access-new"));

	std::fs::remove_file(&cache_path).expect("Removing the temp cache should succeed.");
}

#[tokio::test]
async fn rejected_refreshes_fall_through_to_the_interactive_flow() {
	let server = MockServer::start_async().await;
	let cache_path = temp_cache_path("rejected_refresh");

	seed_cache(&cache_path, &test_token("dead-access", Duration::seconds(-60)));

	let config = test_config(&base_url(&server)).with_token_cache_path(&cache_path);
	let client =
		fitbit_client::FitbitClient::new(config).expect("Test client fixture should build.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").body_includes("grant_type=refresh_token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"Refresh token invalid"}"#);
		})
		.await;
	let outcome = client
		.authenticate(false, |_| {})
		.await
		.expect("Authenticate should fall through to the interactive flow.");

	assert!(matches!(outcome, AuthenticateOutcome::AwaitingRedirect(_)));
	mock.assert_async().await;
	assert_eq!(client.refresh_metrics().failures(), 1);

	std::fs::remove_file(&cache_path).expect("Removing the temp cache should succeed.");
}
