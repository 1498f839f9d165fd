//! Client configuration surface: credentials, endpoints, retry and flow knobs.

// std
use std::path::PathBuf;
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

const FITBIT_AUTHORIZATION_URL: &str = "https://www.fitbit.com/oauth2/authorize";
const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
const FITBIT_API_BASE: &str = "https://api.fitbit.com";

/// Default number of retries for rate-limited requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base wait in seconds between rate-limit retries.
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;
/// Default multiplier for successive retry waits.
pub const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 1.5;
/// Default bound in seconds for the callback listener wait.
pub const DEFAULT_CALLBACK_TIMEOUT_SECONDS: u64 = 300;
/// Default bound in seconds for the whole authorization flow.
pub const DEFAULT_FLOW_TIMEOUT_SECONDS: u64 = 300;

/// Provider endpoint locations, overridable for tests against a mock server.
#[derive(Clone, Debug)]
pub struct Endpoints {
	/// Browser-facing authorization URL.
	pub authorization: Url,
	/// Server-to-server token endpoint.
	pub token: Url,
	/// Base URL for resource requests.
	pub api_base: Url,
}
impl Endpoints {
	/// Builds an endpoint set rooted at a single base URL (mock servers).
	pub fn rooted_at(base: &Url) -> Result<Self, ConfigError> {
		let join = |path| base.join(path).map_err(|source| ConfigError::InvalidEndpoint { source });

		Ok(Self {
			authorization: join("/oauth2/authorize")?,
			token: join("/oauth2/token")?,
			api_base: base.clone(),
		})
	}
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			authorization: Url::parse(FITBIT_AUTHORIZATION_URL)
				.expect("Hardcoded authorization URL is valid."),
			token: Url::parse(FITBIT_TOKEN_URL).expect("Hardcoded token URL is valid."),
			api_base: Url::parse(FITBIT_API_BASE).expect("Hardcoded API base URL is valid."),
		}
	}
}

/// How the authorization redirect is captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
	/// Run the transient local HTTPS listener and capture the redirect automatically.
	#[default]
	Listener,
	/// Surface the authorization URL and let the caller paste the redirect URL back.
	Manual,
}

/// Retry/backoff policy applied to rate-limited requests.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Maximum number of retries after the initial attempt.
	pub max_retries: u32,
	/// Base wait in seconds used when no header hints are available.
	pub retry_after_seconds: u64,
	/// Multiplier applied per retry attempt.
	pub backoff_factor: f64,
}
impl RetryPolicy {
	/// Exponential backoff delay for a 0-based attempt index: `base * factor^attempt`.
	pub fn backoff_delay(&self, attempt: u32) -> Duration {
		let factor = self.backoff_factor.max(0.0);
		let secs = (self.retry_after_seconds as f64 * factor.powi(attempt as i32)) as i64;

		Duration::seconds(secs)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: DEFAULT_MAX_RETRIES,
			retry_after_seconds: DEFAULT_RETRY_AFTER_SECONDS,
			backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
		}
	}
}

/// Configuration consumed when constructing a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret used for Basic auth on the token endpoint.
	pub client_secret: String,
	/// Registered redirect URI; must use HTTPS when the listener mode is active.
	pub redirect_uri: String,
	/// Requested scopes; defaults to the full Fitbit scope list.
	#[serde(default = "ScopeSet::default_scopes")]
	pub scope: ScopeSet,
	/// Optional token cache location; absent means tokens live only in memory.
	#[serde(default)]
	pub token_cache_path: Option<PathBuf>,
	/// Locale sent via `Accept-Locale` on every resource request.
	#[serde(default = "default_locale")]
	pub locale: String,
	/// Language sent via `Accept-Language` on every resource request.
	#[serde(default = "default_locale")]
	pub language: String,
	/// Rate-limit retry policy.
	#[serde(default)]
	pub retry: RetryPolicy,
	/// Bound in seconds for the callback listener wait.
	#[serde(default = "default_callback_timeout")]
	pub callback_timeout_seconds: u64,
	/// Bound in seconds between starting an authorization attempt and completing it.
	#[serde(default = "default_flow_timeout")]
	pub flow_timeout_seconds: u64,
	/// Redirect capture mode.
	#[serde(default)]
	pub flow_mode: FlowMode,
	/// Provider endpoints; defaults to production Fitbit, overridable for tests.
	#[serde(skip, default)]
	pub endpoints: Endpoints,
}
impl ClientConfig {
	/// Creates a configuration with required credentials and defaults everywhere else.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			redirect_uri: redirect_uri.into(),
			scope: ScopeSet::default_scopes(),
			token_cache_path: None,
			locale: default_locale(),
			language: default_locale(),
			retry: RetryPolicy::default(),
			callback_timeout_seconds: default_callback_timeout(),
			flow_timeout_seconds: default_flow_timeout(),
			flow_mode: FlowMode::default(),
			endpoints: Endpoints::default(),
		}
	}

	/// Overrides the requested scope set.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the token cache file location.
	pub fn with_token_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.token_cache_path = Some(path.into());

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Switches the redirect capture mode.
	pub fn with_flow_mode(mut self, mode: FlowMode) -> Self {
		self.flow_mode = mode;

		self
	}

	/// Overrides the provider endpoints (mock servers in tests).
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Parses and validates the configured redirect URI.
	pub fn parsed_redirect_uri(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.redirect_uri).map_err(|source| ConfigError::InvalidRedirect { source })
	}
}

fn default_locale() -> String {
	"en_US".into()
}

fn default_callback_timeout() -> u64 {
	DEFAULT_CALLBACK_TIMEOUT_SECONDS
}

fn default_flow_timeout() -> u64 {
	DEFAULT_FLOW_TIMEOUT_SECONDS
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn backoff_delay_follows_the_exponential_formula() {
		let policy = RetryPolicy {
			max_retries: 3,
			retry_after_seconds: 60,
			backoff_factor: 1.5,
		};

		assert_eq!(policy.backoff_delay(0), Duration::seconds(60));
		assert_eq!(policy.backoff_delay(1), Duration::seconds(90));
		assert_eq!(policy.backoff_delay(2), Duration::seconds(135));
	}

	#[test]
	fn config_defaults_match_documented_values() {
		let config = ClientConfig::new("id", "secret", "https://localhost:8080");

		assert_eq!(config.retry.max_retries, 3);
		assert_eq!(config.retry.retry_after_seconds, 60);
		assert!((config.retry.backoff_factor - 1.5).abs() < f64::EPSILON);
		assert_eq!(config.callback_timeout_seconds, 300);
		assert_eq!(config.flow_mode, FlowMode::Listener);
		assert_eq!(config.endpoints.api_base.as_str(), "https://api.fitbit.com/");
	}

	#[test]
	fn config_deserializes_with_partial_fields() {
		let config: ClientConfig = serde_json::from_str(
			r#"{
				"client_id": "id",
				"client_secret": "secret",
				"redirect_uri": "https://localhost:8080",
				"flow_mode": "manual",
				"retry": { "max_retries": 5 }
			}"#,
		)
		.expect("Partial config should deserialize with defaults.");

		assert_eq!(config.flow_mode, FlowMode::Manual);
		assert_eq!(config.retry.max_retries, 5);
		assert_eq!(config.retry.retry_after_seconds, 60);
		assert!(!config.scope.is_empty());
	}

	#[test]
	fn endpoints_root_at_a_mock_base() {
		let base = Url::parse("https://127.0.0.1:5000").expect("Base URL fixture should parse.");
		let endpoints = Endpoints::rooted_at(&base).expect("Rooted endpoints should build.");

		assert_eq!(endpoints.token.as_str(), "https://127.0.0.1:5000/oauth2/token");
	}
}
