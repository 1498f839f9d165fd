//! High-level flow orchestration for the authorization-code + PKCE grant.

pub mod authorize;
pub mod refresh;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AuthorizationAttempt, ScopeSet},
	config::{ClientConfig, Endpoints},
	error::ConfigError,
	http::ReqwestHttpClient,
};

/// Drives one complete authorization-code-with-PKCE exchange and token refreshes.
///
/// The coordinator owns the endpoints, the client credentials, and the single
/// slot for the in-flight [`AuthorizationAttempt`]. Exactly one attempt can be
/// pending at a time; a second concurrent `begin` fails fast instead of racing
/// for the redirect listener.
pub struct FlowCoordinator {
	pub(crate) endpoints: Endpoints,
	pub(crate) client_id: String,
	pub(crate) client_secret: String,
	pub(crate) redirect_uri: Url,
	pub(crate) scope: ScopeSet,
	pub(crate) flow_timeout: Duration,
	pub(crate) http_client: ReqwestHttpClient,
	pub(crate) refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) attempt: Mutex<Option<AuthorizationAttempt>>,
}
impl FlowCoordinator {
	/// Builds a coordinator from the client configuration and a shared transport.
	pub fn from_config(
		config: &ClientConfig,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let redirect_uri = config.parsed_redirect_uri()?;

		Ok(Self {
			endpoints: config.endpoints.clone(),
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			redirect_uri,
			scope: config.scope.clone(),
			flow_timeout: Duration::seconds(config.flow_timeout_seconds as i64),
			http_client,
			refresh_metrics: Default::default(),
			attempt: Mutex::new(None),
		})
	}

	/// Shared counters for refresh flow outcomes.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresh_metrics.clone()
	}

	/// Returns the pending attempt's authorize URL, if a flow is in flight.
	pub fn pending_authorize_url(&self) -> Option<Url> {
		self.attempt.lock().as_ref().map(|attempt| attempt.authorize_url.clone())
	}
}
impl Debug for FlowCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FlowCoordinator")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("scope", &self.scope)
			.field("flow_timeout", &self.flow_timeout)
			.field("attempt_pending", &self.attempt.lock().is_some())
			.finish()
	}
}
