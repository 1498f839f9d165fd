//! Refresh-token exchange wired into the token manager's single-flight port.
//!
//! The manager serializes refreshes and decides *when* one is due; this module
//! only performs the `grant_type=refresh_token` call and classifies its
//! outcome. An `invalid_grant`-class rejection is fatal: the caller must re-run
//! the interactive flow, the coordinator never restarts it on its own.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{RefreshFuture, TokenRefresher, TokenSet},
	flows::FlowCoordinator,
	oauth::TokenExchanger,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl FlowCoordinator {
	/// Performs a refresh-token exchange for the provided credential.
	pub async fn refresh_token_set(&self, current: &TokenSet) -> Result<TokenSet> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_token_set");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let exchanger = TokenExchanger::new(
					&self.endpoints,
					&self.client_id,
					&self.client_secret,
					None,
				)?
				.with_http_client(self.http_client.clone());

				exchanger
					.exchange_refresh_token(current.refresh_token.expose(), &current.scope)
					.await
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}
impl TokenRefresher for FlowCoordinator {
	fn refresh<'a>(&'a self, current: &'a TokenSet) -> RefreshFuture<'a> {
		Box::pin(self.refresh_token_set(current))
	}
}
