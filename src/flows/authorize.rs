//! Begin/complete halves of the authorization-code + PKCE flow.

// self
use crate::{
	_prelude::*,
	auth::{AuthorizationAttempt, TokenSet, pkce},
	callback::CallbackResult,
	error::OAuthError,
	flows::FlowCoordinator,
	oauth::TokenExchanger,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl FlowCoordinator {
	/// Starts a new authorization attempt.
	///
	/// Generates a fresh verifier/challenge pair and state nonce, constructs the
	/// authorization URL, and parks the attempt in the coordinator's single
	/// slot. No network call happens here. Fails fast with
	/// [`OAuthError::FlowInProgress`] while another attempt is pending and has
	/// not yet exceeded its wait bound.
	pub fn begin(&self) -> Result<AuthorizationAttempt> {
		let _guard = FlowSpan::new(FlowKind::AuthorizationCode, "begin").entered();
		let mut slot = self.attempt.lock();

		if let Some(pending) = slot.as_ref()
			&& !pending.is_timed_out_at(OffsetDateTime::now_utc())
		{
			return Err(OAuthError::FlowInProgress.into());
		}

		let attempt = pkce::build_attempt(
			&self.endpoints,
			&self.client_id,
			self.scope.clone(),
			self.redirect_uri.clone(),
			self.flow_timeout,
		);

		*slot = Some(attempt.clone());

		Ok(attempt)
	}

	/// Completes the pending attempt with a captured redirect.
	///
	/// The attempt is consumed exactly once: success, timeout, and state
	/// mismatch all discard it, and a mismatch never reaches the token
	/// endpoint. On a matching callback the authorization code plus the
	/// attempt's verifier are exchanged for a [`TokenSet`].
	pub async fn complete(&self, callback: CallbackResult) -> Result<TokenSet> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "complete");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let attempt =
					self.attempt.lock().take().ok_or(OAuthError::AttemptMissing)?;
				let now = OffsetDateTime::now_utc();

				if attempt.is_timed_out_at(now) {
					return Err(OAuthError::FlowTimeout {
						waited: (now - attempt.started_at).whole_seconds().max(0) as u64,
					}
					.into());
				}

				let (code, state) = callback.into_grant()?;

				attempt.validate_state(&state)?;

				let (scope, redirect_uri, pkce) = attempt.into_exchange_parts();
				let exchanger = TokenExchanger::new(
					&self.endpoints,
					&self.client_id,
					&self.client_secret,
					Some(&redirect_uri),
				)?
				.with_http_client(self.http_client.clone());

				exchanger
					.exchange_authorization_code(&code, &pkce.verifier, &redirect_uri, &scope)
					.await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
