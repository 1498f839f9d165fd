//! PKCE verifier/challenge generation and in-flight authorization attempt state.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, config::Endpoints, error::OAuthError};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods surfaced via [`AuthorizationAttempt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// One in-flight authorization-code + PKCE attempt.
///
/// Created when the flow begins, consumed exactly once by a matching callback.
/// The verifier never leaves this struct except inside the token-exchange call.
#[derive(Clone)]
pub struct AuthorizationAttempt {
	/// Requested scope set.
	pub scope: ScopeSet,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL that callers should send end-users to.
	pub authorize_url: Url,
	/// Instant the attempt was created; timeout accounting starts here.
	pub started_at: OffsetDateTime,
	/// Bounded wait for the whole flow, from begin to completion.
	pub flow_timeout: Duration,
	pkce: PkcePair,
}
impl AuthorizationAttempt {
	fn new(
		scope: ScopeSet,
		redirect_uri: Url,
		authorize_url: Url,
		state: String,
		flow_timeout: Duration,
		pkce: PkcePair,
	) -> Self {
		Self {
			scope,
			state,
			redirect_uri,
			authorize_url,
			started_at: OffsetDateTime::now_utc(),
			flow_timeout,
			pkce,
		}
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// Returns `true` when the attempt exceeded its configured wait bound.
	pub fn is_timed_out_at(&self, now: OffsetDateTime) -> bool {
		now - self.started_at > self.flow_timeout
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<(), OAuthError> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(OAuthError::AuthMismatch)
		}
	}

	pub(crate) fn into_exchange_parts(self) -> (ScopeSet, Url, PkcePair) {
		let AuthorizationAttempt { scope, redirect_uri, pkce, .. } = self;

		(scope, redirect_uri, pkce)
	}
}
impl Debug for AuthorizationAttempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationAttempt")
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("started_at", &self.started_at)
			.field("flow_timeout", &self.flow_timeout)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone)]
pub(crate) struct PkcePair {
	pub(crate) verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	pub(crate) fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(crate) fn build_attempt(
	endpoints: &Endpoints,
	client_id: &str,
	scope: ScopeSet,
	redirect_uri: Url,
	flow_timeout: Duration,
) -> AuthorizationAttempt {
	let state = random_string(STATE_LEN);
	let pkce = PkcePair::generate();
	let authorize_url = build_authorize_url(endpoints, client_id, &redirect_uri, &scope, &state, &pkce);

	AuthorizationAttempt::new(scope, redirect_uri, authorize_url, state, flow_timeout, pkce)
}

fn build_authorize_url(
	endpoints: &Endpoints,
	client_id: &str,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if !scope.is_empty() {
		pairs.append_pair("scope", &scope.normalized());
	}

	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("code_challenge_method", pkce.method.as_str());

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}
