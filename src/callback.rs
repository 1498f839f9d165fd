//! Redirect capture: parsing the provider's callback into a [`CallbackResult`].
//!
//! The automatic listener and the manual paste fallback both funnel through
//! [`CallbackResult::from_url`], so a pasted redirect behaves identically to a
//! captured one.

pub mod listener;

pub use listener::CallbackListener;

// self
use crate::{
	_prelude::*,
	error::{ConfigError, OAuthError, RequestError},
};

/// Outcome of one redirect capture; terminal per authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackResult {
	/// Authorization code, when the provider granted one.
	pub code: Option<String>,
	/// State nonce round-tripped through the redirect.
	pub state: Option<String>,
	/// Provider error code (`error` parameter), when authorization failed.
	pub error: Option<String>,
	/// Optional provider error description.
	pub error_description: Option<String>,
}
impl CallbackResult {
	/// Extracts the callback parameters from a redirect URL.
	pub fn from_url(url: &Url) -> Self {
		let mut result = Self { code: None, state: None, error: None, error_description: None };

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"code" => result.code = Some(value.into_owned()),
				"state" => result.state = Some(value.into_owned()),
				"error" => result.error = Some(value.into_owned()),
				"error_description" => result.error_description = Some(value.into_owned()),
				_ => {},
			}
		}

		result
	}

	/// Parses a pasted redirect URL string (manual mode).
	pub fn parse(raw: &str) -> Result<Self> {
		let url =
			Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidRedirect { source })?;

		Ok(Self::from_url(&url))
	}

	/// Returns `true` when the capture carries a usable code + state pair.
	pub fn is_grant(&self) -> bool {
		self.error.is_none() && self.code.is_some() && self.state.is_some()
	}

	/// Resolves the capture into its code + state pair.
	///
	/// A provider error surfaces as [`OAuthError::Denied`]; a redirect missing
	/// the required parameters is rejected before any exchange is attempted.
	pub fn into_grant(self) -> Result<(String, String)> {
		if let Some(code) = self.error {
			return Err(OAuthError::Denied { code, description: self.error_description }.into());
		}

		match (self.code, self.state) {
			(Some(code), Some(state)) => Ok((code, state)),
			(code, state) => {
				let mut missing = Vec::new();

				if code.is_none() {
					missing.push("code");
				}
				if state.is_none() {
					missing.push("state");
				}

				Err(RequestError::Validation {
					status: 400,
					error_type: "invalid_request".into(),
					message: format!("Missing required parameters: {}", missing.join(", ")),
					field_name: Some("callback_params".into()),
				}
				.into())
			},
		}
	}
}
