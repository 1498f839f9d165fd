//! Client-wide error types shared across flows, the executor, and stores.

// self
use crate::{_prelude::*, http::RateLimitInfo};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Pre-request parameter validation failure; never reaches the network.
	#[error(transparent)]
	Validation(#[from] ClientValidationError),
	/// Authorization/refresh flow failure.
	#[error(transparent)]
	OAuth(#[from] OAuthError),
	/// API request failure decoded from a non-2xx response.
	#[error(transparent)]
	Request(#[from] RequestError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Authorization-code and refresh flow failures.
#[derive(Debug, ThisError)]
pub enum OAuthError {
	/// The callback `state` did not match the one issued with the authorization URL.
	/// Fatal: the flow must restart from a fresh authorization attempt.
	#[error("Authorization state mismatch; restart the authorization flow.")]
	AuthMismatch,
	/// Provider rejected the grant (bad code or refresh token). Requires re-authentication.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Token was rejected as invalid. Requires re-authentication.
	#[error("Provider rejected the token: {reason}.")]
	InvalidToken {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider redirected back with an error instead of an authorization code.
	#[error("Authorization was denied by the provider: {code}.")]
	Denied {
		/// OAuth error code carried on the redirect (`error` parameter).
		code: String,
		/// Optional human-readable description (`error_description` parameter).
		description: Option<String>,
	},
	/// The authorization attempt exceeded its configured wait bound.
	#[error("Authorization flow timed out after {waited} seconds.")]
	FlowTimeout {
		/// Seconds waited before giving up.
		waited: u64,
	},
	/// A second concurrent authorization attempt was rejected.
	#[error("Another authorization attempt is already in flight.")]
	FlowInProgress,
	/// No credential is available; the interactive flow has not completed yet.
	#[error("No credential is available; run the authorization flow first.")]
	NotAuthenticated,
	/// Completion was requested without a pending authorization attempt.
	#[error("No authorization attempt is in flight; begin the flow first.")]
	AttemptMissing,
	/// Token endpoint returned an unexpected but non-fatal response; safe to retry.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// API request failures decoded from non-2xx responses.
///
/// Every variant carries the HTTP status, the provider's `errorType` string, and
/// its message so callers can branch without string inspection.
#[derive(Debug, ThisError)]
pub enum RequestError {
	/// Authorization was rejected (401-class, including a failed silent refresh-retry).
	#[error("Authorization was rejected: {message}.")]
	Authorization {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
	/// The application lacks permission for the requested operation.
	#[error("Insufficient permissions: {message}.")]
	InsufficientPermissions {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
	/// The granted scopes do not cover the requested operation.
	#[error("Insufficient scope: {message}.")]
	InsufficientScope {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
	/// The requested resource does not exist.
	#[error("Resource not found: {message}.")]
	NotFound {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
	/// A request parameter was rejected by the API.
	#[error("Request validation failed: {message}.")]
	Validation {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
		/// Offending field, when the provider names one.
		field_name: Option<String>,
	},
	/// Rate limit quota exhausted after all configured retries.
	#[error("Rate limit exceeded: {message}.")]
	RateLimitExceeded {
		/// HTTP status code (429).
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
		/// Last observed rate-limit header values.
		info: RateLimitInfo,
	},
	/// Server-side failure (5xx-class).
	#[error("API system error: {message}.")]
	System {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
	/// Generic fallback when neither status nor `errorType` matches a known kind.
	#[error("Request failed: {message}.")]
	Request {
		/// HTTP status code.
		status: u16,
		/// Provider `errorType` discriminator.
		error_type: String,
		/// Provider-supplied message.
		message: String,
	},
}
impl RequestError {
	/// HTTP status code carried by the error.
	pub fn status(&self) -> u16 {
		match self {
			Self::Authorization { status, .. }
			| Self::InsufficientPermissions { status, .. }
			| Self::InsufficientScope { status, .. }
			| Self::NotFound { status, .. }
			| Self::Validation { status, .. }
			| Self::RateLimitExceeded { status, .. }
			| Self::System { status, .. }
			| Self::Request { status, .. } => *status,
		}
	}

	/// Provider `errorType` discriminator carried by the error.
	pub fn error_type(&self) -> &str {
		match self {
			Self::Authorization { error_type, .. }
			| Self::InsufficientPermissions { error_type, .. }
			| Self::InsufficientScope { error_type, .. }
			| Self::NotFound { error_type, .. }
			| Self::Validation { error_type, .. }
			| Self::RateLimitExceeded { error_type, .. }
			| Self::System { error_type, .. }
			| Self::Request { error_type, .. } => error_type,
		}
	}
}

/// Pre-request validation failures raised by resource wrappers.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientValidationError {
	/// A date string is not `today` or a valid `YYYY-MM-DD` calendar date.
	#[error("Invalid date format for `{field_name}`. Expected YYYY-MM-DD, got: {value}.")]
	InvalidDate {
		/// The rejected input.
		value: String,
		/// Parameter name for error reporting.
		field_name: String,
	},
	/// A date range is inverted or exceeds the endpoint's maximum span.
	#[error("Invalid date range: {reason}.")]
	InvalidDateRange {
		/// Range start as supplied.
		start: String,
		/// Range end as supplied.
		end: String,
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Pagination parameters are inconsistent or out of bounds.
	#[error("Invalid pagination parameters: {message}.")]
	Pagination {
		/// Human-readable rejection reason.
		message: String,
		/// Offending parameter, when one can be named.
		field_name: Option<String>,
	},
}

/// Configuration and validation failures raised while wiring the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An API endpoint override contains an invalid URL.
	#[error("Endpoint configuration contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI must use the HTTPS scheme for the callback listener.
	#[error("Redirect URI must use HTTPS, got scheme `{scheme}`.")]
	RedirectNotHttps {
		/// The rejected scheme.
		scheme: String,
	},
	/// Redirect URI is missing a host to bind the callback listener to.
	#[error("Redirect URI is missing a host.")]
	MissingRedirectHost,
	/// Self-signed certificate or TLS acceptor setup failed.
	#[error("Callback listener TLS setup failed.")]
	Tls {
		/// Underlying certificate/TLS failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint response omitted the refresh token.
	#[error("Token endpoint response is missing a refresh token.")]
	MissingRefreshToken,
	/// Token set builder validation failed.
	#[error("Unable to build token set.")]
	TokenBuild(#[from] crate::auth::TokenSetBuilderError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a certificate or TLS configuration failure inside [`ConfigError`].
	pub fn tls(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Tls { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_error_accessors_cover_all_variants() {
		let err = RequestError::Validation {
			status: 400,
			error_type: "validation".into(),
			message: "Invalid food ID.".into(),
			field_name: Some("foodId".into()),
		};

		assert_eq!(err.status(), 400);
		assert_eq!(err.error_type(), "validation");

		let err = RequestError::NotFound {
			status: 404,
			error_type: "not_found".into(),
			message: "No such log.".into(),
		};

		assert_eq!(err.status(), 404);
	}

	#[test]
	fn oauth_mismatch_is_terminal_and_descriptive() {
		let err = Error::from(OAuthError::AuthMismatch);

		assert!(err.to_string().contains("state mismatch"));
	}
}
