//! Internal facade over the `oauth2` crate for token exchanges.
//!
//! The facade owns the configured [`BasicClient`] plus the instrumented reqwest
//! transport and translates every failure mode into the crate's error taxonomy.
//! Client authentication uses HTTP Basic with `client_id:client_secret`; the
//! provider requires it on the token endpoint even for PKCE-protected grants.

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSet},
	config::Endpoints,
	error::{ConfigError, OAuthError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;

/// Wire shape of the provider's error envelope on non-standard token responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
	errors: Vec<ProviderErrorEntry>,
}
#[derive(Debug, Deserialize)]
struct ProviderErrorEntry {
	#[serde(rename = "errorType")]
	error_type: String,
	message: Option<String>,
}

pub(crate) struct TokenExchanger {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
}
impl TokenExchanger {
	pub(crate) fn new(
		endpoints: &Endpoints,
		client_id: &str,
		client_secret: &str,
		redirect_uri: Option<&Url>,
	) -> Result<Self> {
		let auth_url = AuthUrl::from_url(endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(endpoints.token.clone());
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if let Some(redirect) = redirect_uri {
			let redirect_url = RedirectUrl::new(redirect.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;

			oauth_client = oauth_client.set_redirect_uri(redirect_url);
		}

		Ok(Self { oauth_client, http_client: ReqwestHttpClient::default() })
	}

	pub(crate) fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Exchanges an authorization code plus its PKCE verifier for a token set.
	pub(crate) async fn exchange_authorization_code(
		&self,
		code: &str,
		pkce_verifier: &str,
		redirect_uri: &Url,
		requested_scope: &ScopeSet,
	) -> Result<TokenSet> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let request = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url));
		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(requested_scope, response)
	}

	/// Performs a `grant_type=refresh_token` exchange.
	pub(crate) async fn exchange_refresh_token(
		&self,
		refresh_token: &str,
		requested_scope: &ScopeSet,
	) -> Result<TokenSet> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.to_owned());
		let request = self.oauth_client.exchange_refresh_token(&refresh_secret);
		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(requested_scope, response)
	}
}
impl Debug for TokenExchanger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger").finish_non_exhaustive()
	}
}

fn map_token_response(requested_scope: &ScopeSet, response: FacadeTokenResponse) -> Result<TokenSet> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let scope = match response.scopes() {
		Some(scopes) => ScopeSet::new(scopes.iter().map(|scope| scope.as_ref()))
			.map_err(ConfigError::from)?,
		None => requested_scope.clone(),
	};
	let refresh_token =
		response.refresh_token().ok_or(ConfigError::MissingRefreshToken)?.secret().to_owned();

	TokenSet::builder(scope)
		.access_token(response.access_token().secret().to_owned())
		.refresh_token(refresh_token)
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(|err| ConfigError::from(err).into())
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) => map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, body) => map_parse_error(error, &body, meta_ref),
		RequestTokenError::Other(message) => OAuthError::TokenEndpoint {
			message: format!("Token endpoint returned an unexpected response: {message}"),
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_owned();
	let message = response
		.error_description()
		.cloned()
		.unwrap_or_else(|| format!("Token endpoint returned an OAuth error: {code}"));

	classify_oauth_error(&code, message, meta)
}

/// The provider wraps some token-endpoint rejections in its own
/// `{"errors": [{"errorType": ...}]}` envelope instead of the RFC 6749 shape;
/// those surface as parse failures from the `oauth2` crate and are decoded here.
fn map_parse_error(
	error: serde_path_to_error::Error<serde_json::error::Error>,
	body: &[u8],
	meta: Option<&ResponseMetadata>,
) -> Error {
	if let Ok(envelope) = serde_json::from_slice::<ProviderErrorEnvelope>(body)
		&& let Some(entry) = envelope.errors.first()
	{
		let message = entry
			.message
			.clone()
			.unwrap_or_else(|| format!("Token endpoint rejected the grant: {}", entry.error_type));

		return classify_oauth_error(&entry.error_type, message, meta);
	}

	OAuthError::TokenResponseParse { source: error, status: meta_status(meta) }.into()
}

fn classify_oauth_error(code: &str, message: String, meta: Option<&ResponseMetadata>) -> Error {
	match code {
		"invalid_grant" => OAuthError::InvalidGrant { reason: message }.into(),
		"invalid_client" | "unauthorized_client" => OAuthError::InvalidClient { reason: message }.into(),
		"invalid_token" | "expired_token" => OAuthError::InvalidToken { reason: message }.into(),
		_ => OAuthError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_transport_error(
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<ReqwestError>,
) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => OAuthError::TokenEndpoint {
			message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
		_ => OAuthError::TokenEndpoint {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return OAuthError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchanger_builds_with_and_without_redirect() {
		let endpoints = Endpoints::default();
		let redirect =
			Url::parse("https://localhost:8080/callback").expect("Redirect fixture should parse.");

		assert!(TokenExchanger::new(&endpoints, "client-id", "secret", Some(&redirect)).is_ok());
		assert!(TokenExchanger::new(&endpoints, "client-id", "secret", None).is_ok());
	}

	#[test]
	fn provider_envelope_rejections_classify_by_error_type() {
		let body = br#"{"errors":[{"errorType":"invalid_grant","message":"Refresh token invalid."}],"success":false}"#;
		let mut deserializer = serde_json::Deserializer::from_slice(b"{}");
		let parse_error =
			serde_path_to_error::deserialize::<_, FacadeTokenResponse>(&mut deserializer)
				.expect_err("Fixture deserialization should fail.");
		let err = map_parse_error(parse_error, body, None);

		assert!(matches!(err, Error::OAuth(OAuthError::InvalidGrant { .. })));
	}

	#[test]
	fn unknown_envelope_bodies_fall_back_to_parse_errors() {
		let body = br#"<html>gateway timeout</html>"#;
		let mut deserializer = serde_json::Deserializer::from_slice(b"{}");
		let parse_error =
			serde_path_to_error::deserialize::<_, FacadeTokenResponse>(&mut deserializer)
				.expect_err("Fixture deserialization should fail.");
		let err = map_parse_error(
			parse_error,
			body,
			Some(&ResponseMetadata { status: Some(504), retry_after: None }),
		);

		assert!(matches!(
			err,
			Error::OAuth(OAuthError::TokenResponseParse { status: Some(504), .. })
		));
	}

	#[test]
	fn expired_token_codes_map_to_invalid_token() {
		let err = classify_oauth_error("expired_token", "Access token expired.".into(), None);

		assert!(matches!(err, Error::OAuth(OAuthError::InvalidToken { .. })));
	}
}
