//! Authenticated request execution with retry, refresh, and typed error decoding.

// crates.io
use reqwest::{Method, Response, StatusCode, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{TokenManager, TokenRefresher},
	config::{ClientConfig, RetryPolicy},
	error::{RequestError, TransportError},
	http::{self, RateLimitInfo},
	obs::{RequestEvent, RequestObserver},
};

/// Request body payloads supported by the API.
#[derive(Clone, Debug)]
pub enum RequestBody {
	/// `application/x-www-form-urlencoded` key/value pairs.
	Form(Vec<(String, String)>),
	/// JSON document.
	Json(serde_json::Value),
}

/// One outbound call: method, relative path, parameters, and extra headers.
///
/// Constructed by resource wrappers and consumed exactly once by
/// [`RequestExecutor::execute`].
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// API path relative to the base URL, e.g. `/1/user/-/profile.json`.
	pub path: String,
	/// Query parameters appended to the path.
	pub query: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<RequestBody>,
	/// Extra headers for this call only.
	pub headers: Vec<(String, String)>,
}
impl RequestDescriptor {
	/// Creates a descriptor with the provided method and relative path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None, headers: Vec::new() }
	}

	/// GET descriptor for the provided relative path.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// POST descriptor for the provided relative path.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// DELETE descriptor for the provided relative path.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends one query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Appends a query parameter only when a value is present.
	pub fn with_opt_query(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
		match value {
			Some(value) => self.with_query(key, value),
			None => self,
		}
	}

	/// Attaches a form-encoded body.
	pub fn with_form(mut self, pairs: Vec<(String, String)>) -> Self {
		self.body = Some(RequestBody::Form(pairs));

		self
	}

	/// Attaches a JSON body.
	pub fn with_json(mut self, value: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(value));

		self
	}

	/// Adds a header for this call only.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Decoded response value handed back to resource wrappers.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
	/// JSON-family content, returned as-is for the wrapper to interpret.
	Json(serde_json::Value),
	/// Raw text payloads (TCX/XML exports).
	Raw(String),
	/// HTTP 204 or a bodyless success.
	NoContent,
}
impl ResponseBody {
	/// Returns the JSON value, if this body carries one.
	pub fn as_json(&self) -> Option<&serde_json::Value> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Consumes the body into its JSON value, if it carries one.
	pub fn into_json(self) -> Option<serde_json::Value> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Returns `true` for the no-content sentinel.
	pub fn is_no_content(&self) -> bool {
		matches!(self, Self::NoContent)
	}
}

/// Wire shape of the provider's error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
	errors: Vec<ErrorEntry>,
}
#[derive(Debug, Deserialize)]
struct ErrorEntry {
	#[serde(rename = "errorType")]
	error_type: String,
	message: Option<String>,
	#[serde(rename = "fieldName")]
	field_name: Option<String>,
}

/// Executes authenticated API calls with bounded retry and typed error decoding.
///
/// Each call attaches the current bearer token from the shared [`TokenManager`].
/// A 401 triggers exactly one silent refresh-and-retry per logical call; a 429
/// is retried with header-aware waits up to the configured maximum. All other
/// non-2xx responses are decoded into the [`RequestError`] taxonomy.
pub struct RequestExecutor {
	http: ReqwestClient,
	api_base: Url,
	manager: Arc<TokenManager>,
	refresher: Arc<dyn TokenRefresher>,
	retry: RetryPolicy,
	locale: String,
	language: String,
	observer: Arc<dyn RequestObserver>,
}
impl RequestExecutor {
	/// Wires an executor from its collaborators; base URL, retry policy, and
	/// locale headers come from the configuration.
	pub fn new(
		http: ReqwestClient,
		config: &ClientConfig,
		manager: Arc<TokenManager>,
		refresher: Arc<dyn TokenRefresher>,
		observer: Arc<dyn RequestObserver>,
	) -> Self {
		Self {
			http,
			api_base: config.endpoints.api_base.clone(),
			manager,
			refresher,
			retry: config.retry,
			locale: config.locale.clone(),
			language: config.language.clone(),
			observer,
		}
	}

	/// Executes one logical call, retrying through 401-refresh and 429 backoff.
	pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<ResponseBody> {
		let method = descriptor.method.to_string();
		let path = descriptor.path.clone();
		let mut rate_limit_attempt: u32 = 0;
		let mut refreshed_once = false;

		loop {
			let token = self.manager.current(self.refresher.as_ref()).await?;
			let bearer = token.access_token.expose().to_owned();
			let response = match self.send(&descriptor, &bearer).await {
				Ok(response) => response,
				Err(err) => {
					self.observer.on_request_event(&RequestEvent::Failed {
						method: method.clone(),
						path: path.clone(),
						status: None,
						kind: "transport",
					});

					return Err(err);
				},
			};
			let status = response.status();
			let info = RateLimitInfo::from_headers(response.headers());

			if status == StatusCode::UNAUTHORIZED && !refreshed_once {
				refreshed_once = true;

				self.manager.force_refresh(&bearer, self.refresher.as_ref()).await?;
				self.observer.on_request_event(&RequestEvent::Retrying {
					method: method.clone(),
					path: path.clone(),
					attempt: 1,
					wait: Duration::ZERO,
					rate_limit: None,
				});

				continue;
			}
			if status == StatusCode::TOO_MANY_REQUESTS {
				let retry_after = http::parse_retry_after(response.headers());

				if rate_limit_attempt >= self.retry.max_retries {
					let bytes = response.bytes().await.unwrap_or_default();
					let err = decode_error(status.as_u16(), &bytes, info);

					self.fail(&method, &path, &err);

					return Err(err.into());
				}

				let wait = retry_wait(&info, retry_after, rate_limit_attempt, &self.retry);

				self.observer.on_request_event(&RequestEvent::Retrying {
					method: method.clone(),
					path: path.clone(),
					attempt: rate_limit_attempt + 1,
					wait,
					rate_limit: (!info.is_empty()).then(|| info.clone()),
				});
				sleep(wait).await;

				rate_limit_attempt += 1;

				continue;
			}
			if !status.is_success() {
				let bytes = response.bytes().await.unwrap_or_default();
				let err = decode_error(status.as_u16(), &bytes, info);

				self.fail(&method, &path, &err);

				return Err(err.into());
			}

			let body = decode_success(status, response).await?;

			self.observer.on_request_event(&RequestEvent::Succeeded {
				method,
				path,
				status: status.as_u16(),
			});

			return Ok(body);
		}
	}

	async fn send(&self, descriptor: &RequestDescriptor, bearer: &str) -> Result<Response> {
		let mut url = self
			.api_base
			.join(&descriptor.path)
			.map_err(|source| crate::error::ConfigError::InvalidEndpoint { source })?;

		if !descriptor.query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in &descriptor.query {
				pairs.append_pair(key, value);
			}
		}

		let mut request = self
			.http
			.request(descriptor.method.clone(), url)
			.bearer_auth(bearer)
			.header("Accept-Locale", &self.locale)
			.header("Accept-Language", &self.language);

		for (name, value) in &descriptor.headers {
			request = request.header(name, value);
		}

		request = match &descriptor.body {
			Some(RequestBody::Form(pairs)) => request.form(pairs),
			Some(RequestBody::Json(value)) => request.json(value),
			None => request,
		};

		request.send().await.map_err(|e| TransportError::from(e).into())
	}

	fn fail(&self, method: &str, path: &str, err: &RequestError) {
		self.observer.on_request_event(&RequestEvent::Failed {
			method: method.to_owned(),
			path: path.to_owned(),
			status: Some(err.status()),
			kind: kind_label(err),
		});
	}
}
impl Debug for RequestExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("api_base", &self.api_base)
			.field("retry", &self.retry)
			.field("locale", &self.locale)
			.finish_non_exhaustive()
	}
}

async fn sleep(wait: Duration) {
	if let Ok(wait) = std::time::Duration::try_from(wait) {
		tokio::time::sleep(wait).await;
	}
}

async fn decode_success(status: StatusCode, response: Response) -> Result<ResponseBody> {
	if status == StatusCode::NO_CONTENT {
		return Ok(ResponseBody::NoContent);
	}

	let content_type = response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default()
		.to_ascii_lowercase();

	if content_type.contains("json") {
		let bytes = response.bytes().await.map_err(TransportError::from)?;
		let value = serde_json::from_slice(&bytes).map_err(|e| RequestError::System {
			status: status.as_u16(),
			error_type: "system".into(),
			message: format!("Invalid JSON response: {e}"),
		})?;

		return Ok(ResponseBody::Json(value));
	}
	if content_type.contains("xml") {
		let text = response.text().await.map_err(TransportError::from)?;

		return Ok(ResponseBody::Raw(text));
	}

	// Bodyless success or an unexpected content type; nothing to decode.
	Ok(ResponseBody::NoContent)
}

fn kind_label(err: &RequestError) -> &'static str {
	match err {
		RequestError::Authorization { .. } => "authorization",
		RequestError::InsufficientPermissions { .. } => "insufficient_permissions",
		RequestError::InsufficientScope { .. } => "insufficient_scope",
		RequestError::NotFound { .. } => "not_found",
		RequestError::Validation { .. } => "validation",
		RequestError::RateLimitExceeded { .. } => "rate_limit_exceeded",
		RequestError::System { .. } => "system",
		RequestError::Request { .. } => "request",
	}
}

/// Wait priority for a 429: reset-seconds header, generic Retry-After, then
/// exponential backoff `base * factor^attempt`.
fn retry_wait(
	info: &RateLimitInfo,
	retry_after: Option<Duration>,
	attempt: u32,
	policy: &RetryPolicy,
) -> Duration {
	if let Some(reset) = info.reset_seconds {
		return Duration::seconds(reset as i64);
	}
	if let Some(after) = retry_after {
		return after;
	}

	policy.backoff_delay(attempt)
}

/// Decodes a non-2xx body into the most specific [`RequestError`] kind.
///
/// Two-level lookup: a recognized `errorType` string wins, the HTTP status
/// class decides otherwise, and anything left falls back to the generic kind.
fn decode_error(status: u16, body: &[u8], info: RateLimitInfo) -> RequestError {
	let entry = serde_json::from_slice::<ErrorEnvelope>(body)
		.ok()
		.and_then(|envelope| envelope.errors.into_iter().next());
	let (error_type, message, field_name) = match entry {
		Some(entry) => {
			let message = entry
				.message
				.unwrap_or_else(|| format!("HTTP {status}"));

			(entry.error_type, message, entry.field_name)
		},
		None => {
			let text = String::from_utf8_lossy(body);
			let message =
				if text.trim().is_empty() { format!("HTTP {status}") } else { text.into_owned() };

			("system".into(), message, None)
		},
	};

	classify(status, error_type, message, field_name, info)
}

fn classify(
	status: u16,
	error_type: String,
	message: String,
	field_name: Option<String>,
	info: RateLimitInfo,
) -> RequestError {
	if status == 429 {
		return RequestError::RateLimitExceeded { status, error_type, message, info };
	}

	match error_type.as_str() {
		"authorization" | "expired_token" | "invalid_client" | "invalid_grant"
		| "invalid_token" | "oauth" =>
			RequestError::Authorization { status, error_type, message },
		"insufficient_permissions" =>
			RequestError::InsufficientPermissions { status, error_type, message },
		"insufficient_scope" => RequestError::InsufficientScope { status, error_type, message },
		"not_found" => RequestError::NotFound { status, error_type, message },
		"validation" => RequestError::Validation { status, error_type, message, field_name },
		"request" => RequestError::Request { status, error_type, message },
		_ => match status {
			401 => RequestError::Authorization { status, error_type, message },
			403 => RequestError::InsufficientPermissions { status, error_type, message },
			404 => RequestError::NotFound { status, error_type, message },
			500..=599 => RequestError::System { status, error_type, message },
			_ => RequestError::Request { status, error_type, message },
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy { max_retries: 2, retry_after_seconds: 60, backoff_factor: 1.5 }
	}

	#[test]
	fn retry_wait_prefers_reset_then_retry_after_then_backoff() {
		let with_reset = RateLimitInfo { reset_seconds: Some(5), ..Default::default() };

		assert_eq!(
			retry_wait(&with_reset, Some(Duration::seconds(30)), 0, &policy()),
			Duration::seconds(5)
		);
		assert_eq!(
			retry_wait(&RateLimitInfo::default(), Some(Duration::seconds(30)), 0, &policy()),
			Duration::seconds(30)
		);
		assert_eq!(
			retry_wait(&RateLimitInfo::default(), None, 1, &policy()),
			Duration::seconds(90)
		);
	}

	#[test]
	fn not_found_status_wins_for_unrecognized_error_types() {
		let body = br#"{"errors":[{"errorType":"mystery","message":"No such food."}]}"#;
		let err = decode_error(404, body, RateLimitInfo::default());

		assert!(matches!(err, RequestError::NotFound { .. }));
		assert_eq!(err.error_type(), "mystery");
	}

	#[test]
	fn validation_error_type_carries_the_field_name() {
		let body =
			br#"{"errors":[{"errorType":"validation","fieldName":"foodId","message":"Invalid food ID."}]}"#;
		let err = decode_error(400, body, RateLimitInfo::default());

		assert!(matches!(
			err,
			RequestError::Validation { ref field_name, .. }
				if field_name.as_deref() == Some("foodId")
		));
	}

	#[test]
	fn rate_limit_errors_carry_the_last_header_values() {
		let body = br#"{"errors":[{"errorType":"request","message":"Too many requests."}]}"#;
		let info = RateLimitInfo { limit: Some(150), remaining: Some(0), reset_seconds: Some(7) };
		let err = decode_error(429, body, info.clone());

		assert!(matches!(
			err,
			RequestError::RateLimitExceeded { info: ref carried, .. } if *carried == info
		));
	}

	#[test]
	fn unparseable_bodies_classify_by_status() {
		let err = decode_error(503, b"<html>unavailable</html>", RateLimitInfo::default());

		assert!(matches!(err, RequestError::System { .. }));
		assert_eq!(err.error_type(), "system");

		let err = decode_error(404, b"", RateLimitInfo::default());

		assert!(matches!(err, RequestError::NotFound { .. }));
	}

	#[test]
	fn token_class_error_types_map_to_authorization() {
		let body = br#"{"errors":[{"errorType":"expired_token","message":"Access token expired."}]}"#;
		let err = decode_error(401, body, RateLimitInfo::default());

		assert!(matches!(err, RequestError::Authorization { .. }));
	}

	#[test]
	fn descriptor_builders_compose() {
		let descriptor = RequestDescriptor::get("/1/user/-/sleep/list.json")
			.with_query("limit", "2")
			.with_opt_query("beforeDate", Some("2025-01-01"))
			.with_opt_query("afterDate", None::<String>)
			.with_header("Accept-Locale", "en_US");

		assert_eq!(descriptor.method, Method::GET);
		assert_eq!(descriptor.query.len(), 2);
		assert_eq!(descriptor.headers.len(), 1);
	}
}
