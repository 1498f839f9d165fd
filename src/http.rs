//! Transport primitives shared by the token-exchange facade and the executor.
//!
//! Token exchanges run through an instrumented [`oauth2::AsyncHttpClient`] handle
//! that records [`ResponseMetadata`] (HTTP status, Retry-After hint) into a
//! [`ResponseMetadataSlot`] so failures can be classified with consistent
//! metadata after the `oauth2` crate resolves. Resource calls use the same
//! underlying reqwest client directly and parse [`RateLimitInfo`] from the
//! provider's throttling headers.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Response header carrying the hourly request quota.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "Fitbit-Rate-Limit-Limit";
/// Response header carrying the remaining request count.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "Fitbit-Rate-Limit-Remaining";
/// Response header carrying the seconds until the quota resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "Fitbit-Rate-Limit-Reset";

/// Remote throttling state parsed from response headers on each call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
	/// Request quota for the current window, when advertised.
	pub limit: Option<u32>,
	/// Remaining requests in the current window, when advertised.
	pub remaining: Option<u32>,
	/// Seconds until the quota resets, when advertised.
	pub reset_seconds: Option<u64>,
}
impl RateLimitInfo {
	/// Parses the provider's throttling headers; absent headers yield `None` fields.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			limit: parse_numeric_header(headers, RATE_LIMIT_LIMIT_HEADER),
			remaining: parse_numeric_header(headers, RATE_LIMIT_REMAINING_HEADER),
			reset_seconds: parse_numeric_header(headers, RATE_LIMIT_RESET_HEADER),
		}
	}

	/// Returns `true` when none of the throttling headers were present.
	pub fn is_empty(&self) -> bool {
		self.limit.is_none() && self.remaining.is_none() && self.reset_seconds.is_none()
	}
}

fn parse_numeric_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// A fresh slot is created for each token request and read immediately after
/// `oauth2` resolves. The instrumented handle clears the slot before dispatching
/// so traces from prior attempts never leak into a new invocation.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Token requests must not follow redirects, matching OAuth 2.0 guidance that token
/// endpoints return results directly instead of delegating to another URI.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented HTTP client handle that captures response metadata.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl InstrumentedHttpClient {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self { client, slot }
	}
}

/// Public handle wired into the `oauth2` facade for token exchanges.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient::new(client, slot)))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Parses a `Retry-After` header as either delta-seconds or an RFC 2822 date.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	fn headers(entries: &[(&'static str, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();

		for (name, value) in entries {
			map.insert(*name, HeaderValue::from_str(value).expect("Header fixture should parse."));
		}

		map
	}

	#[test]
	fn rate_limit_info_parses_all_three_headers() {
		let map = headers(&[
			(RATE_LIMIT_LIMIT_HEADER, "150"),
			(RATE_LIMIT_REMAINING_HEADER, "3"),
			(RATE_LIMIT_RESET_HEADER, "1200"),
		]);
		let info = RateLimitInfo::from_headers(&map);

		assert_eq!(info.limit, Some(150));
		assert_eq!(info.remaining, Some(3));
		assert_eq!(info.reset_seconds, Some(1200));
		assert!(!info.is_empty());
	}

	#[test]
	fn rate_limit_info_tolerates_missing_or_garbled_headers() {
		let map = headers(&[(RATE_LIMIT_RESET_HEADER, "soon")]);
		let info = RateLimitInfo::from_headers(&map);

		assert!(info.is_empty());
	}

	#[test]
	fn retry_after_parses_delta_seconds() {
		let map = headers(&[("retry-after", "42")]);

		assert_eq!(parse_retry_after(&map), Some(Duration::seconds(42)));
	}

	#[test]
	fn retry_after_ignores_dates_in_the_past() {
		let map = headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")]);

		assert_eq!(parse_retry_after(&map), None);
	}
}
