//! Observability ports for flows and the request executor.
//!
//! Components receive an [`RequestObserver`] at construction and publish
//! structured events through it; nothing in this crate writes to an ambient
//! global logger.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `fitbit_client.flow` with the `flow` (grant)
//!   and `stage` (call site) fields, and to get the [`TracingObserver`] implementation.
//! - Enable `metrics` to increment the `fitbit_client_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, http::RateLimitInfo};

/// OAuth flow kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization Code + PKCE grant helpers.
	AuthorizationCode,
	/// Refresh token flow.
	Refresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Structured event emitted by the executor for each request outcome.
#[derive(Clone, Debug)]
pub enum RequestEvent {
	/// A request completed with a 2xx status.
	Succeeded {
		/// HTTP method of the call.
		method: String,
		/// API path of the call.
		path: String,
		/// Final HTTP status.
		status: u16,
	},
	/// A rate-limited or unauthorized attempt is being retried.
	Retrying {
		/// HTTP method of the call.
		method: String,
		/// API path of the call.
		path: String,
		/// 1-based retry attempt about to run.
		attempt: u32,
		/// Wait applied before the retry.
		wait: Duration,
		/// Last observed throttling headers, when present.
		rate_limit: Option<RateLimitInfo>,
	},
	/// A request failed terminally.
	Failed {
		/// HTTP method of the call.
		method: String,
		/// API path of the call.
		path: String,
		/// HTTP status, when a response was received.
		status: Option<u16>,
		/// Stable label of the error kind surfaced to the caller.
		kind: &'static str,
	},
}

/// Port through which executor events reach the host application.
pub trait RequestObserver
where
	Self: Send + Sync,
{
	/// Receives one structured event per request outcome.
	fn on_request_event(&self, event: &RequestEvent);
}

/// Observer that discards every event; the default when none is injected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl RequestObserver for NoopObserver {
	fn on_request_event(&self, _: &RequestEvent) {}
}

#[cfg(feature = "tracing")]
/// Observer that forwards events to `tracing` at info/warn/error levels.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;
#[cfg(feature = "tracing")]
impl RequestObserver for TracingObserver {
	fn on_request_event(&self, event: &RequestEvent) {
		match event {
			RequestEvent::Succeeded { method, path, status } => {
				::tracing::info!(target: "fitbit_client.request", %method, %path, status, "request succeeded");
			},
			RequestEvent::Retrying { method, path, attempt, wait, rate_limit } => {
				::tracing::warn!(
					target: "fitbit_client.request",
					%method,
					%path,
					attempt,
					wait_seconds = wait.whole_seconds(),
					?rate_limit,
					"request retrying"
				);
			},
			RequestEvent::Failed { method, path, status, kind } => {
				::tracing::error!(target: "fitbit_client.request", %method, %path, ?status, %kind, "request failed");
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn flow_labels_are_stable() {
		assert_eq!(FlowKind::AuthorizationCode.as_str(), "authorization_code");
		assert_eq!(FlowKind::Refresh.to_string(), "refresh");
		assert_eq!(FlowOutcome::Failure.as_str(), "failure");
	}

	#[test]
	fn noop_observer_accepts_every_event() {
		let observer = NoopObserver;

		observer.on_request_event(&RequestEvent::Succeeded {
			method: "GET".into(),
			path: "/1/user/-/profile.json".into(),
			status: 200,
		});
	}
}
