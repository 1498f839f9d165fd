//! Typed async Fitbit Web API client—OAuth 2.0 PKCE flows, token persistence,
//! rate-limit-aware request execution, and lazy pagination in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod callback;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod flows;
pub mod http;
pub mod obs;
pub mod pagination;
pub mod resources;
pub mod store;

mod oauth;

pub use client::{AuthenticateOutcome, FitbitClient};

#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience fixtures for unit and integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{RefreshFuture, ScopeSet, TokenManager, TokenRefresher, TokenSet},
		client::FitbitClient,
		config::{ClientConfig, Endpoints, FlowMode},
		executor::RequestExecutor,
		obs::NoopObserver,
		store::MemoryStore,
	};

	/// Refresher for tests whose pipeline must never reach the token endpoint.
	#[derive(Debug, Default)]
	pub struct DenyingRefresher;
	impl TokenRefresher for DenyingRefresher {
		fn refresh<'a>(&'a self, _: &'a TokenSet) -> RefreshFuture<'a> {
			Box::pin(async {
				Err(crate::error::OAuthError::NotAuthenticated.into())
			})
		}
	}

	/// Builds a token set that stays live for the given duration.
	pub fn test_token(access: &str, expires_in: Duration) -> TokenSet {
		let scope = ScopeSet::new(["activity", "sleep"])
			.expect("Test scope fixture should be valid.");

		TokenSet::builder(scope)
			.access_token(access)
			.refresh_token(format!("{access}-refresh"))
			.expires_in(expires_in)
			.build()
			.expect("Test token fixture should build.")
	}

	/// Executor wired to in-memory collaborators; for tests that only build
	/// descriptors and never dispatch them.
	pub fn offline_executor() -> Arc<RequestExecutor> {
		let manager = Arc::new(TokenManager::new(Arc::new(MemoryStore::default())));
		let config = ClientConfig::new("client-test", "secret-test", "https://localhost:8080");

		Arc::new(RequestExecutor::new(
			ReqwestClient::new(),
			&config,
			manager,
			Arc::new(DenyingRefresher),
			Arc::new(NoopObserver),
		))
	}

	/// Client configuration pointed at a mock server base URL.
	pub fn test_config(base: &Url) -> ClientConfig {
		let endpoints =
			Endpoints::rooted_at(base).expect("Mock endpoints fixture should build.");

		ClientConfig::new("client-it", "secret-it", "https://localhost:8080/callback")
			.with_scope(ScopeSet::new(["activity", "sleep"]).expect("Test scope should be valid."))
			.with_flow_mode(FlowMode::Manual)
			.with_endpoints(endpoints)
	}

	/// Client wired to a mock server with the manual flow mode.
	pub fn build_test_client(base: &Url) -> FitbitClient {
		FitbitClient::new(test_config(base)).expect("Test client fixture should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
