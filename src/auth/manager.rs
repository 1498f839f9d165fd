//! Runtime credential management: staleness checks and single-flight refresh.

// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_SKEW_BUFFER, TokenSet},
	error::OAuthError,
	store::TokenStore,
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSet>> + 'a + Send>>;

/// Port through which the manager requests a refresh-token exchange.
///
/// Implemented by the flow coordinator; injected so the manager stays free of
/// transport concerns and tests can count refresh invocations.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Exchanges the current refresh token for a new token set.
	fn refresh<'a>(&'a self, current: &'a TokenSet) -> RefreshFuture<'a>;
}

/// Single source of truth for the current credential.
///
/// The active token set is shared across all concurrent executor invocations.
/// Refresh is serialized through an async mutex: the first caller to observe
/// staleness performs the exchange while the rest await the guard and converge
/// on its result. Every replacement token is persisted through the store
/// before being published.
pub struct TokenManager {
	store: Arc<dyn TokenStore>,
	current: RwLock<Option<TokenSet>>,
	refresh_guard: AsyncMutex<()>,
	skew: Duration,
}
impl TokenManager {
	/// Creates a manager backed by the provided store.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self {
			store,
			current: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			skew: DEFAULT_SKEW_BUFFER,
		}
	}

	/// Overrides the clock-skew buffer used for staleness decisions.
	pub fn with_skew(mut self, skew: Duration) -> Self {
		self.skew = skew;

		self
	}

	/// Loads the persisted token set into memory at startup.
	///
	/// An absent or corrupt cache is not fatal; the first authentication then
	/// runs the full interactive flow.
	pub async fn load(&self) -> Result<Option<TokenSet>> {
		let loaded = self.store.load().await?;

		*self.current.write() = loaded.clone();

		Ok(loaded)
	}

	/// Returns the in-memory token set without refreshing.
	pub fn peek(&self) -> Option<TokenSet> {
		self.current.read().clone()
	}

	/// Returns `true` when a non-stale credential is available right now.
	pub fn is_authenticated(&self) -> bool {
		self.current
			.read()
			.as_ref()
			.is_some_and(|token| !token.is_stale_at(OffsetDateTime::now_utc(), self.skew))
	}

	/// Publishes a new token set and persists it.
	pub async fn install(&self, token: TokenSet) -> Result<()> {
		self.store.save(&token).await?;
		*self.current.write() = Some(token);

		Ok(())
	}

	/// Drops the credential from memory and the store.
	pub async fn clear(&self) -> Result<()> {
		self.store.clear().await?;
		*self.current.write() = None;

		Ok(())
	}

	/// Returns the active token set, transparently refreshing first if it is stale.
	pub async fn current(&self, refresher: &dyn TokenRefresher) -> Result<TokenSet> {
		if let Some(token) = self.fresh_snapshot() {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Re-check under the guard: a concurrent caller may have refreshed already.
		if let Some(token) = self.fresh_snapshot() {
			return Ok(token);
		}

		let stale = self.peek().ok_or(OAuthError::NotAuthenticated)?;
		let renewed = refresher.refresh(&stale).await?;

		self.install(renewed.clone()).await?;

		Ok(renewed)
	}

	/// Forces a refresh for the 401 retry path, still single-flight.
	///
	/// `used_access_token` is the bearer value the rejected call carried. When a
	/// concurrent caller already rotated the credential, the rotated token is
	/// returned without issuing another exchange.
	pub async fn force_refresh(
		&self,
		used_access_token: &str,
		refresher: &dyn TokenRefresher,
	) -> Result<TokenSet> {
		let _singleflight = self.refresh_guard.lock().await;
		let current = self.peek().ok_or(OAuthError::NotAuthenticated)?;

		if current.access_token.expose() != used_access_token {
			return Ok(current);
		}

		let renewed = refresher.refresh(&current).await?;

		self.install(renewed.clone()).await?;

		Ok(renewed)
	}

	fn fresh_snapshot(&self) -> Option<TokenSet> {
		self.current
			.read()
			.as_ref()
			.filter(|token| !token.is_stale_at(OffsetDateTime::now_utc(), self.skew))
			.cloned()
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("authenticated", &self.current.read().is_some())
			.field("skew", &self.skew)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;
	use crate::{auth::ScopeSet, store::MemoryStore};

	struct CountingRefresher {
		calls: AtomicU32,
	}
	impl CountingRefresher {
		fn new() -> Self {
			Self { calls: AtomicU32::new(0) }
		}

		fn calls(&self) -> u32 {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenRefresher for CountingRefresher {
		fn refresh<'a>(&'a self, current: &'a TokenSet) -> RefreshFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				// Yield once so concurrent callers pile up on the guard.
				tokio::task::yield_now().await;

				Ok(TokenSet::builder(current.scope.clone())
					.access_token(format!("rotated-{}", self.calls.load(Ordering::SeqCst)))
					.refresh_token("rotated-refresh")
					.expires_in(Duration::hours(8))
					.build()
					.expect("Rotated token fixture should build."))
			})
		}
	}

	fn scope() -> ScopeSet {
		ScopeSet::new(["activity"]).expect("Scope fixture should be valid.")
	}

	fn expired_token() -> TokenSet {
		TokenSet::builder(scope())
			.access_token("expired-access")
			.refresh_token("expired-refresh")
			.expires_at(OffsetDateTime::now_utc() - Duration::hours(1))
			.build()
			.expect("Expired token fixture should build.")
	}

	fn live_token() -> TokenSet {
		TokenSet::builder(scope())
			.access_token("live-access")
			.refresh_token("live-refresh")
			.expires_in(Duration::hours(8))
			.build()
			.expect("Live token fixture should build.")
	}

	#[tokio::test]
	async fn fresh_tokens_are_returned_without_refreshing() {
		let manager = TokenManager::new(Arc::new(MemoryStore::default()));
		let refresher = CountingRefresher::new();

		manager.install(live_token()).await.expect("Install should succeed.");

		let token = manager.current(&refresher).await.expect("Current should succeed.");

		assert_eq!(token.access_token.expose(), "live-access");
		assert_eq!(refresher.calls(), 0);
	}

	#[tokio::test]
	async fn concurrent_callers_share_a_single_refresh() {
		let store = Arc::new(MemoryStore::default());
		let manager = Arc::new(TokenManager::new(store.clone()));
		let refresher = Arc::new(CountingRefresher::new());

		manager.install(expired_token()).await.expect("Install should succeed.");

		let mut handles = Vec::new();

		for _ in 0..8 {
			let manager = manager.clone();
			let refresher = refresher.clone();

			handles.push(tokio::spawn(async move {
				manager.current(refresher.as_ref()).await
			}));
		}

		for handle in handles {
			let token = handle
				.await
				.expect("Refresh task should not panic.")
				.expect("Refresh should succeed.");

			assert_eq!(token.access_token.expose(), "rotated-1");
		}

		assert_eq!(refresher.calls(), 1);
		assert_eq!(
			store.snapshot().expect("Rotated token should persist.").access_token.expose(),
			"rotated-1"
		);
	}

	#[tokio::test]
	async fn force_refresh_skips_the_exchange_after_a_concurrent_rotation() {
		let manager = TokenManager::new(Arc::new(MemoryStore::default()));
		let refresher = CountingRefresher::new();

		manager.install(live_token()).await.expect("Install should succeed.");

		// The rejected call carried a bearer that is no longer current.
		let token = manager
			.force_refresh("some-older-access", &refresher)
			.await
			.expect("Force refresh should succeed.");

		assert_eq!(token.access_token.expose(), "live-access");
		assert_eq!(refresher.calls(), 0);

		let token = manager
			.force_refresh("live-access", &refresher)
			.await
			.expect("Force refresh should succeed.");

		assert_eq!(token.access_token.expose(), "rotated-1");
		assert_eq!(refresher.calls(), 1);
	}

	#[tokio::test]
	async fn current_without_any_credential_is_an_error() {
		let manager = TokenManager::new(Arc::new(MemoryStore::default()));
		let refresher = CountingRefresher::new();
		let err = manager.current(&refresher).await.expect_err("Missing credential should fail.");

		assert!(matches!(err, Error::OAuth(OAuthError::NotAuthenticated)));
	}
}
