//! Thread-safe in-memory [`TokenStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenSet,
	store::{StoreFuture, TokenStore},
};

/// Keeps the token set in-process; used when no cache path is configured.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<TokenSet>>>);
impl MemoryStore {
	/// Returns a snapshot of the stored token, if any.
	pub fn snapshot(&self) -> Option<TokenSet> {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<TokenSet>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save<'a>(&'a self, token: &'a TokenSet) -> StoreFuture<'a, ()> {
		let slot = self.0.clone();
		let token = token.clone();

		Box::pin(async move {
			*slot.write() = Some(token);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = None;

			Ok(())
		})
	}
}
