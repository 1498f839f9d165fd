//! Storage contracts and built-in persistence backends for the token cache.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenSet};

/// Boxed future returned by [`TokenStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the cached token set.
///
/// A store holds at most one credential. Absence is an expected state (first
/// run, cleared cache) and is never an error; corruption of a persisted cache
/// degrades to absence so the caller can re-run the interactive flow.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Reads the persisted token set, if one exists and is decodable.
	fn load(&self) -> StoreFuture<'_, Option<TokenSet>>;

	/// Persists or replaces the token set.
	fn save<'a>(&'a self, token: &'a TokenSet) -> StoreFuture<'a, ()>;

	/// Removes any persisted token set.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
