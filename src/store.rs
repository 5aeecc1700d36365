//! Durable flow context: holds the captured authorize request across the identity-provider
//! redirect.
//!
//! Each [`FlowKey`] owns a single slot. Writes overwrite, reads do not consume, and the relay
//! clears the slot once the callback has been reconciled (or on restart).

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::FlowKey, request::AuthorizationRequest};

/// Boxed future returned by [`FlowContextStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the durable flow context.
pub trait FlowContextStore
where
	Self: Send + Sync,
{
	/// Stores `request` under `key`, replacing any previous value.
	fn write<'a>(&'a self, key: &'a FlowKey, request: AuthorizationRequest)
	-> StoreFuture<'a, ()>;

	/// Returns the request stored under `key`, if any.
	fn read<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, Option<AuthorizationRequest>>;

	/// Removes the slot for `key`. Clearing an empty slot is not an error.
	fn clear<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`FlowContextStore`] implementations.
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
