//! Process-local [`FlowContextStore`] for single-instance deployments and tests.

// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	request::AuthorizationRequest,
	store::{FlowContextStore, StoreError, StoreFuture},
};

type SlotMap = Arc<RwLock<HashMap<FlowKey, AuthorizationRequest>>>;

/// Thread-safe in-memory flow context keyed by [`FlowKey`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SlotMap);
impl MemoryStore {
	/// Number of occupied slots.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no flow is parked in the store.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl FlowContextStore for MemoryStore {
	fn write<'a>(
		&'a self,
		key: &'a FlowKey,
		request: AuthorizationRequest,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().insert(key.clone(), request);

			Ok::<_, StoreError>(())
		})
	}

	fn read<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, Option<AuthorizationRequest>> {
		Box::pin(async move { Ok(self.0.read().get(key).cloned()) })
	}

	fn clear<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(key);

			Ok(())
		})
	}
}
