//! File-backed [`FlowContextStore`] that survives relay restarts between the identity redirect
//! and the callback.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	request::AuthorizationRequest,
	store::{FlowContextStore, StoreError, StoreFuture},
};

type Slots = HashMap<FlowKey, AuthorizationRequest>;

/// Persists flow contexts to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Slots>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing slots.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let slots = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(slots)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist(&self, slots: &Slots) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = slots.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize flow contexts: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl FlowContextStore for FileStore {
	fn write<'a>(
		&'a self,
		key: &'a FlowKey,
		request: AuthorizationRequest,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(key.clone(), request);

			self.persist(&guard)
		})
	}

	fn read<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, Option<AuthorizationRequest>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn clear<'a>(&'a self, key: &'a FlowKey) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(key).is_some() {
				self.persist(&guard)?;
			}

			Ok(())
		})
	}
}

fn load_snapshot(path: &Path) -> Result<Slots, StoreError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.is_empty() {
		return Ok(HashMap::new());
	}

	let entries: Vec<(FlowKey, AuthorizationRequest)> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, err: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {err}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(tag: &str) -> PathBuf {
		let unique = format!(
			"oauth2_relay_file_store_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn fixture() -> (FlowKey, AuthorizationRequest) {
		let key = FlowKey::new("tab-file").expect("Flow key fixture should be valid.");
		let request = AuthorizationRequest::from_query(
			"client_id=abc&redirect_uri=https://x.test/done&response_type=code\
			 &code_challenge=E9Mel&code_challenge_method=S256",
		);

		(key, request)
	}

	#[tokio::test]
	async fn slots_survive_reopen_and_clear_persists() {
		let path = temp_path("reopen");
		let (key, request) = fixture();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.write(&key, request.clone()).await.expect("Write should persist.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.read(&key)
			.await
			.expect("Read should succeed.")
			.expect("File store lost the slot after reopen.");

		assert_eq!(fetched, request);

		reopened.clear(&key).await.expect("Clear should persist.");

		let emptied = FileStore::open(&path).expect("Failed to reopen cleared snapshot.");

		assert_eq!(emptied.read(&key).await.expect("Read should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{ not json").expect("Failed to seed corrupt snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshots must be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
