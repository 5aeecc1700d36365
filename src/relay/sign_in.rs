//! Identity sign-in launch with a per-flow single-flight guard.

// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	identity::SignInOptions,
	obs::{self, FlowOutcome, FlowSpan, RelayStage},
	relay::Relay,
	request::AuthorizationRequest,
};

impl Relay {
	/// Persists `request` for `key` and starts the identity sign-in.
	///
	/// Returns the identity provider URL to navigate to. A second call for the same key while
	/// the first is still running fails with [`Error::SignInPending`] instead of queueing.
	pub async fn begin_sign_in(
		&self,
		key: &FlowKey,
		request: &AuthorizationRequest,
	) -> Result<Url> {
		const STAGE: RelayStage = RelayStage::SignIn;

		let span = FlowSpan::new(STAGE, "begin_sign_in");

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let lease = self.sign_in_lease(key);
		let result = span
			.instrument(async {
				if !request.is_valid() {
					return Err(Error::MalformedRequest);
				}
				if !self.config.redirect_policy.permits(&request.redirect_uri) {
					return Err(Error::RedirectNotAllowed {
						redirect_uri: request.redirect_uri.clone(),
					});
				}

				let Some(_pending) = lease.guard().try_lock() else {
					return Err(Error::SignInPending);
				};

				self.store.write(key, request.clone()).await?;

				let options = SignInOptions::new(
					self.config.callback_url(),
					self.config.identity_scopes.clone(),
				);

				self.identity.sign_in(&options).await.map_err(|e| {
					obs::log_identity_error(STAGE, &e);

					Error::Provider { reason: e.reason() }
				})
			})
			.await;

		drop(lease);
		obs::observe(STAGE, &result);

		result
	}

	fn sign_in_lease<'a>(&'a self, key: &'a FlowKey) -> GuardLease<'a> {
		let guard = self
			.sign_in_guards
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		GuardLease { guards: &self.sign_in_guards, key, guard }
	}
}

/// Holds a per-flow sign-in guard and prunes the map entry once nobody else holds it.
///
/// Released on drop, so a cancelled launch does not leave its entry behind.
struct GuardLease<'a> {
	guards: &'a Mutex<HashMap<FlowKey, Arc<AsyncMutex<()>>>>,
	key: &'a FlowKey,
	guard: Arc<AsyncMutex<()>>,
}
impl GuardLease<'_> {
	fn guard(&self) -> &AsyncMutex<()> {
		&self.guard
	}
}
impl Drop for GuardLease<'_> {
	fn drop(&mut self) {
		// Clones are only handed out under the map lock; the map and this lease account for two.
		let mut guards = self.guards.lock();

		if Arc::strong_count(&self.guard) == 2 && guards.contains_key(self.key) {
			guards.remove(self.key);
		}
	}
}
