//! Relay orchestrator: one call per navigation, each returning the next URL to visit.

pub mod callback;

mod payment;
mod restart;
mod sign_in;

pub use callback::{BackendReply, Handoff};

// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	config::RelayConfig,
	flow::{FlowState, Route},
	http::ReqwestHttpClient,
	identity::IdentityLayer,
	obs::{self, FlowOutcome, FlowSpan, RelayStage},
	request::{self, AuthorizationRequest},
	store::FlowContextStore,
};

/// Coordinates the authorization relay for every flow of one application.
///
/// The relay owns the configuration, the durable flow context store, the identity layer, and
/// the HTTP client used for backend and payment calls. Flows are independent and keyed by
/// [`FlowKey`]; a single relay can be shared across tasks.
#[derive(Clone)]
pub struct Relay {
	config: Arc<RelayConfig>,
	store: Arc<dyn FlowContextStore>,
	identity: Arc<dyn IdentityLayer>,
	http_client: ReqwestHttpClient,
	sign_in_guards: Arc<Mutex<HashMap<FlowKey, Arc<AsyncMutex<()>>>>>,
}
impl Relay {
	/// Creates a relay with its own reqwest client.
	pub fn new(
		config: RelayConfig,
		store: Arc<dyn FlowContextStore>,
		identity: Arc<dyn IdentityLayer>,
	) -> Self {
		Self {
			config: Arc::new(config),
			store,
			identity,
			http_client: ReqwestHttpClient::default(),
			sign_in_guards: Default::default(),
		}
	}

	/// Reuses an existing HTTP client for backend and payment calls.
	pub fn with_http_client(mut self, client: ReqwestHttpClient) -> Self {
		self.http_client = client;

		self
	}

	/// Relay configuration.
	pub fn config(&self) -> &RelayConfig {
		&self.config
	}

	/// Number of flows with a sign-in launch in progress.
	pub fn pending_sign_ins(&self) -> usize {
		self.sign_in_guards.lock().len()
	}

	/// Captures the authorize request carried by `url`.
	///
	/// Nothing is stored; the request is only persisted once the user starts sign-in.
	pub fn capture(&self, url: &Url) -> Result<AuthorizationRequest> {
		const STAGE: RelayStage = RelayStage::Capture;

		let _span = FlowSpan::new(STAGE, "capture").entered();

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let result = if Route::classify(&self.config, url) == Route::Authorize {
			request::capture(url.query().unwrap_or_default(), &self.config.redirect_policy)
		} else {
			Err(Error::MalformedRequest)
		};

		obs::observe(STAGE, &result);

		result
	}

	/// Resolves the state of the flow for the current navigation.
	///
	/// The durable flow context is only read for the callback route.
	pub async fn enter(&self, key: &FlowKey, url: &Url) -> Result<FlowState> {
		let stored = if Route::classify(&self.config, url) == Route::Callback {
			self.store.read(key).await?
		} else {
			None
		};

		Ok(FlowState::resolve(&self.config, url, stored))
	}
}
impl Debug for Relay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("config", &self.config)
			.field("http_client", &self.http_client)
			.field("pending_sign_ins", &self.pending_sign_ins())
			.finish()
	}
}
