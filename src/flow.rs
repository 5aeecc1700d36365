//! Relay state machine: maps a navigation URL plus the durable flow context to the state the
//! front end should render.
//!
//! ```text
//! Idle ──authorize URL──▶ Authorize ──begin_sign_in──▶ (identity provider)
//!                                                            │
//!   ◀──restart── Error ◀──failure── Callback ◀──return───────┘
//!                  ▲                   │ reconcile
//!                  └─────failure────── Payment ──verify_payment──▶ client redirect_uri
//! ```

// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	identity::CallbackParams,
	payment::PaymentGate,
	request::{self, AuthorizationRequest},
};

/// Entry point a URL belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
	/// Application root.
	Root,
	/// Authorize entry point.
	Authorize,
	/// Identity provider callback.
	Callback,
	/// Payment page.
	Payment,
	/// Anything else, including other origins.
	Unknown,
}
impl Route {
	/// Classifies `url` against the configured base URL and routes.
	///
	/// Trailing slashes are ignored; paths are matched relative to the application base path.
	pub fn classify(config: &RelayConfig, url: &Url) -> Self {
		if url.origin() != config.app_base.origin() {
			return Route::Unknown;
		}

		let prefix = config.app_base.path().trim_end_matches('/');
		let Some(path) = url.path().strip_prefix(prefix) else {
			return Route::Unknown;
		};
		let path = path.trim_end_matches('/');
		let routes = &config.routes;

		[
			(Route::Authorize, &routes.authorize),
			(Route::Callback, &routes.callback),
			(Route::Payment, &routes.payment),
			(Route::Root, &routes.root),
		]
		.into_iter()
		.find(|(_, route)| route.trim_end_matches('/') == path)
		.map(|(route, _)| route)
		.unwrap_or(Route::Unknown)
	}
}

/// State of a flow as seen from one navigation.
#[derive(Debug)]
pub enum FlowState {
	/// Nothing to do: root or unrelated page.
	Idle,
	/// A valid authorize request was captured; the user may start sign-in.
	Authorize(AuthorizationRequest),
	/// The identity provider returned; the relay should reconcile.
	Callback {
		/// Parameters appended by the provider.
		params: CallbackParams,
		/// Request restored from the durable flow context, if still present.
		restored: Option<AuthorizationRequest>,
	},
	/// The payment page was reached after a successful hand-off.
	Payment(PaymentGate),
	/// The navigation itself is invalid.
	Error(Error),
}
impl FlowState {
	/// Resolves the state for `url` given the request currently stored for the flow.
	///
	/// Pure: nothing is read or written besides the arguments.
	pub fn resolve(
		config: &RelayConfig,
		url: &Url,
		stored: Option<AuthorizationRequest>,
	) -> Self {
		match Route::classify(config, url) {
			Route::Root | Route::Unknown => FlowState::Idle,
			Route::Authorize =>
				match request::capture(url.query().unwrap_or_default(), &config.redirect_policy) {
					Ok(request) => FlowState::Authorize(request),
					Err(e) => FlowState::Error(e),
				},
			Route::Callback =>
				FlowState::Callback { params: CallbackParams::from_url(url), restored: stored },
			Route::Payment => match PaymentGate::from_url(config, url) {
				Ok(gate) => FlowState::Payment(gate),
				Err(e) => FlowState::Error(e),
			},
		}
	}

	/// Returns `true` for [`FlowState::Error`].
	pub fn is_error(&self) -> bool {
		matches!(self, FlowState::Error(_))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::{CheckoutConfig, RedirectPolicy};

	fn config(app_base: &str) -> RelayConfig {
		RelayConfig::builder()
			.app_base(app_base)
			.backend_base("https://api.example.com")
			.redirect_policy(RedirectPolicy::AllowAny)
			.checkout(CheckoutConfig::new("rzp_test_key", 49_900))
			.build()
			.expect("Config fixture should build.")
	}

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse.")
	}

	#[test]
	fn routes_are_matched_relative_to_the_base_path() {
		let config = config("https://relay.example.com/connect/");

		assert_eq!(Route::classify(&config, &url("https://relay.example.com/connect")), Route::Root);
		assert_eq!(
			Route::classify(&config, &url("https://relay.example.com/connect/authorize/?a=1")),
			Route::Authorize
		);
		assert_eq!(
			Route::classify(&config, &url("https://relay.example.com/connect/auth/callback")),
			Route::Callback
		);
		assert_eq!(
			Route::classify(&config, &url("https://relay.example.com/authorize")),
			Route::Unknown
		);
		assert_eq!(
			Route::classify(&config, &url("https://evil.example.com/connect/authorize")),
			Route::Unknown
		);
	}

	#[test]
	fn authorize_resolution_validates_the_request() {
		let config = config("https://relay.example.com");
		let valid = FlowState::resolve(
			&config,
			&url("https://relay.example.com/authorize?client_id=abc&redirect_uri=https://x.test/cb&response_type=code"),
			None,
		);

		assert!(matches!(valid, FlowState::Authorize(ref r) if r.client_id == "abc"));

		let invalid = FlowState::resolve(
			&config,
			&url("https://relay.example.com/authorize?client_id=abc&response_type=code"),
			None,
		);

		assert!(matches!(invalid, FlowState::Error(Error::MalformedRequest)));
	}

	#[test]
	fn callback_and_payment_resolution() {
		let config = config("https://relay.example.com");
		let stored = AuthorizationRequest::from_query(
			"client_id=abc&redirect_uri=https://x.test/cb&response_type=code",
		);
		let callback = FlowState::resolve(
			&config,
			&url("https://relay.example.com/auth/callback?code=c1&state=s1"),
			Some(stored.clone()),
		);

		match callback {
			FlowState::Callback { params, restored } => {
				assert_eq!(params.code.as_deref(), Some("c1"));
				assert_eq!(restored, Some(stored));
			},
			other => panic!("Expected callback state, got {other:?}."),
		}

		let payment = FlowState::resolve(
			&config,
			&config.payment_url("https://x.test/cb?done=1"),
			None,
		);

		assert!(
			matches!(payment, FlowState::Payment(ref gate) if gate.redirect_uri() == "https://x.test/cb?done=1")
		);
		assert!(
			FlowState::resolve(&config, &url("https://relay.example.com/payment"), None).is_error()
		);
		assert!(matches!(
			FlowState::resolve(&config, &url("https://relay.example.com/"), None),
			FlowState::Idle
		));
	}
}
