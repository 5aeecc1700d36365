#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::MockServer;
use time::macros::datetime;
// self
use oauth2_relay::{
	auth::{FlowKey, ScopeSet, TokenSecret},
	config::{CheckoutConfig, RedirectPolicy, RelayConfig},
	identity::{
		CallbackParams, IdentityError, IdentityFuture, IdentityLayer, IdentityProfile,
		IdentitySession, SignInOptions,
	},
	relay::Relay,
	store::MemoryStore,
	url::Url,
};

pub const GOOD_CODE: &str = "4/0good";
pub const CLIENT_REDIRECT: &str = "https://client.example.com/oauth/done";

/// Scripted identity layer: hands out a fixed provider URL and returns a session only for
/// [`GOOD_CODE`].
pub struct FakeIdentity {
	pub sign_in_delay: Option<StdDuration>,
	pub sign_in_failure: Option<String>,
	pub seen_options: std::sync::Mutex<Vec<SignInOptions>>,
}
impl FakeIdentity {
	pub fn new() -> Self {
		Self { sign_in_delay: None, sign_in_failure: None, seen_options: Default::default() }
	}

	pub fn slow(delay: StdDuration) -> Self {
		Self { sign_in_delay: Some(delay), ..Self::new() }
	}

	pub fn rejecting(reason: &str) -> Self {
		Self { sign_in_failure: Some(reason.into()), ..Self::new() }
	}
}
impl IdentityLayer for FakeIdentity {
	fn sign_in<'a>(&'a self, options: &'a SignInOptions) -> IdentityFuture<'a, Url> {
		Box::pin(async move {
			self.seen_options
				.lock()
				.expect("Options lock should not be poisoned.")
				.push(options.clone());

			if let Some(delay) = self.sign_in_delay {
				tokio::time::sleep(delay).await;
			}
			if let Some(reason) = &self.sign_in_failure {
				return Err(IdentityError::Rejected { message: reason.clone(), status: None });
			}

			Ok(Url::parse("https://idp.test/auth?state=fake").expect("Provider URL should parse."))
		})
	}

	fn session<'a>(
		&'a self,
		callback: &'a CallbackParams,
	) -> IdentityFuture<'a, Option<IdentitySession>> {
		Box::pin(async move {
			Ok((callback.code.as_deref() == Some(GOOD_CODE)).then(identity_session))
		})
	}
}

pub fn identity_session() -> IdentitySession {
	IdentitySession {
		provider: "google".into(),
		access_token: TokenSecret::new("ya29.access"),
		refresh_token: Some(TokenSecret::new("1//refresh")),
		expires_in: 3_599,
		token_type: "Bearer".into(),
		scope: ScopeSet::new(["openid", "email"]).expect("Scope fixture should be valid."),
		profile: IdentityProfile {
			id: "1089".into(),
			email: Some("ada@example.com".into()),
			name: Some("Ada Lovelace".into()),
			picture: None,
			verified_email: true,
			locale: Some("en".into()),
			hd: None,
		},
		established_at: datetime!(2024-05-01 12:00 UTC),
	}
}

pub fn key(raw: &str) -> FlowKey {
	FlowKey::new(raw).expect("Flow key fixture should be valid.")
}

/// Relay config whose app and backend both live on the mock server.
pub fn config(server: &MockServer) -> RelayConfig {
	RelayConfig::builder()
		.app_base(server.base_url())
		.backend_base(server.base_url())
		.callback_timeout(time::Duration::seconds(1))
		.verify_timeout(time::Duration::seconds(1))
		.redirect_policy(
			RedirectPolicy::allow_origins(["https://client.example.com"])
				.expect("Allow-list fixture should be valid."),
		)
		.checkout(CheckoutConfig::new("rzp_test_key", 49_900))
		.build()
		.expect("Relay config fixture should build.")
}

pub fn relay(server: &MockServer, identity: FakeIdentity) -> (Relay, MemoryStore) {
	let store = MemoryStore::default();
	let relay = Relay::new(config(server), Arc::new(store.clone()), Arc::new(identity));

	(relay, store)
}

/// Authorize URL on the relay for the given extra query.
pub fn authorize_url(relay: &Relay, query: &str) -> Url {
	let mut url = relay.config().root_url();

	url.set_path("/authorize");
	url.set_query(Some(query));

	url
}

pub fn callback_url(relay: &Relay, code: &str) -> Url {
	let mut url = relay.config().callback_url();

	url.query_pairs_mut().append_pair("code", code).append_pair("state", "fake");

	url
}
