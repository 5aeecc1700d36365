//! Walks one flow through the relay end to end, with the identity provider, the backend
//! authorization service, and the payment verification endpoint all served by a local mock.
//!
//! 1. The downstream client sends the user to `/authorize`; the relay captures the request.
//! 2. The user starts sign-in; the relay parks the request and returns Google's authorize URL.
//! 3. The provider redirects back to `/auth/callback`; the relay reconciles with the backend.
//! 4. The payment page verifies the checkout and releases the client's `redirect_uri`.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
// self
use oauth2_relay::{
	auth::FlowKey,
	config::{CheckoutConfig, RedirectPolicy, RelayConfig},
	flow::FlowState,
	identity::{GoogleIdentity, IdentityEndpoints},
	payload::ClientMetadata,
	payment::PaymentResult,
	relay::Relay,
	store::MemoryStore,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"ya29.demo\",\"refresh_token\":\"1//demo\",\"expires_in\":3599,\
				 \"token_type\":\"Bearer\",\"scope\":\"openid email profile\"}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200).header("content-type", "application/json").body(
				"{\"id\":\"1089\",\"email\":\"ada@example.com\",\"verified_email\":true}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/callback").query_param("client_id", "demo-client");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"success\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/payment/verify");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"success\"}");
		})
		.await;

	let config = RelayConfig::builder()
		.app_base(server.base_url())
		.backend_base(server.base_url())
		.redirect_policy(RedirectPolicy::allow_origins(["https://client.example.com"])?)
		.checkout(CheckoutConfig::new("rzp_test_demo", 49_900))
		.build()?;
	let endpoints = IdentityEndpoints::new(
		&server.url("/authorize/google"),
		&server.url("/token"),
		&server.url("/userinfo"),
	)?;
	let identity = GoogleIdentity::new(endpoints, "demo.apps.googleusercontent.com")
		.with_client_secret("GOCSPX-demo");
	let relay = Relay::new(config, Arc::new(MemoryStore::default()), Arc::new(identity));
	let tab = FlowKey::new("demo-tab")?;
	let mut authorize = relay.config().root_url();

	authorize.set_path("/authorize");
	authorize
		.query_pairs_mut()
		.append_pair("client_id", "demo-client")
		.append_pair("redirect_uri", "https://client.example.com/oauth/done")
		.append_pair("response_type", "code")
		.append_pair("state", "client-state");

	let FlowState::Authorize(request) = relay.enter(&tab, &authorize).await? else {
		return Err(eyre!("The authorize URL did not resolve to a capture."));
	};

	println!("captured request from `{}` (scope: {})", request.client_id, request.effective_scope());

	let provider = relay.begin_sign_in(&tab, &request).await?;

	println!("sign in at {provider}");

	let state = provider
		.query_pairs()
		.find(|(name, _)| name == "state")
		.map(|(_, value)| value.into_owned())
		.ok_or_else(|| eyre!("The provider URL carries no state."))?;
	let mut callback = relay.config().callback_url();

	callback.query_pairs_mut().append_pair("code", "demo-code").append_pair("state", &state);

	let FlowState::Callback { params, .. } = relay.enter(&tab, &callback).await? else {
		return Err(eyre!("The callback URL did not resolve to a reconciliation."));
	};
	let metadata = ClientMetadata::new()
		.with_user_agent("relay-walkthrough")
		.with_timezone("Asia/Kolkata")
		.with_locale("en-IN");
	let handoff = relay.reconcile(&tab, &params, metadata).await?;

	println!("backend accepted the hand-off; continue at {}", handoff.payment_url);

	let gate = relay.payment_gate(&handoff.payment_url, handoff.payer_email.as_deref())?;

	println!(
		"checkout: {} {} for {}",
		gate.checkout().amount,
		gate.checkout().currency,
		gate.checkout().description
	);

	let redirect: Url =
		relay.verify_payment(&gate, &PaymentResult::new("pay_demo").with_signature("sig")).await?;

	println!("payment verified; redirecting to {redirect}");

	Ok(())
}
