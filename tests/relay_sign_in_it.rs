mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use oauth2_relay::{
	config::ANALYTICS_SCOPES,
	error::{Error, Recovery},
	flow::FlowState,
	relay::Relay,
	request::AuthorizationRequest,
	store::{FlowContextStore, MemoryStore},
};

#[tokio::test]
async fn capture_accepts_minimal_request_and_stores_nothing() {
	let server = MockServer::start_async().await;
	let (relay, store) = relay(&server, FakeIdentity::new());
	let url = authorize_url(
		&relay,
		"client_id=abc&redirect_uri=https%3A%2F%2Fclient.example.com%2Foauth%2Fdone&response_type=code",
	);
	let request = relay.capture(&url).expect("Minimal request should be captured.");

	assert_eq!(request.client_id, "abc");
	assert_eq!(request.redirect_uri, CLIENT_REDIRECT);
	assert_eq!(request.scope, None);
	assert_eq!(request.effective_scope(), "read");
	assert!(store.is_empty(), "Capture must not write the flow context.");
}

#[tokio::test]
async fn capture_rejects_malformed_and_disallowed_requests() {
	let server = MockServer::start_async().await;
	let (relay, store) = relay(&server, FakeIdentity::new());
	let missing_redirect = authorize_url(&relay, "client_id=abc&response_type=code");
	let err = relay.capture(&missing_redirect).expect_err("Missing redirect_uri must fail.");

	assert_eq!(err.message(), "Invalid OAuth request: Missing required parameters");
	assert_eq!(err.recovery(), Recovery::Restart);

	let wrong_type = authorize_url(
		&relay,
		"client_id=abc&redirect_uri=https://client.example.com/done&response_type=token",
	);

	assert!(matches!(relay.capture(&wrong_type), Err(Error::MalformedRequest)));

	let foreign = authorize_url(
		&relay,
		"client_id=abc&redirect_uri=https://attacker.example.net/steal&response_type=code",
	);

	assert!(matches!(relay.capture(&foreign), Err(Error::RedirectNotAllowed { .. })));
	assert!(store.is_empty());
}

#[tokio::test]
async fn begin_sign_in_persists_request_and_requests_offline_analytics_scopes() {
	let server = MockServer::start_async().await;
	let (relay, store) = relay(&server, FakeIdentity::new());
	let tab = key("tab-1");
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/oauth/done&response_type=code\
			 &state=xyz&code_challenge=E9Mel&code_challenge_method=S256&scope=read+write",
		))
		.expect("Request should be captured.");
	let provider_url = relay.begin_sign_in(&tab, &request).await.expect("Sign-in should start.");

	assert_eq!(provider_url.host_str(), Some("idp.test"));
	assert_eq!(
		store.read(&tab).await.expect("Store read should succeed."),
		Some(request),
		"Sign-in must persist the captured request."
	);
}

#[tokio::test]
async fn sign_in_options_carry_callback_and_scopes() {
	let server = MockServer::start_async().await;
	let identity = Arc::new(FakeIdentity::new());
	let relay = Relay::new(config(&server), Arc::new(MemoryStore::default()), identity.clone());
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");

	relay.begin_sign_in(&key("tab-opts"), &request).await.expect("Sign-in should start.");

	let seen = identity.seen_options.lock().expect("Options lock should not be poisoned.");
	let options = seen.first().expect("Identity layer should have been called.");

	assert_eq!(options.return_to, relay.config().callback_url());
	assert!(options.offline_access);
	assert!(options.force_consent);

	for scope in ANALYTICS_SCOPES {
		assert!(options.scopes.contains(scope), "Missing scope {scope}.");
	}
}

#[tokio::test]
async fn provider_failure_is_surfaced_verbatim() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::rejecting("popup closed by user"));
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");
	let err = relay
		.begin_sign_in(&key("tab-2"), &request)
		.await
		.expect_err("Provider rejection must fail the sign-in.");

	assert_eq!(err.message(), "Login failed: popup closed by user");
}

#[tokio::test]
async fn concurrent_sign_in_for_the_same_flow_is_refused() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::slow(StdDuration::from_millis(200)));
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");
	let tab = key("tab-3");
	let other_tab = key("tab-4");
	let (first, second, other) = tokio::join!(
		relay.begin_sign_in(&tab, &request),
		relay.begin_sign_in(&tab, &request),
		relay.begin_sign_in(&other_tab, &request),
	);

	first.expect("The first sign-in should proceed.");
	other.expect("Other flows must not be blocked.");
	assert!(matches!(second, Err(Error::SignInPending)));
	assert_eq!(relay.pending_sign_ins(), 0, "Finished launches must release their guards.");

	relay.begin_sign_in(&tab, &request).await.expect("A later sign-in should proceed.");
}

#[tokio::test]
async fn sign_in_guards_are_released_per_flow() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::new());
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");

	for n in 0..64 {
		let tab = key(&format!("tab-guard-{n}"));

		relay.begin_sign_in(&tab, &request).await.expect("Sign-in should start.");
		relay.restart(&tab).await.expect("Restart should succeed.");
	}

	let malformed = AuthorizationRequest::from_query("client_id=abc");

	assert!(matches!(
		relay.begin_sign_in(&key("tab-guard-bad"), &malformed).await,
		Err(Error::MalformedRequest)
	));
	assert_eq!(relay.pending_sign_ins(), 0);
	assert!(format!("{relay:?}").contains("pending_sign_ins: 0"));
}

#[tokio::test]
async fn cancelled_sign_in_releases_its_guard() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::slow(StdDuration::from_millis(500)));
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");
	let tab = key("tab-cancelled");
	let abandoned =
		tokio::time::timeout(StdDuration::from_millis(50), relay.begin_sign_in(&tab, &request))
			.await;

	assert!(abandoned.is_err(), "The launch should still be waiting on the provider.");
	assert_eq!(relay.pending_sign_ins(), 0);
}

#[tokio::test]
async fn restart_clears_context_and_returns_root() {
	let server = MockServer::start_async().await;
	let (relay, store) = relay(&server, FakeIdentity::new());
	let tab = key("tab-5");
	let request = relay
		.capture(&authorize_url(
			&relay,
			"client_id=abc&redirect_uri=https://client.example.com/done&response_type=code",
		))
		.expect("Request should be captured.");

	relay.begin_sign_in(&tab, &request).await.expect("Sign-in should start.");

	let root = relay.restart(&tab).await.expect("Restart should succeed.");

	assert_eq!(root, relay.config().root_url());
	assert!(store.is_empty());

	let state = relay
		.enter(&tab, &authorize_url(&relay, "client_id=abc"))
		.await
		.expect("Entering should succeed.");

	assert!(matches!(state, FlowState::Error(Error::MalformedRequest)));
}
