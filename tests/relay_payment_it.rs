mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use oauth2_relay::{
	error::{Endpoint, Error, Recovery},
	flow::FlowState,
	payment::PaymentResult,
};

#[tokio::test]
async fn verified_payment_releases_the_decoded_redirect() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::new());
	let target = "https://client.example.com/oauth/done?code=xyz&state=abc";
	let gate = relay
		.payment_gate(&relay.config().payment_url(target), Some("ada@example.com"))
		.expect("Payment gate should load.");

	assert_eq!(gate.checkout().prefill.email.as_deref(), Some("ada@example.com"));
	assert_eq!(gate.checkout().amount, 49_900);

	let verify = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/payment/verify")
				.header("content-type", "application/json")
				.body_includes("\"razorpay_payment_id\":\"pay_123\"")
				.body_includes("\"razorpay_signature\":\"no_signature\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"success\"}");
		})
		.await;
	let redirect = relay
		.verify_payment(&gate, &PaymentResult::new("pay_123"))
		.await
		.expect("Verified payment should release the redirect.");

	verify.assert_calls_async(1).await;

	assert_eq!(redirect.as_str(), target);
}

#[tokio::test]
async fn unverified_payment_keeps_the_user_on_the_page() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::new());
	let gate = relay
		.payment_gate(&relay.config().payment_url(CLIENT_REDIRECT), None)
		.expect("Payment gate should load.");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/payment/verify");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"failed\"}");
		})
		.await;

	let err = relay
		.verify_payment(&gate, &PaymentResult::new("pay_456").with_signature("sig"))
		.await
		.expect_err("A non-success status must block the redirect.");

	assert!(matches!(err, Error::VerificationFailed { status: Some(ref s) } if s == "failed"));
	assert_eq!(err.recovery(), Recovery::Retry);
}

#[tokio::test]
async fn verification_transport_failures_are_retryable() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::new());
	let gate = relay
		.payment_gate(&relay.config().payment_url(CLIENT_REDIRECT), None)
		.expect("Payment gate should load.");
	let mut failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/payment/verify");
			then.status(500).body("{\"message\":\"ledger unavailable\"}");
		})
		.await;
	let err = relay
		.verify_payment(&gate, &PaymentResult::new("pay_789"))
		.await
		.expect_err("Server errors must fail verification.");

	assert_eq!(err.message(), "Payment verification failed (500): ledger unavailable");
	assert_eq!(err.recovery(), Recovery::Retry);

	failing.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/payment/verify");
			then.status(200).delay(StdDuration::from_secs(3)).body("{\"status\":\"success\"}");
		})
		.await;

	let err = relay
		.verify_payment(&gate, &PaymentResult::new("pay_789"))
		.await
		.expect_err("A slow verification endpoint must time out.");

	assert!(matches!(err, Error::NoResponse { endpoint: Endpoint::PaymentVerification, .. }));
	assert_eq!(err.recovery(), Recovery::Retry);
}

#[tokio::test]
async fn payment_page_rejects_missing_or_foreign_targets() {
	let server = MockServer::start_async().await;
	let (relay, _store) = relay(&server, FakeIdentity::new());
	let mut bare = relay.config().payment_url(CLIENT_REDIRECT);

	bare.set_query(None);

	assert!(matches!(relay.payment_gate(&bare, None), Err(Error::MissingRedirectTarget)));
	assert!(matches!(
		relay.payment_gate(&relay.config().payment_url("https://attacker.example.net/x"), None),
		Err(Error::RedirectNotAllowed { .. })
	));

	let state = relay
		.enter(&key("tab-pay"), &relay.config().payment_url(CLIENT_REDIRECT))
		.await
		.expect("Entering the payment page should succeed.");

	assert!(matches!(state, FlowState::Payment(ref gate) if gate.redirect_uri() == CLIENT_REDIRECT));
}
