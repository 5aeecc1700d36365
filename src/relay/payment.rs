//! Payment page entry and verification.

// self
use crate::{
	_prelude::*,
	error::Endpoint,
	obs::{self, FlowOutcome, FlowSpan, RelayStage},
	payment::{self, PaymentGate, PaymentResult},
	relay::Relay,
};

impl Relay {
	/// Loads the payment gate for the payment page `url`.
	///
	/// The forwarded `redirect_uri` is checked against the redirect policy here so a user never
	/// pays for a redirect the relay would refuse.
	pub fn payment_gate(&self, url: &Url, payer_email: Option<&str>) -> Result<PaymentGate> {
		let gate = PaymentGate::from_url(&self.config, url)?;

		self.ensure_redirect_permitted(gate.redirect_uri())?;

		Ok(match payer_email {
			Some(email) => gate.with_payer_email(email),
			None => gate,
		})
	}

	/// Verifies a completed checkout and returns the client's redirect target.
	///
	/// Only an explicit `"success"` from the verification endpoint releases the redirect. The
	/// checkout being dismissed never reaches this call and is not an error.
	pub async fn verify_payment(&self, gate: &PaymentGate, result: &PaymentResult) -> Result<Url> {
		const STAGE: RelayStage = RelayStage::Payment;

		let span = FlowSpan::new(STAGE, "verify_payment");

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let outcome = span
			.instrument(async move {
				let response = self
					.http_client
					.post_json(
						self.config.verify_url(),
						&result.verification_request(),
						self.config.verify_timeout,
					)
					.await
					.map_err(|source| Error::NoResponse {
						endpoint: Endpoint::PaymentVerification,
						source,
					})?;

				payment::interpret_verification(&response)?;

				self.ensure_redirect_permitted(gate.redirect_uri())
			})
			.await;

		obs::observe(STAGE, &outcome);

		outcome
	}

	fn ensure_redirect_permitted(&self, redirect_uri: &str) -> Result<Url> {
		let rejected = || Error::RedirectNotAllowed { redirect_uri: redirect_uri.to_owned() };

		if !self.config.redirect_policy.permits(redirect_uri) {
			return Err(rejected());
		}

		Url::parse(redirect_uri).map_err(|_| rejected())
	}
}
