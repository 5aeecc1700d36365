//! Payment Gate: the checkout presented after a successful backend hand-off and the
//! verification that releases the final redirect.

// self
use crate::{
	_prelude::*,
	config::{CheckoutConfig, RelayConfig},
	error::Endpoint,
	http::RelayResponse,
};

/// Signature value sent when the checkout widget did not return one.
pub const NO_SIGNATURE: &str = "no_signature";

const VERIFIED_STATUS: &str = "success";

/// Payment page state: the client's redirect target plus the checkout to present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGate {
	redirect_uri: String,
	checkout: CheckoutOptions,
}
impl PaymentGate {
	/// Creates a gate for `redirect_uri` with the configured checkout and no payer prefill.
	pub fn new(redirect_uri: impl Into<String>, checkout: &CheckoutConfig) -> Self {
		Self { redirect_uri: redirect_uri.into(), checkout: CheckoutOptions::from_config(checkout) }
	}

	/// Reads the forwarded `redirect_uri` from a payment page URL.
	pub fn from_url(config: &RelayConfig, url: &Url) -> Result<Self> {
		let redirect_uri = url
			.query_pairs()
			.find(|(name, _)| name == "redirect_uri")
			.map(|(_, value)| value.into_owned())
			.filter(|value| !value.is_empty())
			.ok_or(Error::MissingRedirectTarget)?;

		Ok(Self::new(redirect_uri, &config.checkout))
	}

	/// Prefills the payer's email in the checkout.
	pub fn with_payer_email(mut self, email: impl Into<String>) -> Self {
		self.checkout.prefill.email = Some(email.into());

		self
	}

	/// Final redirect target released by a verified payment.
	pub fn redirect_uri(&self) -> &str {
		&self.redirect_uri
	}

	/// Checkout options for the payment widget.
	pub fn checkout(&self) -> &CheckoutOptions {
		&self.checkout
	}
}

/// Options handed to the checkout widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
	/// Processor public key id.
	pub key: String,
	/// Amount in the currency's minor unit.
	pub amount: u64,
	/// ISO 4217 currency code.
	pub currency: String,
	/// Merchant name.
	pub name: String,
	/// Product description.
	pub description: String,
	/// Prefilled payer details.
	pub prefill: CheckoutPrefill,
	/// Widget-internal retry for transient processor errors.
	pub retry: CheckoutRetry,
	/// Reopen the widget after the user dismisses it.
	pub reopen_on_dismiss: bool,
}
impl CheckoutOptions {
	fn from_config(config: &CheckoutConfig) -> Self {
		Self {
			key: config.key_id.clone(),
			amount: config.amount,
			currency: config.currency.clone(),
			name: config.name.clone(),
			description: config.description.clone(),
			prefill: CheckoutPrefill::default(),
			retry: CheckoutRetry { enabled: true, max_count: config.retry_max_count },
			reopen_on_dismiss: true,
		}
	}
}

/// Prefilled payer details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPrefill {
	/// Payer email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

/// Checkout widget retry settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRetry {
	/// Whether retries are enabled.
	pub enabled: bool,
	/// Maximum retry count.
	pub max_count: u32,
}

/// Result returned by the checkout widget after a completed payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
	/// Processor payment id.
	pub razorpay_payment_id: String,
	/// Processor signature, when the widget provides one.
	#[serde(default)]
	pub razorpay_signature: Option<String>,
}
impl PaymentResult {
	/// Creates a result without a signature.
	pub fn new(payment_id: impl Into<String>) -> Self {
		Self { razorpay_payment_id: payment_id.into(), razorpay_signature: None }
	}

	/// Attaches the processor signature.
	pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
		self.razorpay_signature = Some(signature.into());

		self
	}

	/// Body of the verification POST.
	pub fn verification_request(&self) -> VerificationRequest<'_> {
		VerificationRequest {
			razorpay_payment_id: &self.razorpay_payment_id,
			razorpay_signature: self.razorpay_signature.as_deref().unwrap_or(NO_SIGNATURE),
		}
	}
}

/// Body of the payment verification POST.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationRequest<'a> {
	/// Processor payment id.
	pub razorpay_payment_id: &'a str,
	/// Processor signature or [`NO_SIGNATURE`].
	pub razorpay_signature: &'a str,
}

/// Reply of the payment verification endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct VerificationReply {
	/// `"success"` releases the redirect; anything else blocks it.
	#[serde(default)]
	pub status: Option<String>,
}
impl VerificationReply {
	/// Returns `true` only for an explicit `"success"` status.
	pub fn is_verified(&self) -> bool {
		self.status.as_deref() == Some(VERIFIED_STATUS)
	}
}

/// Turns the verification endpoint's response into a pass/fail decision.
pub(crate) fn interpret_verification(response: &RelayResponse) -> Result<()> {
	if !response.is_success() {
		return Err(Error::Backend {
			endpoint: Endpoint::PaymentVerification,
			status: response.status,
			message: response.error_message(),
		});
	}

	let reply = response.json::<VerificationReply>().unwrap_or_default();

	if reply.is_verified() { Ok(()) } else { Err(Error::VerificationFailed { status: reply.status }) }
}
