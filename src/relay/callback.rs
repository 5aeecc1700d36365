//! Callback Reconciler: joins the identity session with the restored request and hands both to
//! the backend authorization service.
//!
//! The steps are hard-gated in order: identity session, durable flow context, backend POST.
//! Once the context has been read it is cleared whatever the backend outcome, so a duplicate
//! callback navigation always lands on [`Error::SessionExpired`].

// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	error::Endpoint,
	identity::{CallbackParams, IdentitySession},
	obs::{self, FlowOutcome, FlowSpan, RelayStage},
	payload::{ClientMetadata, EnrichedCallbackPayload},
	relay::Relay,
	request::AuthorizationRequest,
};

const STAGE: RelayStage = RelayStage::Callback;

/// Body returned by the backend callback endpoint, parsed leniently.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BackendReply {
	/// `"success"` or `"error"`, when the backend reports one.
	#[serde(default)]
	pub status: Option<String>,
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
	/// Redirect suggested by the backend.
	#[serde(default)]
	pub redirect_url: Option<String>,
}
impl BackendReply {
	/// Returns `true` when the body explicitly reports an error.
	pub fn reports_error(&self) -> bool {
		self.status.as_deref() == Some("error")
	}
}

/// Outcome of a successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handoff {
	/// Payment page URL carrying the client's `redirect_uri`.
	pub payment_url: Url,
	/// Backend reply.
	pub backend: BackendReply,
	/// Email of the signed-in account, used to prefill the checkout.
	pub payer_email: Option<String>,
}

impl Relay {
	/// Reconciles the identity provider's return for `key`.
	///
	/// Returns the hand-off carrying the payment page URL. Any failure is terminal for the
	/// attempt; see [`Error::recovery`].
	pub async fn reconcile(
		&self,
		key: &FlowKey,
		callback: &CallbackParams,
		metadata: ClientMetadata,
	) -> Result<Handoff> {
		let span = FlowSpan::new(STAGE, "reconcile");

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let session = match self.identity.session(callback).await {
					Ok(Some(session)) => session,
					Ok(None) => return Err(Error::IdentityMissing),
					Err(e) => {
						obs::log_identity_error(STAGE, &e);

						return Err(Error::IdentityMissing);
					},
				};
				let request = self.store.read(key).await?.ok_or(Error::SessionExpired)?;
				let handoff = self.hand_off(&request, &session, metadata).await;
				let cleared = self.store.clear(key).await;
				let handoff = handoff?;

				cleared?;

				Ok(handoff)
			})
			.await;

		obs::observe(STAGE, &result);

		result
	}

	async fn hand_off(
		&self,
		request: &AuthorizationRequest,
		session: &IdentitySession,
		metadata: ClientMetadata,
	) -> Result<Handoff> {
		let payload = EnrichedCallbackPayload::assemble(session, metadata);
		let response = self
			.http_client
			.post_json(
				self.config.backend_callback_url(request),
				&payload,
				self.config.callback_timeout,
			)
			.await
			.map_err(|source| Error::NoResponse { endpoint: Endpoint::Callback, source })?;

		if !response.is_success() {
			return Err(Error::Backend {
				endpoint: Endpoint::Callback,
				status: response.status,
				message: response.error_message(),
			});
		}

		let backend = response.json::<BackendReply>().unwrap_or_default();

		if backend.reports_error() {
			obs::log_backend_reported_error(STAGE, backend.message.as_deref());
		}

		Ok(Handoff {
			payment_url: self.config.payment_url(&request.redirect_uri),
			backend,
			payer_email: session.profile.email.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn backend_reply_is_lenient() {
		let reply: BackendReply = serde_json::from_str(
			r#"{"status":"error","message":"client paused","extra":{"nested":true}}"#,
		)
		.expect("Unknown fields should be ignored.");

		assert!(reply.reports_error());
		assert_eq!(reply.redirect_url, None);
		assert!(!BackendReply::default().reports_error());
	}
}
