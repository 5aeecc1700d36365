//! Flow Error Surface restart.

// self
use crate::{
	_prelude::*,
	auth::FlowKey,
	obs::{self, FlowOutcome, FlowSpan, RelayStage},
	relay::Relay,
};

impl Relay {
	/// Discards the flow context for `key` and returns the application root to navigate to.
	pub async fn restart(&self, key: &FlowKey) -> Result<Url> {
		const STAGE: RelayStage = RelayStage::Restart;

		let span = FlowSpan::new(STAGE, "restart");

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let result: Result<Url> = span
			.instrument(async move {
				self.store.clear(key).await?;

				Ok(self.config.root_url())
			})
			.await;

		obs::observe(STAGE, &result);

		result
	}
}
