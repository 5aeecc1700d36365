//! Optional observability helpers for relay stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_relay.flow` with the `stage`
//!   (relay step) and `step` (call site) fields, plus a `warn` event for every failed stage.
//! - Enable `metrics` to increment the `oauth2_relay_flow_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Relay stages observed by the instrumentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelayStage {
	/// Authorize entry point: request capture.
	Capture,
	/// Identity sign-in launch.
	SignIn,
	/// Callback reconciliation with the backend.
	Callback,
	/// Payment verification.
	Payment,
	/// Error-surface restart.
	Restart,
}
impl RelayStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RelayStage::Capture => "capture",
			RelayStage::SignIn => "sign_in",
			RelayStage::Callback => "callback",
			RelayStage::Payment => "payment",
			RelayStage::Restart => "restart",
		}
	}
}
impl Display for RelayStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a relay stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the outcome of a stage result, logging failures when tracing is enabled.
pub fn observe<T>(stage: RelayStage, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(stage, FlowOutcome::Success),
		Err(e) => {
			log_failure(stage, e);
			record_flow_outcome(stage, FlowOutcome::Failure);
		},
	}
}
