//! Optional observability helpers for the polling loop.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `listing_poller.cycle` with
//!   a `stage` field, plus the token, pacing, saturation, and failure events defined in
//!   [`tracing`](self::tracing).
//! - Enable `metrics` to increment the `listing_poller_cycle_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`, and to publish the current backoff
//!   delay through the `listing_poller_backoff_seconds` gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Stages of one fetch-process-sleep cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleStage {
	/// Password-grant token exchange.
	Token,
	/// Listing page request.
	Fetch,
	/// Rate-limit pacing sleep.
	Pace,
	/// Failure backoff sleep.
	Backoff,
}
impl CycleStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CycleStage::Token => "token",
			CycleStage::Fetch => "fetch",
			CycleStage::Pace => "pace",
			CycleStage::Backoff => "backoff",
		}
	}
}
impl Display for CycleStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure handed to the backoff supervisor.
	Failure,
}
impl CycleOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CycleOutcome::Attempt => "attempt",
			CycleOutcome::Success => "success",
			CycleOutcome::Failure => "failure",
		}
	}
}
impl Display for CycleOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
