// self
use crate::{
	_prelude::*,
	obs::{CycleOutcome, CycleStage},
};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_cycle_outcome(stage: CycleStage, outcome: CycleOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"listing_poller_cycle_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Publishes the delay the backoff supervisor will sleep next (when enabled).
pub fn record_backoff_delay(delay: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!("listing_poller_backoff_seconds").set(delay.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = delay;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_cycle_outcome(CycleStage::Fetch, CycleOutcome::Failure);
		record_backoff_delay(Duration::from_secs(2));
	}
}
