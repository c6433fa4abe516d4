//! Inter-request delay derived from the server's rate-limit headers.

// self
use crate::{_prelude::*, listing::RateLimitSnapshot};

/// Every input and intermediate of one pacing decision, kept for logging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingBreakdown {
	/// Headers the decision was based on.
	pub snapshot: RateLimitSnapshot,
	/// Delay the quota allows between requests, before any correction.
	pub target: Duration,
	/// Wall-clock time already spent on this cycle.
	pub elapsed: Duration,
	/// Fixed delay added on top of the corrected target.
	pub extra: Duration,
	/// Final delay to sleep.
	pub sleep: Duration,
}

/// Delay the quota allows between two requests of this poller.
///
/// With nothing remaining the whole reset window must be waited out. Otherwise the window
/// is spread over the remaining requests and multiplied by `concurrency_level`, the number of
/// pollers sharing the same quota.
pub fn target_delay(snapshot: &RateLimitSnapshot, concurrency_level: f64) -> Duration {
	if snapshot.remaining <= 0.0 {
		return snapshot.reset;
	}

	let seconds = snapshot.reset.as_secs_f64() / snapshot.remaining * concurrency_level;

	Duration::try_from_secs_f64(seconds).unwrap_or(snapshot.reset)
}

/// Computes the full pacing breakdown for a finished cycle.
pub fn pace(
	snapshot: &RateLimitSnapshot,
	cycle_elapsed: Duration,
	concurrency_level: f64,
	extra_delay: Duration,
) -> PacingBreakdown {
	let target = target_delay(snapshot, concurrency_level);
	let sleep = target.saturating_sub(cycle_elapsed).saturating_add(extra_delay);

	PacingBreakdown { snapshot: *snapshot, target, elapsed: cycle_elapsed, extra: extra_delay, sleep }
}

/// Returns `max(target − cycle_elapsed, 0) + extra_delay`.
pub fn compute_sleep(
	snapshot: &RateLimitSnapshot,
	cycle_elapsed: Duration,
	concurrency_level: f64,
	extra_delay: Duration,
) -> Duration {
	pace(snapshot, cycle_elapsed, concurrency_level, extra_delay).sleep
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn snapshot(remaining: f64, reset_secs: u64) -> RateLimitSnapshot {
		RateLimitSnapshot { used: 0.0, remaining, reset: Duration::from_secs(reset_secs) }
	}

	#[test]
	fn spreads_window_over_remaining_requests() {
		let delay = compute_sleep(&snapshot(5.0, 10), Duration::from_secs(1), 1.0, Duration::ZERO);

		assert_eq!(delay, Duration::from_secs(1));
	}

	#[test]
	fn exhausted_quota_waits_full_reset() {
		assert_eq!(target_delay(&snapshot(0.0, 37), 1.0), Duration::from_secs(37));
		assert_eq!(target_delay(&snapshot(0.0, 37), 4.0), Duration::from_secs(37));
		assert_eq!(
			compute_sleep(&snapshot(0.0, 37), Duration::ZERO, 1.0, Duration::ZERO),
			Duration::from_secs(37)
		);
	}

	#[test]
	fn concurrency_scales_the_per_poller_delay() {
		assert_eq!(target_delay(&snapshot(100.0, 50), 1.0), Duration::from_millis(500));
		assert_eq!(target_delay(&snapshot(100.0, 50), 4.0), Duration::from_secs(2));
	}

	#[test]
	fn slow_cycles_never_produce_negative_delay() {
		let breakdown =
			pace(&snapshot(5.0, 10), Duration::from_secs(30), 1.0, Duration::from_millis(250));

		assert_eq!(breakdown.target, Duration::from_secs(2));
		assert_eq!(breakdown.sleep, Duration::from_millis(250));
	}
}
