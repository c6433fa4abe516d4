//! Capped exponential backoff supervising the fetch-process-sleep cycle.

// self
use crate::_prelude::*;

/// Bounds and growth of the retry delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
	/// Delay slept after the first failure and restored after any success.
	pub floor: Duration,
	/// Multiplier applied after each consecutive failure.
	pub factor: u32,
	/// Upper bound on the delay.
	pub ceiling: Duration,
}
impl BackoffPolicy {
	const DEFAULT_FLOOR: Duration = Duration::from_secs(2);
	const DEFAULT_FACTOR: u32 = 2;
	const DEFAULT_CEILING_FACTOR: u32 = 8;

	/// Creates a policy; a factor below one becomes one and a ceiling below the floor becomes
	/// the floor.
	pub fn new(floor: Duration, factor: u32, ceiling: Duration) -> Self {
		Self { floor, factor, ceiling }.normalized()
	}

	/// Returns the policy with its invariants restored.
	pub fn normalized(self) -> Self {
		Self { floor: self.floor, factor: self.factor.max(1), ceiling: self.ceiling.max(self.floor) }
	}

	/// Delay following `delay` after one more failure.
	pub fn escalate(&self, delay: Duration) -> Duration {
		delay.saturating_mul(self.factor).min(self.ceiling)
	}
}
impl Default for BackoffPolicy {
	fn default() -> Self {
		Self {
			floor: Self::DEFAULT_FLOOR,
			factor: Self::DEFAULT_FACTOR,
			ceiling: Self::DEFAULT_FLOOR.saturating_mul(Self::DEFAULT_CEILING_FACTOR),
		}
	}
}

/// Supervisor state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffState {
	/// Last cycle succeeded (or none ran yet).
	Steady,
	/// One or more consecutive cycles failed.
	BackingOff {
		/// Consecutive failures so far.
		failures: u32,
		/// Delay slept after the most recent failure.
		delay: Duration,
	},
}

/// Tracks consecutive failures and the delay the next one will sleep.
#[derive(Clone, Debug)]
pub struct Backoff {
	policy: BackoffPolicy,
	state: BackoffState,
	next_delay: Duration,
}
impl Backoff {
	/// Creates a supervisor in [`BackoffState::Steady`].
	pub fn new(policy: BackoffPolicy) -> Self {
		let policy = policy.normalized();

		Self { policy, state: BackoffState::Steady, next_delay: policy.floor }
	}

	/// Current state.
	pub fn state(&self) -> BackoffState {
		self.state
	}

	/// Policy in effect.
	pub fn policy(&self) -> &BackoffPolicy {
		&self.policy
	}

	/// Delay the next failure will sleep.
	pub fn current_delay(&self) -> Duration {
		self.next_delay
	}

	/// Records a failed cycle and returns the delay to sleep before retrying.
	pub fn on_failure(&mut self) -> Duration {
		let delay = self.next_delay;
		let failures = match self.state {
			BackoffState::Steady => 1,
			BackoffState::BackingOff { failures, .. } => failures.saturating_add(1),
		};

		self.state = BackoffState::BackingOff { failures, delay };
		self.next_delay = self.policy.escalate(delay);

		delay
	}

	/// Records a successful cycle, returning to the floor delay.
	pub fn on_success(&mut self) {
		self.state = BackoffState::Steady;
		self.next_delay = self.policy.floor;
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self::new(BackoffPolicy::default())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn secs(value: u64) -> Duration {
		Duration::from_secs(value)
	}

	#[test]
	fn consecutive_failures_double_until_capped_then_success_resets() {
		let mut backoff = Backoff::new(BackoffPolicy::new(secs(2), 2, secs(8)));
		let observed = (0..4).map(|_| backoff.on_failure()).collect::<Vec<_>>();

		assert_eq!(observed, [secs(2), secs(4), secs(8), secs(8)]);
		assert_eq!(backoff.state(), BackoffState::BackingOff { failures: 4, delay: secs(8) });

		backoff.on_success();

		assert_eq!(backoff.state(), BackoffState::Steady);
		assert_eq!(backoff.on_failure(), secs(2));
	}

	#[test]
	fn default_policy_caps_at_eight_times_the_floor() {
		let policy = BackoffPolicy::default();

		assert_eq!(policy.floor, secs(2));
		assert_eq!(policy.ceiling, secs(16));

		let mut backoff = Backoff::new(policy);

		for _ in 0..10 {
			assert!(backoff.on_failure() <= policy.ceiling);
		}

		assert_eq!(backoff.current_delay(), secs(16));
	}

	#[test]
	fn degenerate_policies_are_normalized() {
		let policy = BackoffPolicy::new(secs(5), 0, secs(1));

		assert_eq!(policy.factor, 1);
		assert_eq!(policy.ceiling, secs(5));

		let mut backoff = Backoff::new(policy);

		assert_eq!(backoff.on_failure(), secs(5));
		assert_eq!(backoff.on_failure(), secs(5));
	}
}
