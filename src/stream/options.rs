//! Per-stream tuning knobs.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, listing::DEFAULT_PAGE_LIMIT, stream::BackoffPolicy};

/// Options applied to one [`ListingStream`](crate::stream::ListingStream).
///
/// Values that would break pacing are normalized when the stream starts: a non-finite or
/// non-positive `concurrency_level` becomes `1.0` and a zero `page_limit` becomes `1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
	/// Number of pollers sharing the same quota; multiplies the per-request delay.
	pub concurrency_level: f64,
	/// Fixed delay added to every pacing sleep.
	pub extra_delay: Duration,
	/// Children requested per page.
	pub page_limit: u32,
	/// Failure backoff bounds.
	pub backoff: BackoffPolicy,
	/// External cancellation signal; a private token is created when unset.
	#[serde(skip)]
	pub cancellation: Option<CancellationToken>,
}
impl StreamOptions {
	/// Sets the concurrency level.
	pub fn with_concurrency_level(mut self, concurrency_level: f64) -> Self {
		self.concurrency_level = concurrency_level;

		self
	}

	/// Sets the fixed extra delay.
	pub fn with_extra_delay(mut self, extra_delay: Duration) -> Self {
		self.extra_delay = extra_delay;

		self
	}

	/// Sets the page limit.
	pub fn with_page_limit(mut self, page_limit: u32) -> Self {
		self.page_limit = page_limit;

		self
	}

	/// Sets the backoff policy.
	pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
		self.backoff = backoff;

		self
	}

	/// Ties the stream to an external cancellation token.
	pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
		self.cancellation = Some(cancellation);

		self
	}

	/// Returns the options with out-of-range values replaced.
	pub fn normalized(self) -> Self {
		let concurrency_level =
			if self.concurrency_level.is_finite() && self.concurrency_level > 0.0 {
				self.concurrency_level
			} else {
				1.0
			};

		Self {
			concurrency_level,
			extra_delay: self.extra_delay,
			page_limit: self.page_limit.max(1),
			backoff: self.backoff.normalized(),
			cancellation: self.cancellation,
		}
	}
}
impl Default for StreamOptions {
	fn default() -> Self {
		Self {
			concurrency_level: 1.0,
			extra_delay: Duration::ZERO,
			page_limit: DEFAULT_PAGE_LIMIT,
			backoff: BackoffPolicy::default(),
			cancellation: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn normalization_repairs_out_of_range_values() {
		let options = StreamOptions::default()
			.with_concurrency_level(f64::NAN)
			.with_page_limit(0)
			.with_backoff(BackoffPolicy {
				floor: Duration::from_secs(3),
				factor: 0,
				ceiling: Duration::ZERO,
			})
			.normalized();

		assert_eq!(options.concurrency_level, 1.0);
		assert_eq!(options.page_limit, 1);
		assert_eq!(options.backoff.factor, 1);
		assert_eq!(options.backoff.ceiling, Duration::from_secs(3));
		assert_eq!(
			StreamOptions::default().with_concurrency_level(-2.0).normalized().concurrency_level,
			1.0
		);
	}

	#[test]
	fn deserializes_partial_documents() {
		let options: StreamOptions =
			serde_json::from_str(r#"{"concurrency_level":3.0,"page_limit":25}"#)
				.expect("Partial options should deserialize.");

		assert_eq!(options.concurrency_level, 3.0);
		assert_eq!(options.page_limit, 25);
		assert_eq!(options.extra_delay, Duration::ZERO);
		assert_eq!(options.backoff, BackoffPolicy::default());
		assert!(options.cancellation.is_none());
	}
}
