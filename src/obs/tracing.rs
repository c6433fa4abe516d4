// self
use crate::{
	_prelude::*,
	listing::RateLimitSnapshot,
	obs::CycleStage,
	stream::PacingBreakdown,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCycle<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCycle<F> = F;

/// A span builder used by the polling loop.
#[derive(Clone, Debug)]
pub struct CycleSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CycleSpan {
	/// Creates a new span tagged with the provided stage and endpoint.
	pub fn new(stage: CycleStage, endpoint: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("listing_poller.cycle", stage = stage.as_str(), endpoint);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, endpoint);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCycle<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a successful password-grant exchange. The token itself is never logged.
pub fn log_token_refreshed(expires_at: OffsetDateTime, lifetime: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(%expires_at, lifetime_secs = lifetime.as_secs(), "Access token refreshed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (expires_at, lifetime);
	}
}

/// Logs the rate-limit headers of a listing response.
pub fn log_rate_limit(snapshot: &RateLimitSnapshot, verbose: bool) {
	#[cfg(feature = "tracing")]
	{
		if verbose {
			tracing::info!(
				used = snapshot.used,
				remaining = snapshot.remaining,
				reset_secs = snapshot.reset.as_secs_f64(),
				"Response rate-limit headers."
			);
		} else {
			tracing::debug!(
				used = snapshot.used,
				remaining = snapshot.remaining,
				reset_secs = snapshot.reset.as_secs_f64(),
				"Response rate-limit headers."
			);
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (snapshot, verbose);
	}
}

/// Warns that a page came back full, so items may have been missed since the last request.
pub fn log_page_saturated(limit: u32) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(limit, "Fetched a full page. Possible item loss since the previous request.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = limit;
	}
}

/// Warns about a child record that was dropped from an otherwise valid page.
pub fn log_item_skipped(index: usize, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(index, %reason, "Skipping malformed listing item.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (index, reason);
	}
}

/// Logs the pacing breakdown of a completed cycle.
///
/// `request` is the share of the cycle spent waiting on the listing endpoint; the rest of
/// `breakdown.elapsed` went to handing the batch to the consumer.
pub fn log_pacing(breakdown: &PacingBreakdown, request: Duration, verbose: bool) {
	#[cfg(feature = "tracing")]
	{
		let reset_secs = breakdown.snapshot.reset.as_secs_f64();
		let remaining = breakdown.snapshot.remaining;
		let request_secs = request.as_secs_f64();
		let processing_secs = breakdown.elapsed.saturating_sub(request).as_secs_f64();
		let target_secs = breakdown.target.as_secs_f64();
		let sleep_secs = breakdown.sleep.as_secs_f64();

		if verbose {
			tracing::info!(
				reset_secs,
				remaining,
				request_secs,
				processing_secs,
				target_secs,
				sleep_secs,
				"Pacing before the next request."
			);
		} else {
			tracing::debug!(
				reset_secs,
				remaining,
				request_secs,
				processing_secs,
				target_secs,
				sleep_secs,
				"Pacing before the next request."
			);
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (breakdown, request, verbose);
	}
}

/// Logs a failed cycle together with the delay about to be slept.
pub fn log_cycle_failure(error: &Error, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(kind = error.kind(), error = %error, "Polling cycle failed.");
		tracing::warn!(delay_secs = delay.as_secs_f64(), "Waiting before continuing.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (error, delay);
	}
}

/// Logs that the stream observed its cancellation signal.
pub fn log_stream_cancelled(stage: CycleStage) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(stage = stage.as_str(), "Listing stream cancelled.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = stage;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cycle_span_and_events_are_callable() {
		let span = CycleSpan::new(CycleStage::Fetch, "https://example.com/new");

		log_page_saturated(100);
		log_item_skipped(3, &"missing id");
		log_stream_cancelled(CycleStage::Pace);

		let _ = span;
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CycleSpan::new(CycleStage::Token, "https://example.com/token");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
