//! Endless, cancellable listing stream composed of fetch, dedup, pacing, and backoff.
//!
//! Each cycle ensures a valid token, fetches one page before the current cursor, hands the
//! batch to the consumer oldest first, then sleeps the pacing delay derived from the page's
//! rate-limit headers. A failed cycle is logged and followed by the current backoff delay
//! instead of ending the sequence; only cancellation ends it.

pub mod backoff;
pub mod dedup;
pub mod options;
pub mod pacing;

pub use backoff::*;
pub use dedup::*;
pub use options::*;
pub use pacing::*;

// std
use std::collections::VecDeque;
// crates.io
use futures_util::Stream;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	http::PollHttpClient,
	listing::{self, ListingItem, ListingRequest, RateLimitSnapshot},
	oauth::TransportErrorMapper,
	obs::{self, CycleSpan, CycleStage},
	session::ListingSession,
};

/// Completed fetch whose batch is being handed out.
#[derive(Clone, Copy, Debug)]
struct CycleClock {
	started: Instant,
	request: Duration,
	rate_limit: RateLimitSnapshot,
}

/// Pull-based, unbounded sequence of raw item `data` objects.
///
/// The stream mutably borrows its [`ListingSession`], so one session drives at most one
/// stream at a time. Items are yielded oldest first within each batch; the cursor advances
/// only once an item has been handed out.
pub struct ListingStream<'a, C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	session: &'a mut ListingSession<C, M>,
	url: Url,
	options: StreamOptions,
	cancel: CancellationToken,
	backoff: Backoff,
	pending: VecDeque<ListingItem>,
	cycle: Option<CycleClock>,
	finished: bool,
}
impl<'a, C, M> ListingStream<'a, C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		session: &'a mut ListingSession<C, M>,
		url: Url,
		options: StreamOptions,
	) -> Self {
		let mut options = options.normalized();
		let cancel = options.cancellation.take().unwrap_or_default();
		let backoff = Backoff::new(options.backoff);

		Self {
			session,
			url,
			options,
			cancel,
			backoff,
			pending: VecDeque::new(),
			cycle: None,
			finished: false,
		}
	}

	/// Token that stops the stream when cancelled, interrupting any in-progress sleep or fetch.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Current `before` cursor of the underlying session.
	pub fn cursor(&self) -> Option<&str> {
		self.session.tracker.cursor()
	}

	/// Failure supervisor state.
	pub fn backoff(&self) -> &Backoff {
		&self.backoff
	}

	/// Options in effect after normalization.
	pub fn options(&self) -> &StreamOptions {
		&self.options
	}

	/// Returns the next new item, or `None` once the stream has been cancelled.
	///
	/// Failures never surface here: they are logged and retried after the backoff delay, so a
	/// consumer only observes a longer wait.
	pub async fn next(&mut self) -> Option<Value> {
		loop {
			if self.finished || self.cancel.is_cancelled() {
				return self.finish(CycleStage::Fetch);
			}

			if let Some(item) = self.pending.pop_front() {
				let is_last = self.pending.is_empty();

				if self.session.tracker.observe(&item, is_last) {
					return Some(item.into_data());
				}

				continue;
			}

			if let Some(cycle) = self.cycle.take() {
				let breakdown = pace(
					&cycle.rate_limit,
					cycle.started.elapsed(),
					self.options.concurrency_level,
					self.options.extra_delay,
				);

				obs::log_pacing(&breakdown, cycle.request, self.session.config.verbose_logging);

				if !self.sleep(CycleStage::Pace, breakdown.sleep).await {
					return self.finish(CycleStage::Pace);
				}
			}

			let started = Instant::now();
			let request = ListingRequest::new(self.url.clone())
				.with_limit(self.options.page_limit)
				.with_before(self.session.tracker.cursor().map(ToOwned::to_owned));
			let verbose = self.session.config.verbose_logging;
			let cancel = self.cancel.clone();
			let span = CycleSpan::new(CycleStage::Fetch, self.url.as_str());
			let fetch =
				span.instrument(listing::fetch_page(&mut self.session.credentials, &request, verbose));
			let result = tokio::select! {
				biased;
				_ = cancel.cancelled() => None,
				result = fetch => Some(result),
			};
			let Some(result) = result else {
				return self.finish(CycleStage::Fetch);
			};

			match result {
				Ok(page) => {
					self.backoff.on_success();
					obs::record_backoff_delay(self.backoff.current_delay());

					self.pending = self.session.tracker.begin_batch(page.items, page.child_count);
					self.cycle = Some(CycleClock {
						started,
						request: started.elapsed(),
						rate_limit: page.rate_limit,
					});
				},
				Err(e) => {
					let delay = self.backoff.on_failure();

					obs::record_backoff_delay(self.backoff.current_delay());
					obs::log_cycle_failure(&e, delay);

					if !self.sleep(CycleStage::Backoff, delay).await {
						return self.finish(CycleStage::Backoff);
					}
				},
			}
		}
	}

	/// Adapts the stream into a [`futures_util::Stream`].
	pub fn into_stream(self) -> impl Stream<Item = Value> + 'a {
		futures_util::stream::unfold(self, |mut stream| async move {
			let item = stream.next().await?;

			Some((item, stream))
		})
	}

	/// Sleeps for `delay`, returning `false` if cancellation arrived first.
	async fn sleep(&self, stage: CycleStage, delay: Duration) -> bool {
		if delay.is_zero() {
			return !self.cancel.is_cancelled();
		}

		let span = CycleSpan::new(stage, self.url.as_str());

		span.instrument(async {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => false,
				_ = tokio::time::sleep(delay) => true,
			}
		})
		.await
	}

	fn finish(&mut self, stage: CycleStage) -> Option<Value> {
		if !self.finished {
			self.finished = true;
			self.pending.clear();
			self.cycle = None;

			obs::log_stream_cancelled(stage);
		}

		None
	}
}
impl<C, M> Debug for ListingStream<'_, C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ListingStream")
			.field("url", &self.url.as_str())
			.field("options", &self.options)
			.field("backoff", &self.backoff)
			.field("pending", &self.pending.len())
			.field("finished", &self.finished)
			.finish()
	}
}
