//! Per-response rate-limit headers.

// crates.io
use oauth2::http::HeaderMap;
// self
use crate::{_prelude::*, error::FetchError};

/// Header carrying the number of requests used in the current window.
pub const USED_HEADER: &str = "x-ratelimit-used";
/// Header carrying the number of requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the seconds until the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate-limit triple parsed from one listing response; consumed once per cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitSnapshot {
	/// Requests used in the current window.
	pub used: f64,
	/// Requests left in the current window.
	pub remaining: f64,
	/// Time until the window resets.
	pub reset: Duration,
}
impl RateLimitSnapshot {
	/// Parses the three rate-limit headers; absence or a non-numeric value is a [`FetchError`].
	pub fn from_headers(headers: &HeaderMap) -> Result<Self, FetchError> {
		let used = header_number(headers, USED_HEADER)?;
		let remaining = header_number(headers, REMAINING_HEADER)?;
		let reset = header_number(headers, RESET_HEADER)?;

		let reset = Duration::try_from_secs_f64(reset).map_err(|_| {
			FetchError::MalformedRateLimitHeader { header: RESET_HEADER, value: reset.to_string() }
		})?;

		Ok(Self { used, remaining, reset })
	}
}

fn header_number(headers: &HeaderMap, header: &'static str) -> Result<f64, FetchError> {
	let value = headers.get(header).ok_or(FetchError::MissingRateLimitHeader { header })?;
	let raw = value.to_str().map_err(|_| FetchError::MalformedRateLimitHeader {
		header,
		value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
	})?;

	match raw.trim().parse::<f64>() {
		Ok(number) if number.is_finite() && number >= 0.0 => Ok(number),
		_ => Err(FetchError::MalformedRateLimitHeader { header, value: raw.to_owned() }),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::HeaderValue;
	// self
	use super::*;

	fn headers(used: &'static str, remaining: &'static str, reset: &'static str) -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(USED_HEADER, HeaderValue::from_static(used));
		headers.insert(REMAINING_HEADER, HeaderValue::from_static(remaining));
		headers.insert(RESET_HEADER, HeaderValue::from_static(reset));

		headers
	}

	#[test]
	fn parses_integer_and_fractional_values() {
		let snapshot = RateLimitSnapshot::from_headers(&headers("3", "597.0", "412"))
			.expect("Valid headers should parse.");

		assert_eq!(snapshot.used, 3.0);
		assert_eq!(snapshot.remaining, 597.0);
		assert_eq!(snapshot.reset, Duration::from_secs(412));
	}

	#[test]
	fn missing_or_malformed_headers_fail() {
		let mut partial = headers("1", "2", "3");

		partial.remove(RESET_HEADER);

		assert!(matches!(
			RateLimitSnapshot::from_headers(&partial),
			Err(FetchError::MissingRateLimitHeader { header: RESET_HEADER })
		));
		assert!(matches!(
			RateLimitSnapshot::from_headers(&headers("1", "-2", "3")),
			Err(FetchError::MalformedRateLimitHeader { header: REMAINING_HEADER, .. })
		));
		assert!(matches!(
			RateLimitSnapshot::from_headers(&headers("x", "2", "3")),
			Err(FetchError::MalformedRateLimitHeader { header: USED_HEADER, .. })
		));
	}
}
