//! Bearer token state owned by the credential manager.

// self
use crate::{_prelude::*, auth::Secret};

/// Share of the declared lifetime a token is trusted for, absorbing clock skew and latency.
pub const EXPIRY_FRACTION: f64 = 0.9;

/// Access token plus the instant after which it must be refreshed.
#[derive(Clone, Debug)]
pub struct SessionToken {
	/// Bearer token; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh deadline, already shortened to [`EXPIRY_FRACTION`] of the declared lifetime.
	pub expires_at: OffsetDateTime,
}
impl SessionToken {
	/// Creates a token whose deadline is `issued_at + 0.9 × lifetime`.
	pub fn issue(access_token: Secret, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self { access_token, expires_at: issued_at + lifetime.mul_f64(EXPIRY_FRACTION) }
	}

	/// Returns `true` while `instant` has not passed the refresh deadline.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant <= self.expires_at
	}

	/// Convenience helper that checks validity using the current UTC instant.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn issue_trusts_ninety_percent_of_lifetime() {
		let issued_at = datetime!(2024-01-01 00:00 UTC);
		let token = SessionToken::issue(Secret::new("t"), issued_at, Duration::from_secs(3_600));

		assert_eq!(token.expires_at, datetime!(2024-01-01 00:54 UTC));
		assert!(token.is_valid_at(datetime!(2024-01-01 00:54 UTC)));
		assert!(!token.is_valid_at(datetime!(2024-01-01 00:54:01 UTC)));
	}
}
