//! Paginated listing model: request parameters, parsed items, rate-limit headers, and the
//! single-page fetcher.

pub mod item;
pub mod rate_limit;

mod fetcher;

pub(crate) use fetcher::*;
pub use item::*;
pub use rate_limit::*;

// self
use crate::_prelude::*;

/// Default number of children requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Parameters for one listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRequest {
	/// Listing endpoint URL.
	pub url: Url,
	/// Maximum number of children requested.
	pub limit: u32,
	/// Fullname the returned items must be newer than.
	pub before: Option<String>,
	/// Fullname the returned items must be older than.
	pub after: Option<String>,
}
impl ListingRequest {
	/// Creates a first-page request with the default limit.
	pub fn new(url: Url) -> Self {
		Self { url, limit: DEFAULT_PAGE_LIMIT, before: None, after: None }
	}

	/// Overrides the page limit; zero is raised to one.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = limit.max(1);

		self
	}

	/// Sets the `before` cursor.
	pub fn with_before(mut self, before: Option<String>) -> Self {
		self.before = before;

		self
	}

	/// Sets the `after` cursor.
	pub fn with_after(mut self, after: Option<String>) -> Self {
		self.after = after;

		self
	}

	/// Returns the URL with `limit`, `raw_json`, `show`, and cursor query parameters applied.
	pub fn to_url(&self) -> Url {
		let mut url = self.url.clone();

		{
			let mut query = url.query_pairs_mut();

			query
				.append_pair("limit", &self.limit.to_string())
				.append_pair("raw_json", "1")
				.append_pair("show", "all");

			if let Some(after) = &self.after {
				query.append_pair("after", after);
			}
			if let Some(before) = &self.before {
				query.append_pair("before", before);
			}
		}

		url
	}
}

/// One fetched page: well-formed items in server order plus the response's rate-limit headers.
#[derive(Clone, Debug)]
pub struct ListingPage {
	/// Parsed items, in the order the server returned them.
	pub items: Vec<ListingItem>,
	/// Number of children in the response body, including skipped malformed ones.
	pub child_count: usize,
	/// Rate-limit headers attached to the response.
	pub rate_limit: RateLimitSnapshot,
}
impl ListingPage {
	/// Returns `true` when the server filled the page, meaning items may have been missed.
	pub fn is_saturated(&self, limit: u32) -> bool {
		match u32::try_from(self.child_count) {
			Ok(count) => count >= limit,
			Err(_) => true,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn url_carries_fixed_mode_and_cursors() {
		let request = ListingRequest::new(
			Url::parse("https://oauth.reddit.com/r/all/new").expect("Failed to parse listing URL."),
		)
		.with_limit(25)
		.with_before(Some("t3_abc".into()));

		assert_eq!(
			request.to_url().as_str(),
			"https://oauth.reddit.com/r/all/new?limit=25&raw_json=1&show=all&before=t3_abc"
		);
	}

	#[test]
	fn first_page_omits_cursors_and_clamps_limit() {
		let request = ListingRequest::new(
			Url::parse("https://oauth.reddit.com/new").expect("Failed to parse listing URL."),
		)
		.with_limit(0);

		assert_eq!(request.limit, 1);
		assert_eq!(
			request.to_url().as_str(),
			"https://oauth.reddit.com/new?limit=1&raw_json=1&show=all"
		);
	}
}
