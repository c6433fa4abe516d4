//! Single-page listing fetch: bearer auth, rate-limit headers, lenient child parsing.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::CredentialManager,
	error::{ConfigError, FetchError},
	http::{PollHttpClient, ResponseMetadataSlot},
	listing::{ListingItem, ListingPage, ListingRequest, RateLimitSnapshot},
	oauth::TransportErrorMapper,
	obs::{self, CycleOutcome, CycleStage},
};

#[derive(Deserialize)]
struct ListingEnvelope {
	data: ListingBody,
}

#[derive(Deserialize)]
struct ListingBody {
	children: Vec<Value>,
}

/// Fetches one page, refreshing the bearer token first when needed.
pub(crate) async fn fetch_page<C, M>(
	credentials: &mut CredentialManager<C, M>,
	request: &ListingRequest,
	verbose: bool,
) -> Result<ListingPage>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let access_token = credentials.ensure_valid_token().await?;

	obs::record_cycle_outcome(CycleStage::Fetch, CycleOutcome::Attempt);

	let result: Result<ListingPage> = async {
		let http_request: HttpRequest = Request::builder()
			.method(Method::GET)
			.uri(request.to_url().as_str())
			.header(AUTHORIZATION, format!("bearer {}", access_token.expose()))
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let facade = credentials.facade();
		let meta = ResponseMetadataSlot::default();
		let handle = facade.handle(meta.clone());
		let response = handle.call(http_request).await.map_err(|err| {
			facade.error_mapper().map_transport_error(CycleStage::Fetch, meta.take().as_ref(), err)
		})?;
		let status = response.status();

		if !status.is_success() {
			let retry_after = meta.take().and_then(|value| value.retry_after);

			return Err(FetchError::Status { status: status.as_u16(), retry_after }.into());
		}

		let rate_limit = RateLimitSnapshot::from_headers(response.headers())?;

		obs::log_rate_limit(&rate_limit, verbose);

		let page = parse_page(response.body(), rate_limit)?;

		if page.is_saturated(request.limit) {
			obs::log_page_saturated(request.limit);
		}

		Ok(page)
	}
	.await;

	match &result {
		Ok(_) => obs::record_cycle_outcome(CycleStage::Fetch, CycleOutcome::Success),
		Err(_) => obs::record_cycle_outcome(CycleStage::Fetch, CycleOutcome::Failure),
	}

	result
}

/// Parses a listing body, skipping children that cannot be keyed or ordered.
pub(crate) fn parse_page(body: &[u8], rate_limit: RateLimitSnapshot) -> Result<ListingPage> {
	let deserializer = &mut serde_json::Deserializer::from_slice(body);
	let envelope: ListingEnvelope = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| FetchError::MalformedBody { source })?;
	let children = envelope.data.children;
	let child_count = children.len();
	let items = children
		.iter()
		.enumerate()
		.filter_map(|(index, child)| match ListingItem::from_child(child) {
			Ok(item) => Some(item),
			Err(reason) => {
				obs::log_item_skipped(index, &reason);

				None
			},
		})
		.collect();

	Ok(ListingPage { items, child_count, rate_limit })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn snapshot() -> RateLimitSnapshot {
		RateLimitSnapshot { used: 1.0, remaining: 599.0, reset: Duration::from_secs(300) }
	}

	#[test]
	fn parse_keeps_server_order_and_skips_malformed_children() {
		let body = br#"{"kind":"Listing","data":{"after":null,"children":[
			{"kind":"t3","data":{"id":"b","name":"t3_b"}},
			{"kind":"t3","data":{"title":"no id"}},
			{"kind":"t3","data":{"id":"a","name":"t3_a"}}
		]}}"#;
		let page = parse_page(body, snapshot()).expect("Listing body should parse.");
		let names = page.items.iter().map(|item| item.fullname.as_str()).collect::<Vec<_>>();

		assert_eq!(names, ["t3_b", "t3_a"]);
		assert_eq!(page.child_count, 3);
		assert!(page.is_saturated(3));
		assert!(!page.is_saturated(100));
	}

	#[test]
	fn parse_reports_the_failing_path() {
		let err = parse_page(br#"{"data":{"children":"nope"}}"#, snapshot())
			.expect_err("Children must be an array.");

		match err {
			Error::Fetch(FetchError::MalformedBody { source }) =>
				assert_eq!(source.path().to_string(), "data.children"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
