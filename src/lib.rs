//! Long-lived poller for paginated, rate-limited REST listings.
//!
//! A [`session::ListingSession`] owns the password-grant credentials and the resumable cursor;
//! [`session::ListingSession::stream`] turns it into an endless, cancellable sequence of new
//! items paced by the server's rate-limit headers and supervised by capped exponential
//! backoff.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod http;
pub mod listing;
pub mod oauth;
pub mod obs;
pub mod session;
pub mod stream;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{
			Method, Response, StatusCode,
			header::{AUTHORIZATION, HeaderName, USER_AGENT},
		},
	};
	use tokio::time::Instant;
	// self
	use crate::{
		auth::Credentials,
		http::{PollHttpClient, ResponseMetadata, ResponseMetadataSlot},
		oauth::TransportErrorMapper,
		obs::CycleStage,
		session::{ListingSession, SessionConfig},
	};

	/// Session type alias backed by the scripted transport.
	pub type ScriptedSession = ListingSession<ScriptedHttpClient, ScriptedTransportErrorMapper>;

	/// Failure produced when the scripted transport is told to fail or runs out of responses.
	#[derive(Debug, ThisError)]
	pub enum ScriptedTransportError {
		/// The script asked for a connection failure.
		#[error("Scripted connection failure.")]
		Refused,
		/// No scripted response remained for the request.
		#[error("Scripted transport has no response left for {method} {uri}.")]
		Exhausted {
			/// HTTP method of the unanswered request.
			method: String,
			/// Target URI of the unanswered request.
			uri: String,
		},
	}

	/// One scripted reply.
	#[derive(Debug)]
	pub enum ScriptedReply {
		/// Answer with the provided response.
		Respond(HttpResponse),
		/// Fail at the transport layer.
		Refuse,
	}

	/// Request observed by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: Method,
		/// Full request URI.
		pub uri: String,
		/// `Authorization` header, if any.
		pub authorization: Option<String>,
		/// `User-Agent` header, if any.
		pub user_agent: Option<String>,
		/// Raw request body.
		pub body: Vec<u8>,
		/// Tokio instant the request was dispatched (honors paused time).
		pub at: Instant,
	}

	#[derive(Debug, Default)]
	struct ScriptedState {
		token_replies: Mutex<VecDeque<ScriptedReply>>,
		listing_replies: Mutex<VecDeque<ScriptedReply>>,
		requests: Mutex<Vec<RecordedRequest>>,
	}

	/// In-memory [`PollHttpClient`] answering `POST`s from the token script and every other
	/// method from the listing script.
	///
	/// When the token script is empty a fresh token valid for one hour is returned; when the
	/// listing script is empty the request fails with [`ScriptedTransportError::Exhausted`].
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient(Arc<ScriptedState>);
	impl ScriptedHttpClient {
		/// Queues a token endpoint reply.
		pub fn push_token(&self, reply: ScriptedReply) -> &Self {
			self.0.token_replies.lock().push_back(reply);

			self
		}

		/// Queues a listing endpoint reply.
		pub fn push_listing(&self, reply: ScriptedReply) -> &Self {
			self.0.listing_replies.lock().push_back(reply);

			self
		}

		/// Returns every request observed so far.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.0.requests.lock().clone()
		}

		/// Returns the requests observed for the given method.
		pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
			self.requests().into_iter().filter(|request| request.method == method).collect()
		}
	}
	impl PollHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHandle;
		type TransportError = ScriptedTransportError;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			ScriptedHandle { state: self.0.clone(), slot }
		}
	}

	/// Handle returned by [`ScriptedHttpClient`].
	#[derive(Debug)]
	pub struct ScriptedHandle {
		state: Arc<ScriptedState>,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<ScriptedTransportError>;
		type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			let state = self.state.clone();
			let slot = self.slot.clone();

			Box::pin(async move {
				slot.take();

				let header = |name: HeaderName| {
					request
						.headers()
						.get(name)
						.and_then(|value| value.to_str().ok())
						.map(ToOwned::to_owned)
				};
				let recorded = RecordedRequest {
					method: request.method().clone(),
					uri: request.uri().to_string(),
					authorization: header(AUTHORIZATION),
					user_agent: header(USER_AGENT),
					body: request.body().clone(),
					at: Instant::now(),
				};

				state.requests.lock().push(recorded);

				let reply = if *request.method() == Method::POST {
					Some(state.token_replies.lock().pop_front().unwrap_or_else(|| {
						ScriptedReply::Respond(token_response(
							"scripted-token",
							3_600,
						))
					}))
				} else {
					state.listing_replies.lock().pop_front()
				};

				match reply {
					Some(ScriptedReply::Respond(response)) => {
						slot.store(ResponseMetadata {
							status: Some(response.status().as_u16()),
							retry_after: None,
						});

						Ok(response)
					},
					Some(ScriptedReply::Refuse) =>
						Err(HttpClientError::Reqwest(Box::new(ScriptedTransportError::Refused))),
					None => Err(HttpClientError::Reqwest(Box::new(
						ScriptedTransportError::Exhausted {
							method: request.method().to_string(),
							uri: request.uri().to_string(),
						},
					))),
				}
			})
		}
	}

	/// Maps scripted transport failures into [`crate::error::TransportError`].
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransportErrorMapper;
	impl TransportErrorMapper<ScriptedTransportError> for ScriptedTransportErrorMapper {
		fn map_transport_error(
			&self,
			stage: CycleStage,
			_metadata: Option<&ResponseMetadata>,
			error: HttpClientError<ScriptedTransportError>,
		) -> Error {
			match error {
				HttpClientError::Reqwest(inner) =>
					crate::error::TransportError::network(stage, *inner).into(),
				other => crate::error::TransportError::Other {
					stage,
					message: format!("{other:?}"),
				}
				.into(),
			}
		}
	}

	/// Credentials used across tests.
	pub fn test_credentials() -> Credentials {
		Credentials::new("poller-user", "poller-pass", "poller-client", "poller-secret", "poller/1.0")
	}

	/// Builds a session backed by a fresh scripted transport.
	pub fn scripted_session(config: SessionConfig) -> (ScriptedSession, ScriptedHttpClient) {
		let http_client = ScriptedHttpClient::default();
		let session = ScriptedSession::with_http_client(
			test_credentials(),
			config,
			http_client.clone(),
			ScriptedTransportErrorMapper,
		)
		.expect("Scripted session should build.");

		(session, http_client)
	}

	/// JSON token response with the provided access token and lifetime.
	pub fn token_response(access_token: &str, expires_in: u64) -> HttpResponse {
		json_response(
			StatusCode::OK,
			&[],
			&format!(
				"{{\"access_token\":\"{access_token}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in},\"scope\":\"*\"}}"
			),
		)
	}

	/// Listing response built from `(kind, id)` pairs with the provided rate-limit headers.
	pub fn listing_response(
		children: &[(&str, &str)],
		used: &str,
		remaining: &str,
		reset: &str,
	) -> HttpResponse {
		let children = children
			.iter()
			.map(|(kind, id)| {
				format!(
					"{{\"kind\":\"{kind}\",\"data\":{{\"id\":\"{id}\",\"name\":\"{kind}_{id}\",\"title\":\"item {id}\"}}}}"
				)
			})
			.collect::<Vec<_>>()
			.join(",");

		json_response(
			StatusCode::OK,
			&[
				("x-ratelimit-used", used),
				("x-ratelimit-remaining", remaining),
				("x-ratelimit-reset", reset),
			],
			&format!("{{\"kind\":\"Listing\",\"data\":{{\"children\":[{children}]}}}}"),
		)
	}

	/// JSON response with the provided status, extra headers, and body.
	pub fn json_response(status: StatusCode, headers: &[(&str, &str)], body: &str) -> HttpResponse {
		let mut builder = Response::builder().status(status).header("content-type", "application/json");

		for (name, value) in headers {
			builder = builder.header(*name, *value);
		}

		builder.body(body.as_bytes().to_vec()).expect("Failed to build scripted HTTP response.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use httpmock as _;
