//! Poller-level error types shared by the credential manager, listing fetcher, and stream.

// self
use crate::{_prelude::*, obs::CycleStage};

/// Poller-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical poller error exposed by public APIs.
///
/// Every variant is retryable from the stream's point of view; [`crate::stream::ListingStream`]
/// logs it and sleeps the current backoff delay instead of surfacing it to the consumer.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token endpoint refused or failed the password grant.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Listing endpoint returned an unusable response.
	#[error(transparent)]
	Fetch(#[from] FetchError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns a stable label suitable for log fields and metric labels.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Credential(_) => "credential",
			Self::Fetch(_) => "fetch",
			Self::Transport(_) => "transport",
			Self::Config(_) => "config",
		}
	}
}

/// Failures raised while obtaining a bearer token.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Token endpoint answered with an OAuth `error` field.
	#[error("Token endpoint rejected the password grant: {error}.")]
	Rejected {
		/// Provider-supplied error code or description.
		error: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered with a non-success status and no readable error.
	#[error("Could not retrieve access token: status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint answered with JSON that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint responded in a way the OAuth client could not classify.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Failures raised while fetching a listing page.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// Listing endpoint returned a non-success status.
	#[error("Could not retrieve page listing: status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Listing body could not be parsed.
	#[error("Listing endpoint returned a malformed body.")]
	MalformedBody {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// A rate-limit header was absent.
	#[error("Listing response is missing the {header} header.")]
	MissingRateLimitHeader {
		/// Header name.
		header: &'static str,
	},
	/// A rate-limit header did not hold a non-negative number.
	#[error("Listing response carries a malformed {header} header: {value:?}.")]
	MalformedRateLimitHeader {
		/// Header name.
		header: &'static str,
		/// Raw header value.
		value: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred during the {stage} stage.")]
	Network {
		/// Cycle stage that issued the request.
		stage: CycleStage,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client timed out.
	#[error("Request timed out during the {stage} stage.")]
	Timeout {
		/// Cycle stage that issued the request.
		stage: CycleStage,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during the {stage} stage.")]
	Io {
		/// Cycle stage that issued the request.
		stage: CycleStage,
		/// IO failure.
		#[source]
		source: std::io::Error,
	},
	/// HTTP client reported a failure without a structured error.
	#[error("HTTP client error occurred during the {stage} stage: {message}.")]
	Other {
		/// Cycle stage that issued the request.
		stage: CycleStage,
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(stage: CycleStage, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { stage, source: Box::new(src) }
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A header value (user agent or bearer token) contains forbidden characters.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_are_stable_labels() {
		let credential: Error = CredentialError::MissingExpiresIn.into();
		let fetch: Error = FetchError::MissingRateLimitHeader { header: "X-Ratelimit-Used" }.into();
		let transport: Error = TransportError::Timeout { stage: CycleStage::Fetch }.into();

		assert_eq!(credential.kind(), "credential");
		assert_eq!(fetch.kind(), "fetch");
		assert_eq!(transport.kind(), "transport");
	}

	#[test]
	fn messages_name_the_failing_header_and_stage() {
		let err = FetchError::MalformedRateLimitHeader {
			header: "X-Ratelimit-Remaining",
			value: "lots".into(),
		};

		assert_eq!(
			err.to_string(),
			"Listing response carries a malformed X-Ratelimit-Remaining header: \"lots\"."
		);

		let err = TransportError::Timeout { stage: CycleStage::Token };

		assert_eq!(err.to_string(), "Request timed out during the token stage.");
	}
}
