//! Password-grant facade over the `oauth2` client plus transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::HeaderValue,
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret, SessionToken},
	error::{ConfigError, CredentialError, TransportError},
	http::{PollHttpClient, ResponseMetadata, ResponseMetadataSlot, UserAgentHandle},
	obs::CycleStage,
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Longest token lifetime honored; longer declarations are shortened to this.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Maps HTTP transport failures into poller [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a poller error.
	fn map_transport_error(
		&self,
		stage: CycleStage,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		stage: CycleStage,
		_metadata: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(stage, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(source) => TransportError::Io { stage, source }.into(),
			HttpClientError::Other(message) => TransportError::Other { stage, message }.into(),
			_ => TransportError::Other { stage, message: "unknown transport failure".into() }.into(),
		}
	}
}

/// Executes the resource-owner password grant against one token endpoint.
pub(crate) struct PasswordFacade<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	user_agent: HeaderValue,
	username: ResourceOwnerUsername,
	password: ResourceOwnerPassword,
}
impl<C, M> PasswordFacade<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_credentials(
		token_endpoint: &str,
		credentials: &Credentials,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(token_endpoint.to_owned())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::BasicAuth);
		let user_agent = HeaderValue::from_str(&credentials.user_agent).map_err(ConfigError::from)?;

		Ok(Self {
			oauth_client,
			http_client,
			error_mapper,
			user_agent,
			username: ResourceOwnerUsername::new(credentials.username.clone()),
			password: ResourceOwnerPassword::new(credentials.password.expose().to_owned()),
		})
	}

	/// Builds a transport handle that records metadata in `slot` and stamps the user agent.
	pub(crate) fn handle(&self, slot: ResponseMetadataSlot) -> UserAgentHandle<C::Handle> {
		UserAgentHandle::new(self.http_client.with_metadata(slot), self.user_agent.clone())
	}

	pub(crate) fn error_mapper(&self) -> &M {
		self.error_mapper.as_ref()
	}

	/// Exchanges the resource-owner credentials for a fresh [`SessionToken`].
	pub(crate) async fn exchange_password(&self) -> Result<SessionToken> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.handle(meta.clone());
		let response = self
			.oauth_client
			.exchange_password(&self.username, &self.password)
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;
		// A zero lifetime yields a token that is stale right after this exchange.
		let lifetime = response
			.expires_in()
			.ok_or(CredentialError::MissingExpiresIn)?
			.min(MAX_TOKEN_LIFETIME);

		Ok(SessionToken::issue(
			Secret::new(response.access_token().secret().to_owned()),
			OffsetDateTime::now_utc(),
			lifetime,
		))
	}
}
/// Token endpoints may answer `200 OK` with an `error` body instead of a token.
#[derive(Deserialize)]
struct ErrorProbe {
	error: serde_json::Value,
}

fn probe_error(body: &[u8]) -> Option<String> {
	let probe = serde_json::from_slice::<ErrorProbe>(body).ok()?;

	match probe.error {
		serde_json::Value::String(error) => Some(error),
		serde_json::Value::Null => None,
		other => Some(other.to_string()),
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(CycleStage::Token, meta.as_ref(), error),
		RequestTokenError::Parse(source, body) => match (probe_error(&body), status) {
			(Some(error), _) => CredentialError::Rejected { error, status }.into(),
			(None, Some(code)) if !(200..300).contains(&code) =>
				CredentialError::Status { status: code }.into(),
			(None, _) => CredentialError::MalformedResponse { source, status }.into(),
		},
		RequestTokenError::Other(message) => CredentialError::Endpoint { message, status }.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let error = match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	CredentialError::Rejected { error, status }.into()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(stage: CycleStage, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { stage }.into();
	}

	TransportError::network(stage, err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::test_credentials, session::DEFAULT_TOKEN_ENDPOINT};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

	#[cfg(feature = "reqwest")]
	fn reqwest_facade(
		credentials: &Credentials,
	) -> Result<PasswordFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>> {
		PasswordFacade::from_credentials(
			DEFAULT_TOKEN_ENDPOINT,
			credentials,
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}

	#[test]
	fn probe_reads_string_and_structured_errors() {
		assert_eq!(probe_error(br#"{"error":"invalid_grant"}"#), Some("invalid_grant".into()));
		assert_eq!(probe_error(br#"{"error":401,"message":"Unauthorized"}"#), Some("401".into()));
		assert_eq!(probe_error(br#"{"access_token":"abc"}"#), None);
		assert_eq!(probe_error(b"<html>"), None);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn builds_basic_auth_client() {
		assert!(reqwest_facade(&test_credentials()).is_ok());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn rejects_user_agents_with_control_characters() {
		let mut credentials = test_credentials();

		credentials.user_agent = "bad\nagent".into();

		let err = reqwest_facade(&credentials)
			.err()
			.expect("User agent with a newline should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidHeader(_))));
	}
}
