//! Explicit per-session context: credentials, cursor state, and configuration.

// self
use crate::{
	_prelude::*,
	auth::{CredentialManager, Credentials},
	http::PollHttpClient,
	listing::{self, ListingPage, ListingRequest},
	oauth::{PasswordFacade, TransportErrorMapper},
	stream::{CursorTracker, DEFAULT_RECENT_CAPACITY, ListingStream, StreamOptions},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Default password-grant token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.reddit.com/api/v1/access_token";

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport stack.
pub type ReqwestListingSession = ListingSession<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Session-wide settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	/// Password-grant token endpoint; validated when the session is built.
	pub token_endpoint: String,
	/// Promotes rate-limit and pacing diagnostics from `debug` to `info`.
	pub verbose_logging: bool,
	/// Number of fullnames remembered for duplicate suppression.
	pub recent_capacity: usize,
}
impl SessionConfig {
	/// Overrides the token endpoint.
	pub fn with_token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
		self.token_endpoint = token_endpoint.into();

		self
	}

	/// Enables or disables verbose diagnostics.
	pub fn with_verbose_logging(mut self, verbose_logging: bool) -> Self {
		self.verbose_logging = verbose_logging;

		self
	}

	/// Overrides the recently-seen cache capacity; zero is raised to one.
	pub fn with_recent_capacity(mut self, recent_capacity: usize) -> Self {
		self.recent_capacity = recent_capacity.max(1);

		self
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			token_endpoint: DEFAULT_TOKEN_ENDPOINT.into(),
			verbose_logging: false,
			recent_capacity: DEFAULT_RECENT_CAPACITY,
		}
	}
}

/// Context object owning everything one polling session mutates.
///
/// The session holds the credential manager, the `before` cursor with its recently-seen
/// cache, and the configuration. Streams borrow it mutably, so state survives across
/// consecutive streams and is cleared only by [`ListingSession::reset`].
pub struct ListingSession<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) credentials: CredentialManager<C, M>,
	pub(crate) tracker: CursorTracker,
	pub(crate) config: SessionConfig,
}
impl<C, M> ListingSession<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a session that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		credentials: Credentials,
		config: SessionConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let facade = PasswordFacade::from_credentials(
			&config.token_endpoint,
			&credentials,
			http_client.into(),
			mapper.into(),
		)?;

		Ok(Self {
			credentials: CredentialManager::new(facade),
			tracker: CursorTracker::new(config.recent_capacity),
			config,
		})
	}

	/// Starts an endless stream of new items from `url`.
	pub fn stream(&mut self, url: Url, options: StreamOptions) -> ListingStream<'_, C, M> {
		ListingStream::new(self, url, options)
	}

	/// Fetches one raw page without touching the cursor or the recently-seen cache.
	pub async fn fetch_listing(&mut self, request: &ListingRequest) -> Result<ListingPage> {
		listing::fetch_page(&mut self.credentials, request, self.config.verbose_logging).await
	}

	/// Clears the token, its expiry, the cursor, and the recently-seen cache together.
	pub fn reset(&mut self) {
		self.credentials.reset();
		self.tracker.reset();
	}

	/// Returns `true` when the held token has not reached its refresh deadline.
	pub fn is_token_valid(&self) -> bool {
		self.credentials.is_token_valid()
	}

	/// Current `before` cursor.
	pub fn cursor(&self) -> Option<&str> {
		self.tracker.cursor()
	}

	/// Session configuration.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Credential manager backing this session.
	pub fn credentials(&self) -> &CredentialManager<C, M> {
		&self.credentials
	}

	#[cfg(test)]
	pub(crate) fn credentials_mut(&mut self) -> &mut CredentialManager<C, M> {
		&mut self.credentials
	}
}
#[cfg(feature = "reqwest")]
impl ListingSession<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a session backed by a default reqwest client.
	pub fn new(credentials: Credentials, config: SessionConfig) -> Result<Self> {
		Self::with_http_client(
			credentials,
			config,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for ListingSession<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ListingSession")
			.field("config", &self.config)
			.field("credentials", &self.credentials)
			.field("cursor", &self.tracker.cursor())
			.finish()
	}
}
