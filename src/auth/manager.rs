//! Lazily refreshed bearer credentials for one polling session.

// self
use crate::{
	_prelude::*,
	auth::{Secret, SessionToken},
	http::PollHttpClient,
	oauth::{PasswordFacade, TransportErrorMapper},
	obs::{self, CycleOutcome, CycleStage},
};

/// Owns the session's bearer token and refreshes it through the password grant on demand.
///
/// The manager is the only holder of the access token. An unset token is always treated as
/// expired, so the first call to [`CredentialManager::ensure_valid_token`] performs an exchange.
pub struct CredentialManager<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	facade: PasswordFacade<C, M>,
	token: Option<SessionToken>,
}
impl<C, M> CredentialManager<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(facade: PasswordFacade<C, M>) -> Self {
		Self { facade, token: None }
	}

	pub(crate) fn facade(&self) -> &PasswordFacade<C, M> {
		&self.facade
	}

	/// Returns `true` when a token is held and its refresh deadline has not passed.
	pub fn is_token_valid(&self) -> bool {
		self.token.as_ref().is_some_and(SessionToken::is_valid)
	}

	/// Returns the refresh deadline of the held token, if any.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.token.as_ref().map(|token| token.expires_at)
	}

	/// Guarantees a non-expired token, exchanging credentials when the held one is unset or stale.
	pub async fn ensure_valid_token(&mut self) -> Result<Secret> {
		if let Some(token) = self.token.as_ref().filter(|token| token.is_valid()) {
			return Ok(token.access_token.clone());
		}

		obs::record_cycle_outcome(CycleStage::Token, CycleOutcome::Attempt);

		match self.facade.exchange_password().await {
			Ok(token) => {
				obs::record_cycle_outcome(CycleStage::Token, CycleOutcome::Success);

				let lifetime = (token.expires_at - OffsetDateTime::now_utc())
					.try_into()
					.unwrap_or(Duration::ZERO);

				obs::log_token_refreshed(token.expires_at, lifetime);

				let access_token = token.access_token.clone();

				self.token = Some(token);

				Ok(access_token)
			},
			Err(e) => {
				obs::record_cycle_outcome(CycleStage::Token, CycleOutcome::Failure);

				Err(e)
			},
		}
	}

	/// Drops the held token so the next call re-authenticates.
	pub fn reset(&mut self) {
		self.token = None;
	}
}
impl<C, M> Debug for CredentialManager<C, M>
where
	C: ?Sized + PollHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialManager").field("token", &self.token).finish()
	}
}
