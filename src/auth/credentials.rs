//! Immutable script-app credentials supplied at construction.

// self
use crate::{_prelude::*, auth::Secret};

/// Resource-owner and client credentials used for the password grant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
	/// Resource-owner username.
	pub username: String,
	/// Resource-owner password.
	pub password: Secret,
	/// OAuth client identifier (HTTP Basic username).
	pub client_id: String,
	/// OAuth client secret (HTTP Basic password).
	pub client_secret: Secret,
	/// `User-Agent` sent with every token and listing request.
	pub user_agent: String,
}
impl Credentials {
	/// Creates credentials from their raw parts.
	pub fn new(
		username: impl Into<String>,
		password: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		user_agent: impl Into<String>,
	) -> Self {
		Self {
			username: username.into(),
			password: Secret::new(password),
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			user_agent: user_agent.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_redacts_secrets() {
		let credentials = Credentials::new("alice", "hunter2", "cid", "csecret", "poller/1.0");
		let rendered = format!("{credentials:?}");

		assert!(rendered.contains("alice"));
		assert!(rendered.contains("poller/1.0"));
		assert!(!rendered.contains("hunter2"));
		assert!(!rendered.contains("csecret"));
	}
}
