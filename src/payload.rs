//! Body of the backend callback POST.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	identity::{IdentityProfile, IdentitySession},
};

/// Snapshot of the user's client environment at callback time.
///
/// On a server these values come from request headers or front-end hints; every field except
/// the timestamp is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
	/// When the snapshot was taken.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// `User-Agent` of the browser.
	pub user_agent: Option<String>,
	/// Screen resolution as `{width}x{height}`.
	pub screen_resolution: Option<String>,
	/// IANA timezone name.
	pub timezone: Option<String>,
	/// Preferred locale (BCP 47).
	pub locale: Option<String>,
	/// Referring page.
	pub referrer: Option<String>,
}
impl ClientMetadata {
	/// Creates a snapshot stamped with the current time.
	pub fn new() -> Self {
		Self::at(OffsetDateTime::now_utc())
	}

	/// Creates a snapshot stamped with the provided time.
	pub fn at(timestamp: OffsetDateTime) -> Self {
		Self {
			timestamp,
			user_agent: None,
			screen_resolution: None,
			timezone: None,
			locale: None,
			referrer: None,
		}
	}

	/// Sets the user agent.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Sets the screen resolution from its dimensions.
	pub fn with_screen_resolution(mut self, width: u32, height: u32) -> Self {
		self.screen_resolution = Some(format!("{width}x{height}"));

		self
	}

	/// Sets the timezone name.
	pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
		self.timezone = Some(timezone.into());

		self
	}

	/// Sets the locale.
	pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());

		self
	}

	/// Sets the referrer.
	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = Some(referrer.into());

		self
	}
}
impl Default for ClientMetadata {
	fn default() -> Self {
		Self::new()
	}
}

/// Summary of the established identity session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
	/// Identity provider label.
	pub provider: String,
	/// Provider subject id.
	pub user_id: String,
	/// Account email, if shared.
	pub email: Option<String>,
	/// When the session was established.
	#[serde(with = "time::serde::rfc3339")]
	pub established_at: OffsetDateTime,
	/// When the provider access token expires.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}

/// Provider credentials forwarded to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCredentials {
	/// Access token.
	pub access_token: TokenSecret,
	/// Refresh token, when offline access was granted.
	pub refresh_token: Option<TokenSecret>,
	/// Access token lifetime in seconds.
	pub expires_in: i64,
	/// Token type.
	pub token_type: String,
	/// Granted scopes, space-delimited on the wire.
	pub scope: ScopeSet,
}

/// Payload POSTed to the backend's callback endpoint.
///
/// Write-once: assembled from the identity session and client metadata, serialized for a single
/// request, and dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedCallbackPayload {
	/// Session summary.
	pub session: SessionSummary,
	/// Provider credentials.
	pub google_credentials: GoogleCredentials,
	/// Provider profile.
	pub google_profile: IdentityProfile,
	/// Client environment snapshot.
	pub client_metadata: ClientMetadata,
}
impl EnrichedCallbackPayload {
	/// Combines an identity session with the client metadata snapshot.
	pub fn assemble(session: &IdentitySession, client_metadata: ClientMetadata) -> Self {
		Self {
			session: SessionSummary {
				provider: session.provider.clone(),
				user_id: session.profile.id.clone(),
				email: session.profile.email.clone(),
				established_at: session.established_at,
				expires_at: session.expires_at(),
			},
			google_credentials: GoogleCredentials {
				access_token: session.access_token.clone(),
				refresh_token: session.refresh_token.clone(),
				expires_in: session.expires_in,
				token_type: session.token_type.clone(),
				scope: session.scope.clone(),
			},
			google_profile: session.profile.clone(),
			client_metadata,
		}
	}
}
