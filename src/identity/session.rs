//! Identity session produced by a completed sign-in.

// self
// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Session established by the identity provider.
///
/// Lives only between the provider's return and the backend hand-off; the relay never persists
/// it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySession {
	/// Provider label (`google`).
	pub provider: String,
	/// Provider access token.
	pub access_token: TokenSecret,
	/// Provider refresh token, present when offline access was granted.
	pub refresh_token: Option<TokenSecret>,
	/// Access token lifetime in seconds as reported by the provider.
	pub expires_in: i64,
	/// Token type (usually `Bearer`).
	pub token_type: String,
	/// Scopes granted by the provider.
	pub scope: ScopeSet,
	/// Profile of the signed-in account.
	pub profile: IdentityProfile,
	/// When the session was established.
	#[serde(with = "time::serde::rfc3339")]
	pub established_at: OffsetDateTime,
}
impl IdentitySession {
	/// Instant at which the access token stops being valid.
	///
	/// Saturates at the latest representable instant; a negative lifetime counts as zero.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.established_at
			.checked_add(Duration::seconds(self.expires_in.max(0)))
			.unwrap_or(PrimitiveDateTime::MAX.assume_utc())
	}
}

/// Profile of the signed-in account, in the shape of Google's userinfo response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
	/// Stable account identifier.
	#[serde(alias = "sub")]
	pub id: String,
	/// Primary email address.
	#[serde(default)]
	pub email: Option<String>,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Avatar URL.
	#[serde(default)]
	pub picture: Option<String>,
	/// Whether the provider verified the email address.
	#[serde(default, alias = "email_verified")]
	pub verified_email: bool,
	/// Preferred locale.
	#[serde(default)]
	pub locale: Option<String>,
	/// Hosted domain (Workspace accounts only).
	#[serde(default)]
	pub hd: Option<String>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn profile_accepts_userinfo_v2_and_openid_shapes() {
		let v2: IdentityProfile = serde_json::from_str(
			r#"{"id":"1089","email":"ada@example.com","verified_email":true,"name":"Ada"}"#,
		)
		.expect("Userinfo v2 payload should parse.");
		let openid: IdentityProfile =
			serde_json::from_str(r#"{"sub":"1089","email_verified":true,"hd":"example.com"}"#)
				.expect("OpenID userinfo payload should parse.");

		assert_eq!(v2.id, "1089");
		assert!(v2.verified_email);
		assert_eq!(openid.id, "1089");
		assert!(openid.verified_email);
		assert_eq!(openid.hd.as_deref(), Some("example.com"));
	}

	fn session(expires_in: i64) -> IdentitySession {
		IdentitySession {
			provider: "google".into(),
			access_token: TokenSecret::new("ya29"),
			refresh_token: None,
			expires_in,
			token_type: "Bearer".into(),
			scope: ScopeSet::default(),
			profile: IdentityProfile::default(),
			established_at: time::macros::datetime!(2024-05-01 12:00 UTC),
		}
	}

	#[test]
	fn expires_at_adds_lifetime() {
		let session = session(3_599);

		assert_eq!(session.expires_at(), time::macros::datetime!(2024-05-01 12:59:59 UTC));
		assert!(!format!("{session:?}").contains("ya29"));
	}

	#[test]
	fn expires_at_saturates_on_absurd_lifetimes() {
		assert_eq!(session(i64::MAX).expires_at(), PrimitiveDateTime::MAX.assume_utc());
		assert_eq!(session(-30).expires_at(), time::macros::datetime!(2024-05-01 12:00 UTC));
	}
}
