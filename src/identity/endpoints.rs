//! Identity provider endpoint set.

// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, config::parse_http_url, error::ConfigError};

/// Google's OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Google's OpenID userinfo endpoint.
pub const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Endpoints used by an OAuth 2.0 identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEndpoints {
	/// Authorization endpoint the user is sent to.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Userinfo endpoint queried with the fresh access token.
	pub userinfo: Url,
}
impl IdentityEndpoints {
	/// Validates and assembles an endpoint set.
	///
	/// Every endpoint must use HTTPS unless it points at a loopback host.
	pub fn new(authorization: &str, token: &str, userinfo: &str) -> Result<Self, ConfigError> {
		Ok(Self {
			authorization: secure_url("authorization", authorization)?,
			token: secure_url("token", token)?,
			userinfo: secure_url("userinfo", userinfo)?,
		})
	}

	/// Google's production endpoints.
	pub fn google() -> Result<Self, ConfigError> {
		Self::new(GOOGLE_AUTHORIZATION_ENDPOINT, GOOGLE_TOKEN_ENDPOINT, GOOGLE_USERINFO_ENDPOINT)
	}
}

fn secure_url(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = parse_http_url(endpoint, raw)?;

	if url.scheme() != "https" && !is_loopback(&url) {
		return Err(ConfigError::InsecureEndpoint { endpoint, url: raw.to_owned() });
	}

	Ok(url)
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}
