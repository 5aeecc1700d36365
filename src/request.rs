//! Request Capture: extracts and validates the downstream client's authorize request.

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, config::RedirectPolicy};

/// The only `response_type` the relay accepts.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Inbound authorization request from the downstream client.
///
/// Values are kept verbatim (standard query decoding only). A parameter present with an empty
/// value is kept as `Some("")` for the optional fields; [`AuthorizationRequest::query_pairs`]
/// never echoes empty values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	/// Downstream client identifier.
	pub client_id: String,
	/// Where the client expects the user to land after the flow.
	pub redirect_uri: String,
	/// Must equal [`RESPONSE_TYPE_CODE`].
	pub response_type: String,
	/// Opaque client state echoed back to the backend.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
	/// PKCE challenge supplied by the client.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code_challenge: Option<String>,
	/// PKCE challenge method supplied by the client.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code_challenge_method: Option<String>,
	/// Requested scope; [`AuthorizationRequest::DEFAULT_SCOPE`] applies when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
}
impl AuthorizationRequest {
	/// Scope implied when the client omits `scope`.
	pub const DEFAULT_SCOPE: &str = "read";

	/// Extracts the seven request fields from a raw query string (leading `?` optional).
	///
	/// The first occurrence of a repeated parameter wins. No validation happens here.
	pub fn from_query(query: &str) -> Self {
		let query = query.strip_prefix('?').unwrap_or(query);
		let mut request = Self::default();
		let mut seen = Vec::with_capacity(7);

		for (name, value) in form_urlencoded::parse(query.as_bytes()) {
			if seen.contains(&name) {
				continue;
			}

			let value = value.into_owned();

			match name.as_ref() {
				"client_id" => request.client_id = value,
				"redirect_uri" => request.redirect_uri = value,
				"response_type" => request.response_type = value,
				"state" => request.state = Some(value),
				"code_challenge" => request.code_challenge = Some(value),
				"code_challenge_method" => request.code_challenge_method = Some(value),
				"scope" => request.scope = Some(value),
				_ => continue,
			}

			seen.push(name);
		}

		request
	}

	/// Returns `true` iff `client_id` and `redirect_uri` are non-empty and the request asks for
	/// an authorization code.
	pub fn is_valid(&self) -> bool {
		!self.client_id.is_empty()
			&& !self.redirect_uri.is_empty()
			&& self.response_type == RESPONSE_TYPE_CODE
	}

	/// Scope to display or assume when the client did not send one.
	pub fn effective_scope(&self) -> &str {
		match self.scope.as_deref() {
			Some(scope) if !scope.is_empty() => scope,
			_ => Self::DEFAULT_SCOPE,
		}
	}

	/// Every non-empty field as `(name, value)`, in declaration order.
	pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
		let fields = [
			("client_id", Some(self.client_id.as_str())),
			("redirect_uri", Some(self.redirect_uri.as_str())),
			("response_type", Some(self.response_type.as_str())),
			("state", self.state.as_deref()),
			("code_challenge", self.code_challenge.as_deref()),
			("code_challenge_method", self.code_challenge_method.as_deref()),
			("scope", self.scope.as_deref()),
		];

		fields
			.into_iter()
			.filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
			.collect()
	}
}

/// Parses and validates an authorize query string.
///
/// Invalid requests yield [`Error::MalformedRequest`]; a `redirect_uri` the policy refuses
/// yields [`Error::RedirectNotAllowed`]. Nothing is retained on failure.
pub fn capture(query: &str, policy: &RedirectPolicy) -> Result<AuthorizationRequest> {
	let request = AuthorizationRequest::from_query(query);

	if !request.is_valid() {
		return Err(Error::MalformedRequest);
	}
	if !policy.permits(&request.redirect_uri) {
		return Err(Error::RedirectNotAllowed { redirect_uri: request.redirect_uri });
	}

	Ok(request)
}
