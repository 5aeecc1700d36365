//! Google implementation of [`IdentityLayer`]: Authorization Code + PKCE against Google's
//! OAuth 2.0 endpoints, followed by a userinfo lookup.

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, HttpClientError,
	PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse, BasicTokenType},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	http::{ReqwestHttpClient, StatusSlot},
	identity::{
		CallbackParams, IdentityEndpoints, IdentityError, IdentityFuture, IdentityLayer,
		IdentityProfile, IdentitySession, SignInOptions,
		pkce::{self, CHALLENGE_METHOD_S256, PkcePair},
	},
};

/// Provider label carried in [`IdentitySession::provider`].
pub const GOOGLE_PROVIDER: &str = "google";

const DEFAULT_HANDSHAKE_TTL: Duration = Duration::minutes(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);

#[derive(Clone, Debug)]
struct Handshake {
	pkce: PkcePair,
	redirect_uri: Url,
	scopes: ScopeSet,
	started_at: OffsetDateTime,
}

/// Google sign-in via Authorization Code + PKCE (S256).
///
/// Each [`IdentityLayer::sign_in`] parks a single-use handshake keyed by the generated `state`.
/// The matching [`IdentityLayer::session`] consumes it, so a replayed provider redirect yields
/// no session.
#[derive(Clone)]
pub struct GoogleIdentity {
	endpoints: IdentityEndpoints,
	client_id: String,
	client_secret: Option<String>,
	http_client: ReqwestHttpClient,
	handshakes: Arc<Mutex<HashMap<String, Handshake>>>,
	handshake_ttl: Duration,
	request_timeout: Duration,
}
impl GoogleIdentity {
	/// Creates a Google identity layer for the provided OAuth client.
	pub fn new(endpoints: IdentityEndpoints, client_id: impl Into<String>) -> Self {
		Self {
			endpoints,
			client_id: client_id.into(),
			client_secret: None,
			http_client: ReqwestHttpClient::default(),
			handshakes: Default::default(),
			handshake_ttl: DEFAULT_HANDSHAKE_TTL,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Sends the client secret in the token request body (web application clients).
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Reuses an existing HTTP client.
	pub fn with_http_client(mut self, client: ReqwestHttpClient) -> Self {
		self.http_client = client;

		self
	}

	/// Overrides how long an unanswered handshake stays redeemable (defaults to 10 minutes).
	pub fn with_handshake_ttl(mut self, ttl: Duration) -> Self {
		self.handshake_ttl = ttl;

		self
	}

	/// Overrides the userinfo request timeout (defaults to 10 seconds).
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Number of handshakes still waiting for the provider's return.
	pub fn pending_handshakes(&self) -> usize {
		self.handshakes.lock().len()
	}

	fn park_handshake(&self, state: String, handshake: Handshake) {
		let now = OffsetDateTime::now_utc();
		let ttl = self.handshake_ttl;
		let mut handshakes = self.handshakes.lock();

		handshakes.retain(|_, parked| now - parked.started_at < ttl);
		handshakes.insert(state, handshake);
	}

	fn take_handshake(&self, state: &str) -> Option<Handshake> {
		let handshake = self.handshakes.lock().remove(state)?;

		if OffsetDateTime::now_utc() - handshake.started_at >= self.handshake_ttl {
			return None;
		}

		Some(handshake)
	}

	fn authorize_url(&self, options: &SignInOptions, state: &str, pkce: &PkcePair) -> Url {
		let mut url = self.endpoints.authorization.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("response_type", "code")
				.append_pair("client_id", &self.client_id)
				.append_pair("redirect_uri", options.return_to.as_str())
				.append_pair("scope", &options.scopes.normalized())
				.append_pair("state", state)
				.append_pair("code_challenge", pkce.challenge())
				.append_pair("code_challenge_method", CHALLENGE_METHOD_S256);

			if options.offline_access {
				pairs.append_pair("access_type", "offline");
			}
			if options.force_consent {
				pairs.append_pair("prompt", "consent");
			}
			if let Some(hint) = &options.login_hint {
				pairs.append_pair("login_hint", hint);
			}
		}

		url
	}

	async fn exchange_code(
		&self,
		code: &str,
		handshake: &Handshake,
	) -> Result<BasicTokenResponse, IdentityError> {
		let mut client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_auth_uri(AuthUrl::from_url(self.endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(self.endpoints.token.clone()))
			.set_redirect_uri(RedirectUrl::from_url(handshake.redirect_uri.clone()))
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = &self.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.clone()));
		}

		let (handle, status) = self.http_client.oauth_handle(self.request_timeout);

		client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(handshake.pkce.verifier().to_owned()))
			.request_async(&handle)
			.await
			.map_err(|e| map_exchange_error(e, &status))
	}

	async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
		let response = self
			.http_client
			.get_with_bearer(self.endpoints.userinfo.clone(), access_token, self.request_timeout)
			.await
			.map_err(IdentityError::transport)?;

		if !response.is_success() {
			return Err(IdentityError::Rejected {
				message: response.error_message(),
				status: Some(response.status),
			});
		}

		response
			.json()
			.map_err(|source| IdentityError::Parse { source, status: Some(response.status) })
	}
}
impl IdentityLayer for GoogleIdentity {
	fn sign_in<'a>(&'a self, options: &'a SignInOptions) -> IdentityFuture<'a, Url> {
		Box::pin(async move {
			if options.scopes.is_empty() {
				return Err(IdentityError::Misconfigured {
					reason: "at least one scope must be requested".into(),
				});
			}

			let state = pkce::random_state();
			let pkce = PkcePair::generate();
			let url = self.authorize_url(options, &state, &pkce);

			self.park_handshake(
				state,
				Handshake {
					pkce,
					redirect_uri: options.return_to.clone(),
					scopes: options.scopes.clone(),
					started_at: OffsetDateTime::now_utc(),
				},
			);

			Ok(url)
		})
	}

	fn session<'a>(
		&'a self,
		callback: &'a CallbackParams,
	) -> IdentityFuture<'a, Option<IdentitySession>> {
		Box::pin(async move {
			let Some(state) = callback.state.as_deref() else {
				return Ok(None);
			};
			// The handshake is single-use, even when the provider reports an error.
			let Some(handshake) = self.take_handshake(state) else {
				return Ok(None);
			};

			if callback.error.is_some() {
				return Ok(None);
			}

			let Some(code) = callback.code.as_deref().filter(|code| !code.is_empty()) else {
				return Ok(None);
			};
			let token = self.exchange_code(code, &handshake).await?;
			let profile = self.fetch_profile(token.access_token().secret()).await?;
			let scope = token
				.scopes()
				.and_then(|scopes| ScopeSet::new(scopes.iter().map(|s| s.as_str())).ok())
				.unwrap_or(handshake.scopes);
			let expires_in = token
				.expires_in()
				.map(|lifetime| i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX))
				.unwrap_or_default();
			let token_type = match token.token_type() {
				BasicTokenType::Bearer => "Bearer".to_owned(),
				other => other.as_ref().to_owned(),
			};

			Ok(Some(IdentitySession {
				provider: GOOGLE_PROVIDER.into(),
				access_token: TokenSecret::new(token.access_token().secret().clone()),
				refresh_token: token.refresh_token().map(|t| TokenSecret::new(t.secret().clone())),
				expires_in,
				token_type,
				scope,
				profile,
				established_at: OffsetDateTime::now_utc(),
			}))
		})
	}
}
impl Debug for GoogleIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GoogleIdentity")
			.field("endpoints", &self.endpoints)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("pending_handshakes", &self.pending_handshakes())
			.finish()
	}
}

fn map_exchange_error(
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
	status: &StatusSlot,
) -> IdentityError {
	let status = status.take();

	match err {
		RequestTokenError::ServerResponse(response) => IdentityError::Rejected {
			message: response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned()),
			status,
		},
		RequestTokenError::Request(e) => IdentityError::transport(e),
		RequestTokenError::Parse(source, _body) => IdentityError::Parse { source, status },
		RequestTokenError::Other(message) => IdentityError::Rejected { message, status },
	}
}
