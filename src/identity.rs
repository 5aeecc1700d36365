//! Identity Delegate Adapter: the boundary to the external identity provider.
//!
//! [`IdentityLayer`] has two halves. [`IdentityLayer::sign_in`] starts the external leg and
//! returns the provider URL the user must be sent to; [`IdentityLayer::session`] runs when the
//! provider redirects back and yields the established [`IdentitySession`], if any.
//! [`GoogleIdentity`] is the built-in implementation.

pub mod endpoints;
pub mod google;
pub mod pkce;
pub mod session;

pub use endpoints::*;
pub use google::*;
pub use session::*;

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::ScopeSet};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by [`IdentityLayer`] operations.
pub type IdentityFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, IdentityError>> + 'a + Send>>;

/// External identity provider contract.
pub trait IdentityLayer
where
	Self: Send + Sync,
{
	/// Starts a sign-in and returns the provider URL to navigate to.
	fn sign_in<'a>(&'a self, options: &'a SignInOptions) -> IdentityFuture<'a, Url>;

	/// Resolves the provider's return into an established session.
	///
	/// `Ok(None)` means the provider did not establish a session (user denied consent, unknown or
	/// replayed handshake). Errors are reserved for provider or transport failures.
	fn session<'a>(
		&'a self,
		callback: &'a CallbackParams,
	) -> IdentityFuture<'a, Option<IdentitySession>>;
}

/// Parameters of a sign-in request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignInOptions {
	/// Callback entry point the provider must return to.
	pub return_to: Url,
	/// Scopes to request.
	pub scopes: ScopeSet,
	/// Ask for a refresh token (`access_type=offline`).
	pub offline_access: bool,
	/// Force the consent screen (`prompt=consent`) so repeat logins still get a refresh token.
	pub force_consent: bool,
	/// Optional account hint.
	pub login_hint: Option<String>,
}
impl SignInOptions {
	/// Creates options with offline access and forced consent enabled.
	pub fn new(return_to: Url, scopes: ScopeSet) -> Self {
		Self { return_to, scopes, offline_access: true, force_consent: true, login_hint: None }
	}

	/// Adds a login hint (typically an email address).
	pub fn with_login_hint(mut self, hint: impl Into<String>) -> Self {
		self.login_hint = Some(hint.into());

		self
	}
}

/// Query parameters the provider appends when redirecting back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// Handshake state echoed by the provider.
	pub state: Option<String>,
	/// OAuth error code (e.g. `access_denied`).
	pub error: Option<String>,
	/// OAuth error description.
	pub error_description: Option<String>,
}
impl CallbackParams {
	/// Extracts the callback parameters from a raw query string (leading `?` optional).
	pub fn from_query(query: &str) -> Self {
		let query = query.strip_prefix('?').unwrap_or(query);
		let mut params = Self::default();

		for (name, value) in form_urlencoded::parse(query.as_bytes()) {
			let slot = match name.as_ref() {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_description" => &mut params.error_description,
				_ => continue,
			};

			if slot.is_none() {
				*slot = Some(value.into_owned());
			}
		}

		params
	}

	/// Extracts the callback parameters from a full URL.
	pub fn from_url(url: &Url) -> Self {
		Self::from_query(url.query().unwrap_or_default())
	}
}

/// Failures raised by identity providers.
#[derive(Debug, ThisError)]
pub enum IdentityError {
	/// The provider rejected the request.
	#[error("Identity provider rejected the request: {message}.")]
	Rejected {
		/// Provider-supplied message.
		message: String,
		/// HTTP status, when available.
		status: Option<u16>,
	},
	/// The provider could not be reached.
	#[error("Identity provider is unreachable.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The provider answered with a body that could not be parsed.
	#[error("Identity provider returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status, when available.
		status: Option<u16>,
	},
	/// The identity layer itself is misconfigured.
	#[error("Identity provider configuration is invalid: {reason}.")]
	Misconfigured {
		/// What is wrong.
		reason: String,
	},
}
impl IdentityError {
	/// Wraps a transport-specific failure.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Short reason suitable for the `Login failed: {reason}` message.
	pub fn reason(&self) -> String {
		match self {
			IdentityError::Rejected { message, .. } => message.clone(),
			other => other.to_string(),
		}
	}
}
