//! Relay-level error taxonomy shared by every flow stage.
//!
//! Every variant is terminal for the current attempt. [`Error::recovery`] names the single
//! affordance the caller should offer: restart the whole flow, or retry the current step.

// self
use crate::{_prelude::*, auth::ScopeValidationError, http::HttpFailure, store::StoreError};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Recovery affordance attached to every [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
	/// Clear the flow context and navigate back to the application root.
	Restart,
	/// Stay on the current page and let the user trigger the step again.
	Retry,
}

/// Outbound endpoint a transport failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// Backend authorization callback (`{backend_base}/callback`).
	Callback,
	/// Payment verification endpoint (`{app_base}/payment/verify`).
	PaymentVerification,
}
impl Endpoint {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Callback => "callback",
			Endpoint::PaymentVerification => "payment_verification",
		}
	}

	const fn failure_label(self) -> &'static str {
		match self {
			Endpoint::Callback => "Authorization failed",
			Endpoint::PaymentVerification => "Payment verification failed",
		}
	}

	const fn no_response_message(self) -> &'static str {
		match self {
			Endpoint::Callback => "Authentication failed. Please try again.",
			Endpoint::PaymentVerification =>
				"Payment verification failed: the server did not respond. Please try again.",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical relay error surfaced by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Durable flow context failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Inbound authorize request is missing `client_id`/`redirect_uri` or is not a code request.
	#[error("Invalid OAuth request: Missing required parameters")]
	MalformedRequest,
	/// The client's `redirect_uri` is outside the configured allow-list.
	#[error("Invalid OAuth request: redirect_uri `{redirect_uri}` is not allowed")]
	RedirectNotAllowed {
		/// Rejected redirect target, verbatim.
		redirect_uri: String,
	},
	/// Identity provider rejected or failed the sign-in delegate call.
	#[error("Login failed: {reason}")]
	Provider {
		/// Provider-supplied or transport reason string.
		reason: String,
	},
	/// A sign-in for the same flow is still outstanding.
	#[error("Login failed: a sign-in is already in progress")]
	SignInPending,
	/// No identity session was established by the provider.
	#[error("Failed to authenticate with Google.")]
	IdentityMissing,
	/// The durable flow context is empty (cleared, different tab, or storage disabled).
	#[error("OAuth session expired. Please try again.")]
	SessionExpired,
	/// Server responded with an error status.
	#[error("{} ({status}): {message}", .endpoint.failure_label())]
	Backend {
		/// Endpoint that responded.
		endpoint: Endpoint,
		/// HTTP status code.
		status: u16,
		/// Server-supplied message or a body preview.
		message: String,
	},
	/// No response arrived (network failure or timeout).
	#[error("{}", .endpoint.no_response_message())]
	NoResponse {
		/// Endpoint that never answered.
		endpoint: Endpoint,
		/// Underlying transport failure.
		#[source]
		source: HttpFailure,
	},
	/// Payment verification completed but did not report success.
	#[error("Payment verification failed. Please try again.")]
	VerificationFailed {
		/// Status value reported by the server, if any.
		status: Option<String>,
	},
	/// The payment page was reached without a forwarded `redirect_uri`.
	#[error("Payment page is missing the redirect target.")]
	MissingRedirectTarget,
}
impl Error {
	/// Human-readable message shown on the error surface.
	pub fn message(&self) -> String {
		self.to_string()
	}

	/// Returns the single recovery affordance for this failure.
	pub fn recovery(&self) -> Recovery {
		match self {
			Error::Provider { .. } | Error::SignInPending | Error::VerificationFailed { .. } =>
				Recovery::Retry,
			Error::Backend { endpoint: Endpoint::PaymentVerification, .. }
			| Error::NoResponse { endpoint: Endpoint::PaymentVerification, .. } => Recovery::Retry,
			_ => Recovery::Restart,
		}
	}
}

/// Configuration and validation failures raised while assembling the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required setting was not supplied.
	#[error("Relay configuration is missing `{field}`.")]
	MissingField {
		/// Name of the missing setting.
		field: &'static str,
	},
	/// A URL setting cannot be parsed.
	#[error("Relay configuration `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending setting.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A URL setting is not an absolute `http(s)` URL.
	#[error("Relay configuration `{field}` must be an absolute http(s) URL: {url}.")]
	UnsupportedScheme {
		/// Name of the offending setting.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Identity endpoints must use HTTPS (loopback hosts excepted).
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Route paths must be absolute and distinct.
	#[error("Route `{route}` is invalid: {path}.")]
	InvalidRoute {
		/// Route name.
		route: &'static str,
		/// Offending path.
		path: String,
	},
	/// Timeouts must be positive.
	#[error("Timeout `{field}` must be positive.")]
	NonPositiveTimeout {
		/// Name of the offending setting.
		field: &'static str,
	},
	/// Checkout amount must be greater than zero.
	#[error("Checkout amount must be greater than zero.")]
	ZeroAmount,
	/// Identity scopes cannot be normalized.
	#[error("Identity scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// JSON configuration could not be parsed.
	#[error("Relay configuration JSON is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
