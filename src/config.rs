//! Relay configuration: public base URLs, entry-point routes, timeouts, checkout settings, and
//! the redirect policy.
//!
//! [`RelayConfig`] is immutable once built. [`RelayConfigBuilder`] validates every setting and
//! also deserializes from JSON so deployments can keep the relay settings in a file.

// crates.io
use serde::Deserializer;
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError, request::AuthorizationRequest};

/// Google scopes requested for analytics read access on top of the OpenID basics.
pub const ANALYTICS_SCOPES: [&str; 5] = [
	"openid",
	"email",
	"profile",
	"https://www.googleapis.com/auth/analytics.readonly",
	"https://www.googleapis.com/auth/analytics.manage.users.readonly",
];

const DEFAULT_TIMEOUT_SECS: i64 = 10;
const DEFAULT_RETRY_MAX_COUNT: u32 = 3;

/// Entry-point paths served by the front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayRoutes {
	/// Application root; the error surface's restart lands here.
	pub root: String,
	/// Authorize entry point receiving the downstream client's request.
	pub authorize: String,
	/// Callback entry point the identity provider returns to.
	pub callback: String,
	/// Payment page that receives the forwarded `redirect_uri`.
	pub payment: String,
}
impl RelayRoutes {
	fn validate(&self) -> Result<(), ConfigError> {
		let named = [
			("root", &self.root),
			("authorize", &self.authorize),
			("callback", &self.callback),
			("payment", &self.payment),
		];

		for (route, path) in named {
			if !path.starts_with('/') {
				return Err(ConfigError::InvalidRoute { route, path: path.clone() });
			}
		}
		for (idx, &(route, path)) in named.iter().enumerate().skip(1) {
			if named[..idx].iter().any(|(_, other)| *other == path) {
				return Err(ConfigError::InvalidRoute { route, path: path.clone() });
			}
		}

		Ok(())
	}
}
impl Default for RelayRoutes {
	fn default() -> Self {
		Self {
			root: "/".into(),
			authorize: "/authorize".into(),
			callback: "/auth/callback".into(),
			payment: "/payment".into(),
		}
	}
}

/// Decides which final redirect targets the relay is willing to navigate to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "origins")]
pub enum RedirectPolicy {
	/// Any `redirect_uri` is accepted verbatim.
	AllowAny,
	/// Only absolute `http(s)` URIs whose origin is listed are accepted.
	AllowList(Vec<String>),
}
impl RedirectPolicy {
	/// Builds an allow-list policy, normalizing each entry to its ASCII origin.
	pub fn allow_origins<I, S>(origins: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut normalized = Vec::new();

		for origin in origins {
			let url = parse_http_url("redirect_policy", origin.as_ref())?;

			normalized.push(url.origin().ascii_serialization());
		}

		Ok(Self::AllowList(normalized))
	}

	/// Returns `true` when the relay may navigate to `redirect_uri`.
	pub fn permits(&self, redirect_uri: &str) -> bool {
		match self {
			RedirectPolicy::AllowAny => true,
			RedirectPolicy::AllowList(origins) => match Url::parse(redirect_uri) {
				Ok(url) if matches!(url.scheme(), "http" | "https") => {
					let origin = url.origin().ascii_serialization();

					origins.iter().any(|allowed| allowed == &origin)
				},
				_ => false,
			},
		}
	}
}

/// Fixed-price checkout presented by the payment gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
	/// Public key id of the payment processor account.
	pub key_id: String,
	/// Price in the currency's minor unit.
	pub amount: u64,
	/// ISO 4217 currency code.
	#[serde(default = "CheckoutConfig::default_currency")]
	pub currency: String,
	/// Merchant name shown in the checkout widget.
	#[serde(default = "CheckoutConfig::default_name")]
	pub name: String,
	/// Fixed product description.
	#[serde(default = "CheckoutConfig::default_description")]
	pub description: String,
	/// Widget-internal retries for transient processor errors.
	#[serde(default = "CheckoutConfig::default_retry_max_count")]
	pub retry_max_count: u32,
}
impl CheckoutConfig {
	/// Creates a checkout with the default currency, merchant copy, and retry count.
	pub fn new(key_id: impl Into<String>, amount: u64) -> Self {
		Self {
			key_id: key_id.into(),
			amount,
			currency: Self::default_currency(),
			name: Self::default_name(),
			description: Self::default_description(),
			retry_max_count: DEFAULT_RETRY_MAX_COUNT,
		}
	}

	/// Overrides the product description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}

	/// Overrides the currency code.
	pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
		self.currency = currency.into();

		self
	}

	fn default_currency() -> String {
		"INR".into()
	}

	fn default_name() -> String {
		"Analytics Connector".into()
	}

	fn default_description() -> String {
		"One-time access fee".into()
	}

	fn default_retry_max_count() -> u32 {
		DEFAULT_RETRY_MAX_COUNT
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.key_id.is_empty() {
			return Err(ConfigError::MissingField { field: "checkout.key_id" });
		}
		if self.amount == 0 {
			return Err(ConfigError::ZeroAmount);
		}

		Ok(())
	}
}

/// Validated relay configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
	/// Public base URL of this application (callback, payment, and verify endpoints live here).
	pub app_base: Url,
	/// Base URL of the backend authorization service.
	pub backend_base: Url,
	/// Entry-point paths.
	pub routes: RelayRoutes,
	/// Upper bound for the backend callback POST.
	pub callback_timeout: Duration,
	/// Upper bound for the payment verification POST.
	pub verify_timeout: Duration,
	/// Scopes requested from the identity provider.
	pub identity_scopes: ScopeSet,
	/// Final redirect policy.
	pub redirect_policy: RedirectPolicy,
	/// Checkout settings for the payment gate.
	pub checkout: CheckoutConfig,
}
impl RelayConfig {
	/// Creates a new builder.
	pub fn builder() -> RelayConfigBuilder {
		RelayConfigBuilder::default()
	}

	/// Application root the error surface restarts to.
	pub fn root_url(&self) -> Url {
		join_path(&self.app_base, &self.routes.root)
	}

	/// Callback entry point handed to the identity provider.
	pub fn callback_url(&self) -> Url {
		join_path(&self.app_base, &self.routes.callback)
	}

	/// Payment page URL carrying `redirect_uri` as its only state.
	pub fn payment_url(&self, redirect_uri: &str) -> Url {
		let mut url = join_path(&self.app_base, &self.routes.payment);

		url.query_pairs_mut().append_pair("redirect_uri", redirect_uri);

		url
	}

	/// Payment verification endpoint.
	pub fn verify_url(&self) -> Url {
		join_path(&self.app_base, "/payment/verify")
	}

	/// Backend callback URL echoing every non-empty request field as a query parameter.
	pub fn backend_callback_url(&self, request: &AuthorizationRequest) -> Url {
		let mut url = join_path(&self.backend_base, "/callback");
		let pairs = request.query_pairs();

		if !pairs.is_empty() {
			let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

			url.set_query(Some(&query));
		}

		url
	}
}

/// Builder for [`RelayConfig`]; every setting except the URLs, checkout, and redirect policy has
/// a default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfigBuilder {
	app_base: Option<String>,
	backend_base: Option<String>,
	routes: RelayRoutes,
	#[serde(rename = "callback_timeout_secs", deserialize_with = "whole_seconds")]
	callback_timeout: Option<Duration>,
	#[serde(rename = "verify_timeout_secs", deserialize_with = "whole_seconds")]
	verify_timeout: Option<Duration>,
	extra_scopes: Vec<String>,
	redirect_policy: Option<RedirectPolicy>,
	checkout: Option<CheckoutConfig>,
}
impl RelayConfigBuilder {
	/// Parses builder settings from JSON.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(de).map_err(|source| ConfigError::Parse { source })
	}

	/// Sets the application's public base URL.
	pub fn app_base(mut self, url: impl Into<String>) -> Self {
		self.app_base = Some(url.into());

		self
	}

	/// Sets the backend authorization service base URL.
	pub fn backend_base(mut self, url: impl Into<String>) -> Self {
		self.backend_base = Some(url.into());

		self
	}

	/// Overrides the entry-point routes.
	pub fn routes(mut self, routes: RelayRoutes) -> Self {
		self.routes = routes;

		self
	}

	/// Overrides the backend callback timeout (defaults to 10 seconds).
	pub fn callback_timeout(mut self, timeout: Duration) -> Self {
		self.callback_timeout = Some(timeout);

		self
	}

	/// Overrides the payment verification timeout (defaults to 10 seconds).
	pub fn verify_timeout(mut self, timeout: Duration) -> Self {
		self.verify_timeout = Some(timeout);

		self
	}

	/// Requests additional identity scopes beyond [`ANALYTICS_SCOPES`].
	pub fn extra_scope(mut self, scope: impl Into<String>) -> Self {
		self.extra_scopes.push(scope.into());

		self
	}

	/// Sets the redirect policy. Required: choose [`RedirectPolicy::AllowAny`] explicitly to
	/// opt out of allow-listing.
	pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
		self.redirect_policy = Some(policy);

		self
	}

	/// Sets the checkout settings.
	pub fn checkout(mut self, checkout: CheckoutConfig) -> Self {
		self.checkout = Some(checkout);

		self
	}

	/// Validates the settings and produces a [`RelayConfig`].
	pub fn build(self) -> Result<RelayConfig, ConfigError> {
		let app_base = self.app_base.ok_or(ConfigError::MissingField { field: "app_base" })?;
		let app_base = parse_http_url("app_base", &app_base)?;
		let backend_base =
			self.backend_base.ok_or(ConfigError::MissingField { field: "backend_base" })?;
		let backend_base = parse_http_url("backend_base", &backend_base)?;

		self.routes.validate()?;

		let callback_timeout = timeout("callback_timeout", self.callback_timeout)?;
		let verify_timeout = timeout("verify_timeout", self.verify_timeout)?;
		let identity_scopes =
			ScopeSet::new(ANALYTICS_SCOPES)?.union(&ScopeSet::new(self.extra_scopes)?);
		let redirect_policy =
			match self.redirect_policy.ok_or(ConfigError::MissingField { field: "redirect_policy" })? {
				RedirectPolicy::AllowList(origins) => RedirectPolicy::allow_origins(origins)?,
				policy => policy,
			};
		let checkout = self.checkout.ok_or(ConfigError::MissingField { field: "checkout" })?;

		checkout.validate()?;

		Ok(RelayConfig {
			app_base,
			backend_base,
			routes: self.routes,
			callback_timeout,
			verify_timeout,
			identity_scopes,
			redirect_policy,
			checkout,
		})
	}
}

pub(crate) fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
		return Err(ConfigError::UnsupportedScheme { field, url: raw.to_owned() });
	}

	Ok(url)
}

fn timeout(field: &'static str, value: Option<Duration>) -> Result<Duration, ConfigError> {
	let timeout = value.unwrap_or(Duration::seconds(DEFAULT_TIMEOUT_SECS));

	if !timeout.is_positive() {
		return Err(ConfigError::NonPositiveTimeout { field });
	}

	Ok(timeout)
}

fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::seconds))
}

/// Appends `path` to the base URL's path, dropping any query or fragment.
fn join_path(base: &Url, path: &str) -> Url {
	let mut url = base.clone();
	let joined = format!("{}/{}", base.path().trim_end_matches('/'), path.trim_start_matches('/'));

	url.set_path(&joined);
	url.set_query(None);
	url.set_fragment(None);

	url
}
