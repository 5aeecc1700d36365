//! Transport primitives for the relay's outbound calls.
//!
//! [`ReqwestHttpClient`] serves two kinds of traffic: JSON POSTs to the backend and payment
//! verification endpoints (bounded by a per-call timeout), and the identity provider's token
//! exchange, which the `oauth2` crate drives through [`OAuthHandle`]. The handle records the
//! HTTP status of the last response in a [`StatusSlot`] so exchange failures can report it.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Failure to obtain any HTTP response.
#[derive(Debug, ThisError)]
pub enum HttpFailure {
	/// No response arrived before the deadline.
	#[error("Request timed out after {after}.")]
	TimedOut {
		/// Deadline that elapsed.
		after: Duration,
	},
	/// DNS, TCP, TLS, or body streaming failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL, without query.
		url: String,
		/// Transport-specific error.
		#[source]
		source: ReqwestError,
	},
}

/// Response captured from an outbound call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl RelayResponse {
	/// Returns `true` for any status below 400.
	pub fn is_success(&self) -> bool {
		self.status < 400
	}

	/// Parses the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de)
	}

	/// Extracts the most useful error message from the body.
	///
	/// Looks for a top-level `message`, `error_description`, `error`, or `detail` string, then
	/// falls back to a truncated body preview, then to the status code.
	pub fn error_message(&self) -> String {
		if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(&self.body) {
			for field in ["message", "error_description", "error", "detail"] {
				if let Some(text) =
					map.get(field).and_then(serde_json::Value::as_str).filter(|t| !t.is_empty())
				{
					return text.to_owned();
				}
			}
		}

		let text = String::from_utf8_lossy(&self.body);
		let text = text.trim();

		if text.is_empty() { format!("HTTP {}", self.status) } else { truncate_preview(text) }
	}
}

/// Shared reqwest client used for every outbound call.
///
/// The default client follows reqwest's redirect policy. Pass a client built with
/// `reqwest::redirect::Policy::none()` to keep token exchanges from following redirects.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// POSTs `body` as JSON and waits at most `timeout` for the response.
	pub async fn post_json<B>(
		&self,
		url: Url,
		body: &B,
		timeout: Duration,
	) -> Result<RelayResponse, HttpFailure>
	where
		B: ?Sized + Serialize,
	{
		let request = self.0.post(url.clone()).json(body).timeout(timeout.unsigned_abs());

		self.execute(url, request, timeout).await
	}

	/// GETs `url` with a bearer token and waits at most `timeout` for the response.
	pub async fn get_with_bearer(
		&self,
		url: Url,
		token: &str,
		timeout: Duration,
	) -> Result<RelayResponse, HttpFailure> {
		let request = self.0.get(url.clone()).bearer_auth(token).timeout(timeout.unsigned_abs());

		self.execute(url, request, timeout).await
	}

	/// Builds an [`AsyncHttpClient`] handle for the `oauth2` crate plus the slot it reports to.
	///
	/// Every request made through the handle waits at most `timeout`.
	pub(crate) fn oauth_handle(&self, timeout: Duration) -> (OAuthHandle, StatusSlot) {
		let slot = StatusSlot::default();

		(OAuthHandle { client: self.0.clone(), slot: slot.clone(), timeout }, slot)
	}

	async fn execute(
		&self,
		url: Url,
		request: reqwest::RequestBuilder,
		timeout: Duration,
	) -> Result<RelayResponse, HttpFailure> {
		let map_err = |source: ReqwestError| {
			if source.is_timeout() {
				HttpFailure::TimedOut { after: timeout }
			} else {
				HttpFailure::Network { url: redact_query(&url), source }
			}
		};
		let response = request.send().await.map_err(map_err)?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(map_err)?.to_vec();

		Ok(RelayResponse { status, body })
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}

/// Records the HTTP status of the most recent response seen by an [`OAuthHandle`].
#[derive(Clone, Debug, Default)]
pub struct StatusSlot(Arc<Mutex<Option<u16>>>);
impl StatusSlot {
	/// Stores the status for the current request.
	pub fn store(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	/// Returns and clears the captured status.
	pub fn take(&self) -> Option<u16> {
		self.0.lock().take()
	}
}

/// `oauth2` transport handle backed by reqwest.
pub struct OAuthHandle {
	client: ReqwestClient,
	slot: StatusSlot,
	timeout: Duration,
}
impl<'c> AsyncHttpClient<'c> for OAuthHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(self.timeout.unsigned_abs());

			let response = self.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(status.as_u16());

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

fn truncate_preview(text: &str) -> String {
	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.to_owned();
	}

	let mut buf: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}

fn redact_query(url: &Url) -> String {
	let mut url = url.clone();

	url.set_query(None);

	url.to_string()
}
