//! OAuth 2.0 authorization relay: delegate sign-in to Google, reconcile the callback with a
//! backend authorization service, and gate the final redirect behind a verified payment.
//!
//! A web front end drives the relay one navigation at a time. [`relay::Relay::enter`] resolves
//! the current URL into a [`flow::FlowState`]; each state has exactly one follow-up call on the
//! relay (`begin_sign_in`, `reconcile`, `verify_payment`, or `restart`) that returns the next URL
//! the caller should navigate to.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod http;
pub mod identity;
pub mod obs;
pub mod payload;
pub mod payment;
pub mod relay;
pub mod request;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
