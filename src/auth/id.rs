//! Flow identifiers used to key the durable flow context.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

const FLOW_KEY_MAX_LEN: usize = 128;

/// Error returned when a [`FlowKey`] fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The key was empty.
	#[error("Flow key cannot be empty.")]
	Empty,
	/// The key contains whitespace or control characters.
	#[error("Flow key must be visible ASCII.")]
	NotVisibleAscii,
	/// The key exceeded the allowed character count.
	#[error("Flow key exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Identifies the browser tab/session a flow belongs to.
///
/// Callers typically derive it from a session cookie. Each key owns one slot in the
/// [`FlowContextStore`](crate::store::FlowContextStore), so two tabs with different keys never
/// clobber each other.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowKey(String);
impl FlowKey {
	/// Creates a new key after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for FlowKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for FlowKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<FlowKey> for String {
	fn from(value: FlowKey) -> Self {
		value.0
	}
}
impl TryFrom<String> for FlowKey {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for FlowKey {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for FlowKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "FlowKey({})", self.0)
	}
}
impl Display for FlowKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if !view.chars().all(|c| c.is_ascii_graphic()) {
		return Err(IdentifierError::NotVisibleAscii);
	}
	if view.len() > FLOW_KEY_MAX_LEN {
		return Err(IdentifierError::TooLong { max: FLOW_KEY_MAX_LEN });
	}

	Ok(())
}
