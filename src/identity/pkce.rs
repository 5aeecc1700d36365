//! PKCE (RFC 7636) and state generation for the identity leg.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Length of the generated handshake `state`.
pub const STATE_LEN: usize = 32;

const PKCE_VERIFIER_LEN: usize = 64;

/// The only PKCE challenge method the relay emits.
pub const CHALLENGE_METHOD_S256: &str = "S256";

/// Verifier/challenge pair for a single handshake.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	/// Generates a fresh S256 pair.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = s256_challenge(&verifier);

		Self { verifier, challenge }
	}

	/// Secret verifier sent with the code exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Challenge sent with the authorize request.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}
}
impl std::fmt::Debug for PkcePair {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}

/// Generates an alphanumeric handshake state.
pub fn random_state() -> String {
	random_string(STATE_LEN)
}

/// Computes `BASE64URL(SHA256(verifier))` without padding.
pub fn s256_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn s256_matches_rfc7636_appendix_b() {
		assert_eq!(
			s256_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn generated_pairs_are_consistent_and_unique() {
		let first = PkcePair::generate();
		let second = PkcePair::generate();

		assert_eq!(first.verifier().len(), PKCE_VERIFIER_LEN);
		assert_eq!(first.challenge(), s256_challenge(first.verifier()));
		assert_ne!(first.verifier(), second.verifier());
		assert_eq!(random_state().len(), STATE_LEN);
		assert!(!format!("{first:?}").contains(first.verifier()));
	}
}
