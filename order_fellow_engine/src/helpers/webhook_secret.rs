//! # Webhook secrets
//!
//! Every business account that has passed verification holds one webhook secret. Callers present the secret verbatim
//! in the `X-Webhook-Signature` header.
//!
//! Secrets have the format
//!
//! ```text
//!    whsk_{token}
//! ```
//!
//! where `token` is 32 random bytes, base64 encoded with the URL-safe alphabet and no padding (43 characters).
//!
//! Secrets are compared by hashing both sides with SHA-256 and comparing the digests in constant time. The hashing
//! step makes the comparison independent of the supplied token's length as well as of the position of the first
//! mismatching byte.
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const WEBHOOK_SECRET_PREFIX: &str = "whsk_";
const SECRET_BYTES: usize = 32;

pub fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    thread_rng().fill_bytes(&mut bytes);
    let token = base64::encode_config(bytes, base64::URL_SAFE_NO_PAD);
    format!("{WEBHOOK_SECRET_PREFIX}{token}")
}

/// Constant-time equality check of a caller-supplied token against a stored secret.
pub fn secrets_match(supplied: &str, stored: &str) -> bool {
    let supplied = Sha256::digest(supplied.as_bytes());
    let stored = Sha256::digest(stored.as_bytes());
    supplied.as_slice().ct_eq(stored.as_slice()).into()
}
