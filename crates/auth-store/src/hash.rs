//! Short URL-safe digests used for tokens, verification codes, and password hashes
//!
//! Deliberately simple: `short_digest` is a bare SHA-256 + base64url encoding, not
//! a password KDF. Stronger hashing (argon2, scrypt) is an integrator concern;
//! this layer only guarantees a stable, URL-safe digest.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// SHA-256 of the UTF-8 encoding of `input`, base64url-encoded without padding.
///
/// Output never contains `+`, `/`, or `=`.
pub fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// 32 cryptographically random bytes, hex-encoded, then passed through `short_digest`.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    short_digest(&to_hex(&bytes))
}

/// A 6-digit numeric code, used for both signup verification and password reset.
pub fn verification_code() -> String {
    let value: u32 = rand::rng().random_range(0..1_000_000);
    format!("{value:06}")
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
