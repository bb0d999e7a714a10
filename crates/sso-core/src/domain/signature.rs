//! # HMAC Signer
//!
//! HMAC-SHA256 over the base64 text of the payload, rendered as lowercase hex.
//!
//! ## Security
//!
//! Verification uses the MAC crate's constant-time `verify_slice`. Malformed
//! hex is replaced by a zeroed digest and still run through the same
//! comparison, so bad input takes the same path as a wrong signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

fn mac_for(encoded_payload: &str, secret: &[u8]) -> HmacSha256 {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => unreachable!("HMAC can take key of any size"),
    };
    mac.update(encoded_payload.as_bytes());
    mac
}

/// Signs the encoded payload, returning a lowercase hex digest.
pub fn sign(encoded_payload: &str, secret: &[u8]) -> String {
    hex::encode(mac_for(encoded_payload, secret).finalize().into_bytes())
}

/// Verifies a hex signature over the encoded payload.
///
/// Returns `false` for any mismatch, including malformed, wrong-length or
/// uppercase hex. Signatures are always issued in lowercase.
pub fn verify(encoded_payload: &str, signature: &str, secret: &[u8]) -> bool {
    let decoded = hex::decode(signature)
        .ok()
        .filter(|bytes| bytes.len() == DIGEST_LEN);
    let lowercase = !signature.bytes().any(|b| b.is_ascii_uppercase());
    let well_formed = decoded.is_some() && lowercase;
    let expected = decoded.unwrap_or_else(|| vec![0u8; DIGEST_LEN]);

    let matches = mac_for(encoded_payload, secret)
        .verify_slice(&expected)
        .is_ok();

    matches && well_formed
}
