//! # Payload Codec
//!
//! The `sso` parameter is standard base64 (with padding) of an
//! `application/x-www-form-urlencoded` query string.
//!
//! Decoding is lenient about ASCII whitespace because some encoders wrap
//! base64 output at 60 columns. Duplicate keys resolve to the last value.

use crate::domain::entities::SsoPayload;
use crate::domain::errors::SsoError;
use base64::{engine::general_purpose::STANDARD, Engine};
use url::form_urlencoded;

/// Largest encoded payload accepted before any decoding work.
pub const MAX_ENCODED_PAYLOAD_LEN: usize = 16 * 1024;

/// Serializes a payload as a query string and base64-encodes it.
pub fn encode(payload: &SsoPayload) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(payload.iter())
        .finish();
    STANDARD.encode(query.as_bytes())
}

/// Decodes a base64 query-string payload.
///
/// # Errors
///
/// `SsoError::MalformedPayload` when the input is oversized, is not valid
/// base64, or does not decode to UTF-8 text.
pub fn decode(encoded: &str) -> Result<SsoPayload, SsoError> {
    // Reject oversized input before base64 decode
    if encoded.len() > MAX_ENCODED_PAYLOAD_LEN {
        return Err(SsoError::malformed("payload too large"));
    }

    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| SsoError::malformed("invalid base64"))?;

    let query =
        std::str::from_utf8(&bytes).map_err(|_| SsoError::malformed("payload is not UTF-8"))?;

    Ok(form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DISCOURSE_PAYLOAD: &str = "bm9uY2U9Y2RlNWQ5NWYyNzA2MmViMDljOTg3MzZjM2YyYWVjY2Umc\
        mV0dXJuX3Nzb191cmw9aHR0cCUzQSUyRiUyRmRpc2NvdXJzZS5sb2\
        NhbGhvc3QuY29tJTJGc2Vzc2lvbiUyRnNzb19sb2dpbg==";

    #[test]
    fn test_decode_discourse_payload() {
        let payload = decode(DISCOURSE_PAYLOAD).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("nonce"), Some("cde5d95f27062eb09c98736c3f2aecce"));
        assert_eq!(
            payload.get("return_sso_url"),
            Some("http://discourse.localhost.com/session/sso_login")
        );
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let wrapped = format!("{}\n{}\n", &DISCOURSE_PAYLOAD[..60], &DISCOURSE_PAYLOAD[60..]);
        assert_eq!(decode(&wrapped).unwrap(), decode(DISCOURSE_PAYLOAD).unwrap());
    }

    #[test]
    fn test_encode_known_payload() {
        let payload: SsoPayload = [("nonce", "11111")].into_iter().collect();
        assert_eq!(encode(&payload), "bm9uY2U9MTExMTE=");
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let payload: SsoPayload = [("add_groups", "Group 1,Group&2")].into_iter().collect();
        let encoded = encode(&payload);
        let text = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(text, "add_groups=Group+1%2CGroup%262");
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let encoded = STANDARD.encode("nonce=first&nonce=second");
        assert_eq!(decode(&encoded).unwrap().get("nonce"), Some("second"));
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert_eq!(
            decode("not base64!!"),
            Err(SsoError::malformed("invalid base64"))
        );
    }

    #[test]
    fn test_decode_non_utf8() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0x3d]);
        assert_eq!(
            decode(&encoded),
            Err(SsoError::malformed("payload is not UTF-8"))
        );
    }

    #[test]
    fn test_decode_oversized() {
        let encoded = "A".repeat(MAX_ENCODED_PAYLOAD_LEN + 4);
        assert_eq!(
            decode(&encoded),
            Err(SsoError::malformed("payload too large"))
        );
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode("").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            fields in proptest::collection::btree_map("[a-z_]{1,16}", "\\PC{0,32}", 0..8)
        ) {
            let payload = SsoPayload::from(fields);
            prop_assert_eq!(decode(&encode(&payload)).unwrap(), payload);
        }
    }
}
