//! # Shared Secret
//!
//! Wrapper for the SSO secret that zeroizes memory on drop and never prints
//! its contents.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum accepted secret length, in characters.
pub const MIN_SECRET_LEN: usize = 10;

/// The HMAC key shared with the forum.
///
/// # Security
///
/// `Debug` is redacted and the bytes are zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SsoSecret {
    inner: Vec<u8>,
}

impl SsoSecret {
    /// Creates a secret from raw bytes or text.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            inner: secret.as_ref().to_vec(),
        }
    }

    /// The key bytes (use carefully!).
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// The secret as text, if it is UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.inner).ok()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for SsoSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the actual secret
        f.write_str("SsoSecret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_hides_value() {
        let secret = SsoSecret::new("j2zNLBXBsurcU0LfypwR");
        let debug_str = format!("{:?}", secret);
        assert!(!debug_str.contains("j2zN"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_secret_bytes() {
        let secret = SsoSecret::new("0123456789");
        assert_eq!(secret.as_bytes(), b"0123456789");
        assert_eq!(secret.as_str(), Some("0123456789"));
        assert_eq!(secret.len(), 10);
    }

    #[test]
    fn test_secret_zeroize() {
        let mut secret = SsoSecret::new("0123456789");
        secret.zeroize();
        assert!(secret.is_empty());
    }
}
