//! Content fingerprints for schema scripts.
//!
//! A fingerprint identifies a schema version. It is not a security boundary,
//! only a change-detection key: identical normalized text always yields the
//! identical fingerprint.

use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hexadecimal SHA-256 digest of a script's text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Number of hex characters in a fingerprint.
    pub const HEX_LEN: usize = 64;

    /// Compute the fingerprint of the given text.
    #[must_use]
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(format!("{digest:x}"))
    }

    /// The lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the fingerprint of the given text.
///
/// Shorthand for [`Fingerprint::of`].
#[must_use]
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint::of(text)
}
