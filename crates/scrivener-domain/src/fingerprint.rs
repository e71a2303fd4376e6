//! Content fingerprints used as cache keys

use std::fmt;

/// Length of a fingerprint in hex characters (a 256-bit digest)
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Collision-resistant digest of a document's entire byte content
///
/// The digest itself is computed by the storage layer; this type only guarantees the
/// textual shape (64 lowercase hex characters), which also makes it safe to use as a
/// file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a hex-encoded 256-bit digest
    ///
    /// Uppercase input is normalized to lowercase.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivener_domain::Fingerprint;
    ///
    /// let fp = Fingerprint::from_hex(&"AB".repeat(32)).unwrap();
    /// assert_eq!(fp.as_str(), "ab".repeat(32));
    /// assert!(Fingerprint::from_hex("not-a-digest").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        if hex.len() != FINGERPRINT_HEX_LEN {
            return Err(format!(
                "fingerprint must be {} hex characters, got {}",
                FINGERPRINT_HEX_LEN,
                hex.len()
            ));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("fingerprint '{}' is not hexadecimal", hex));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// The full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_short_prefix() {
        let fp = Fingerprint::from_hex(&"0123456789".repeat(7)[..64]).unwrap();
        assert_eq!(fp.short(), "012345678901");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any 32 bytes rendered as hex form a valid fingerprint
        #[test]
        fn test_any_digest_is_accepted(bytes in proptest::collection::vec(any::<u8>(), 32)) {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            let fp = Fingerprint::from_hex(&hex).unwrap();
            prop_assert_eq!(fp.as_str(), hex.as_str());
        }
    }
}
