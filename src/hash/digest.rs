//! Content digest type.

use std::fmt;
use std::hash::{Hash as StdHash, Hasher};

/// A 32-byte BLAKE3 digest identifying chunk or archive content.
///
/// Digests are the storage address of blobs; their lowercase hex form names
/// the blob file on disk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The size of the digest in bytes.
    pub const SIZE: usize = 32;

    /// Creates a digest from a byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Computes the digest of `data` in one shot.
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    /// Creates a digest from a slice.
    ///
    /// Returns `None` if the slice is not exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(slice).ok().map(Self)
    }

    /// Returns the digest as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut result = String::with_capacity(64);
        for byte in &self.0 {
            result.push(HEX[(byte >> 4) as usize] as char);
            result.push(HEX[(byte & 0xf) as usize] as char);
        }
        result
    }

    /// Parses a digest from its lowercase hex form.
    ///
    /// Returns `None` unless the string is exactly 64 lowercase hex digits,
    /// so only canonical blob file names parse.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.len() != 64
            || !hex_str
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex_str[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl StdHash for Digest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let bytes = vec![7u8; 32];
        let digest = Digest::from_slice(&bytes).unwrap();
        assert_eq!(digest.as_bytes().as_ref(), bytes.as_slice());

        assert!(Digest::from_slice(&[0u8; 31]).is_none());
        assert!(Digest::from_slice(&[0u8; 33]).is_none());
    }

    #[test]
    fn test_hex_round_trip() {
        let digest = Digest::of(b"hello world");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex), Some(digest));
        assert_eq!(hex, digest.to_string());
    }

    #[test]
    fn test_from_hex_rejects_non_canonical() {
        let upper = "AB".repeat(32);
        assert!(Digest::from_hex(&upper).is_none());
        assert!(Digest::from_hex("abcd").is_none());
        assert!(Digest::from_hex(&"zz".repeat(32)).is_none());
        assert!(Digest::from_hex(&"ab".repeat(32)).is_some());
    }

    #[test]
    fn test_of_matches_blake3() {
        let expected: [u8; 32] = blake3::hash(b"abc").into();
        assert_eq!(Digest::of(b"abc").as_bytes(), &expected);
    }

    #[test]
    fn test_display_prefix() {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]);
        let digest = Digest::new(bytes);
        assert!(digest.to_string().starts_with("0123456789abcdef"));
    }
}
