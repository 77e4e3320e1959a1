//! Bytecode fingerprints.
//!
//! A fingerprint is the SHA-256 digest of a contract's bytecode whose first
//! four bytes are replaced by a header: a version marker `0x0100` followed by
//! the bytecode length in 32-byte words as a big-endian `u16`. Both the
//! content and the length of the code therefore show up in the value, and a
//! fingerprint is never mistaken for a plain digest.

use std::{fmt, str::FromStr};

use alloy_primitives::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};

/// Header marker written into bytes 0 and 1.
pub const VERSION_MARKER: [u8; 2] = [0x01, 0x00];

const WORD: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("bytecode of {0} bytes does not fit the 16-bit word count")]
    TooLong(usize),

    #[error("invalid fingerprint: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BytecodeHash([u8; 32]);

impl BytecodeHash {
    /// Fingerprint the given bytecode.
    ///
    /// The word count is `len / 32`, rounded down.
    pub fn of(code: &[u8]) -> Result<Self, FingerprintError> {
        let words = u16::try_from(code.len() / WORD)
            .map_err(|_| FingerprintError::TooLong(code.len()))?;
        let mut hash: [u8; 32] = Sha256::digest(code).into();
        hash[..2].copy_from_slice(&VERSION_MARKER);
        hash[2..4].copy_from_slice(&words.to_be_bytes());
        Ok(Self(hash))
    }

    /// Bytecode length in words, as recorded in the header.
    pub fn words(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }
}

impl From<[u8; 32]> for BytecodeHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BytecodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BytecodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BytecodeHash({self})")
    }
}

impl FromStr for BytecodeHash {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|e| FingerprintError::Invalid(e.to_string()))?;
        Ok(Self(out))
    }
}

impl Serialize for BytecodeHash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BytecodeHash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let code = vec![0x60u8; 96];
        assert_eq!(
            BytecodeHash::of(&code).unwrap(),
            BytecodeHash::of(&code).unwrap()
        );
    }

    #[test]
    fn header_layout() {
        for words in [0usize, 1, 7, 300, 65535] {
            let code = vec![0xab; words * 32];
            let h = BytecodeHash::of(&code).unwrap();
            assert_eq!(&h.0[..2], &[0x01, 0x00]);
            assert_eq!(h.words() as usize, words);
            assert_eq!(&h.0[2..4], &(words as u16).to_be_bytes());
        }
    }

    #[test]
    fn tail_is_sha256() {
        let code = b"some contract bytecode, 32 bytes".to_vec();
        let digest: [u8; 32] = Sha256::digest(&code).into();
        let h = BytecodeHash::of(&code).unwrap();
        assert_eq!(&h.0[4..], &digest[4..]);
    }

    #[test]
    fn content_and_length_changes_differ() {
        let a = vec![1u8; 64];
        let mut b = a.clone();
        b[10] = 2;
        let c = vec![1u8; 96];
        let ha = BytecodeHash::of(&a).unwrap();
        assert_ne!(ha, BytecodeHash::of(&b).unwrap());
        assert_ne!(ha, BytecodeHash::of(&c).unwrap());
    }

    #[test]
    fn partial_words_round_down() {
        let h = BytecodeHash::of(&[0u8; 70]).unwrap();
        assert_eq!(h.words(), 2);
    }

    #[test]
    fn too_long() {
        let code = vec![0u8; 65536 * 32];
        assert_eq!(
            BytecodeHash::of(&code),
            Err(FingerprintError::TooLong(65536 * 32))
        );
    }

    #[test]
    fn text_form() {
        let h = BytecodeHash::of(&[7u8; 32]).unwrap();
        let s = h.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("01000001"));
        assert_eq!(s.parse::<BytecodeHash>().unwrap(), h);
        assert_eq!(format!("0x{s}").parse::<BytecodeHash>().unwrap(), h);
        assert!("xyz".parse::<BytecodeHash>().is_err());

        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{s}\""));
        assert_eq!(serde_json::from_str::<BytecodeHash>(&json).unwrap(), h);
    }
}
