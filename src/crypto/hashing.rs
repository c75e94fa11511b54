// This file computes the SHA-256 fingerprint of a selected file's bytes.

use crate::domain::certification::PayloadSource;
use crate::error::HashingFailure;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

/// Length of a rendered digest: 32 bytes, two hex characters each.
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 of the empty payload.
pub const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Lowercase hex SHA-256 of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileDigest(String);

impl FileDigest {
    /// Accepts an already rendered digest. Uppercase input is normalised;
    /// anything that is not 64 hex characters is refused.
    pub fn parse(hex_digest: &str) -> Option<Self> {
        let s = hex_digest.trim();
        if s.len() != DIGEST_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hashes an in-memory payload. Name and MIME type never take part.
pub fn digest_bytes(bytes: &[u8]) -> FileDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    FileDigest(hex::encode(hasher.finalize()))
}

/// Read size for streamed hashing.
const READ_CHUNK: usize = 64 * 1024;

/// Result of fingerprinting one payload.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub digest: FileDigest,
    /// Bytes actually hashed.
    pub size: u64,
    /// The hashed bytes, kept only when `size` fits the retention limit.
    pub payload: Option<Bytes>,
}

/// Hashes a payload of any size.
///
/// Files are streamed through the hasher in chunks. The bytes are retained
/// for the upload stage only while they stay within `keep_up_to`, so an
/// oversized file is hashed without ever being held in memory.
pub fn fingerprint_source(
    source: &PayloadSource,
    keep_up_to: u64,
) -> Result<Fingerprint, HashingFailure> {
    match source {
        PayloadSource::Memory(bytes) => {
            let size = bytes.len() as u64;
            Ok(Fingerprint {
                digest: digest_bytes(bytes),
                size,
                payload: (size <= keep_up_to).then(|| bytes.clone()),
            })
        }
        PayloadSource::Path(path) => {
            let failure = |e: io::Error| HashingFailure::new(format!("{} ({})", e, source));
            let file = File::open(path).map_err(failure)?;
            let expected = file.metadata().map(|m| m.len()).unwrap_or(0);
            hash_reader(file, expected, keep_up_to).map_err(failure)
        }
    }
}

fn hash_reader<R: Read>(reader: R, expected: u64, keep_up_to: u64) -> io::Result<Fingerprint> {
    let mut reader = BufReader::with_capacity(READ_CHUNK, reader);
    let mut hasher = Sha256::new();
    let mut size = 0u64;
    let mut kept = (expected <= keep_up_to).then(|| Vec::with_capacity(expected as usize));

    loop {
        let chunk = match reader.fill_buf() {
            Ok([]) => break,
            Ok(chunk) => chunk,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let n = chunk.len();
        hasher.update(chunk);
        size += n as u64;
        if size > keep_up_to {
            kept = None;
        } else if let Some(buf) = kept.as_mut() {
            buf.extend_from_slice(chunk);
        }
        reader.consume(n);
    }

    Ok(Fingerprint {
        digest: FileDigest(hex::encode(hasher.finalize())),
        size,
        payload: kept.map(Bytes::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_has_known_digest() {
        assert_eq!(digest_bytes(b"").as_str(), EMPTY_DIGEST);
    }

    #[test]
    fn parse_normalises_case_and_rejects_garbage() {
        let upper = EMPTY_DIGEST.to_ascii_uppercase();
        assert_eq!(FileDigest::parse(&upper).unwrap().as_str(), EMPTY_DIGEST);
        assert!(FileDigest::parse("abc").is_none());
        assert!(FileDigest::parse(&"g".repeat(64)).is_none());
    }

    #[test]
    fn streamed_digest_matches_in_memory_digest() {
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let streamed = hash_reader(bytes.as_slice(), bytes.len() as u64, u64::MAX).unwrap();
        assert_eq!(streamed.digest, digest_bytes(&bytes));
        assert_eq!(streamed.size, 200_000);
        assert_eq!(streamed.payload.unwrap().as_ref(), bytes.as_slice());
    }

    #[test]
    fn payload_over_the_limit_is_not_retained() {
        let bytes = vec![9u8; 3 * READ_CHUNK + 5];
        // Declared size understates the real one, as for a file still growing.
        let hashed = hash_reader(bytes.as_slice(), 10, 2 * READ_CHUNK as u64).unwrap();
        assert_eq!(hashed.digest, digest_bytes(&bytes));
        assert_eq!(hashed.size, bytes.len() as u64);
        assert!(hashed.payload.is_none());
    }
}
