//! Content fingerprinting.
//!
//! A fingerprint is the SHA-256 digest of a file's byte content, hex-encoded.
//! Identical bytes always yield an identical digest, so two manifests can be
//! compared without re-reading any file content. This is a change-detection
//! identity, not a security boundary.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size; memory use stays flat regardless of file size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Incremental fingerprint computation, for callers that already stream the
/// file for another purpose (the archiver hashes while it archives, so each
/// source file is read exactly once).
#[derive(Default)]
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Fingerprint an arbitrary byte stream in bounded chunks.
///
/// Read errors propagate; a partial digest is never returned.
pub fn fingerprint_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut builder = FingerprintBuilder::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        builder.update(&buf[..n]);
    }

    Ok(builder.finish())
}

/// Fingerprint a file on disk.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    fingerprint_reader(&mut file)
}
