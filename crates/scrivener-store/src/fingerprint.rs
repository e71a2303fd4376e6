//! SHA-256 content fingerprints over a document's full byte content

use crate::CacheError;
use scrivener_domain::Fingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Fingerprint an in-memory buffer
pub fn fingerprint_bytes(bytes: &[u8]) -> Result<Fingerprint, CacheError> {
    digest_to_fingerprint(Sha256::digest(bytes).as_slice())
}

/// Fingerprint everything readable from `reader`
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<Fingerprint, CacheError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).map_err(CacheError::Read)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    digest_to_fingerprint(hasher.finalize().as_slice())
}

/// Fingerprint the file at `path`
///
/// Every byte of the file contributes; two files that differ anywhere get different
/// fingerprints.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, CacheError> {
    let file = File::open(path).map_err(|e| CacheError::io(path, e))?;
    fingerprint_reader(BufReader::with_capacity(BUF_SIZE, file)).map_err(|e| match e {
        CacheError::Read(e) => CacheError::io(path, e),
        other => other,
    })
}

fn digest_to_fingerprint(digest: &[u8]) -> Result<Fingerprint, CacheError> {
    Fingerprint::from_hex(&hex::encode(digest)).map_err(CacheError::InvalidFingerprint)
}
