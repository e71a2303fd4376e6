//! Scrivener Content Cache
//!
//! Maps a document's content fingerprint to the plain text previously extracted from
//! it, so that OCR runs at most once per distinct document.
//!
//! # Layout
//!
//! One file per fingerprint, `<cache_dir>/<sha256-hex>.txt`, holding the extracted text
//! verbatim as UTF-8 with no header. Entries are never rewritten in place: a changed
//! document has a different fingerprint and therefore a different entry.
//!
//! Writes go through a temporary file in the cache directory followed by a rename, so
//! a concurrent reader never observes a partially written entry.
//!
//! # Examples
//!
//! ```no_run
//! use scrivener_domain::traits::TextCache;
//! use scrivener_store::{fingerprint_file, FileCache};
//! use std::path::Path;
//!
//! let cache = FileCache::open("/var/cache/scrivener").unwrap();
//! let fp = fingerprint_file(Path::new("agreement.pdf")).unwrap();
//! if cache.get(&fp).unwrap().is_none() {
//!     cache.put(&fp, "extracted text").unwrap();
//! }
//! ```

#![warn(missing_docs)]

mod atomic;
mod fingerprint;

pub use atomic::write_atomic;
pub use fingerprint::{fingerprint_bytes, fingerprint_file, fingerprint_reader};

use scrivener_domain::traits::TextCache;
use scrivener_domain::Fingerprint;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File extension of cache entries
pub const ENTRY_EXTENSION: &str = "txt";

/// Errors that can occur during cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem error on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Read error from a stream with no associated path
    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),

    /// A digest could not be turned into a fingerprint
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// An entry exists but is not valid UTF-8
    #[error("Corrupt cache entry: {0}")]
    Corrupt(PathBuf),
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory-backed [`TextCache`]
///
/// A disabled cache (see [`FileCache::open_or_disabled`]) misses on every lookup and
/// discards every write.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: Option<PathBuf>,
}

impl FileCache {
    /// Open the cache rooted at `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, CacheError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        Ok(Self {
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Open the cache at `dir`, or fall back to a disabled cache if the directory
    /// cannot be created
    pub fn open_or_disabled<P: AsRef<Path>>(dir: P) -> Self {
        match Self::open(dir) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Text cache disabled: {}", e);
                Self::disabled()
            }
        }
    }

    /// A cache that always misses
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Whether entries are actually stored
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Cache directory, if enabled
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Path of the entry for `fingerprint`, if enabled
    pub fn entry_path(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", fingerprint.as_str(), ENTRY_EXTENSION)))
    }
}

impl TextCache for FileCache {
    type Error = CacheError;

    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, CacheError> {
        let Some(path) = self.entry_path(fingerprint) else {
            return Ok(None);
        };

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(CacheError::Corrupt(path)),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    fn put(&self, fingerprint: &Fingerprint, text: &str) -> Result<(), CacheError> {
        let Some(path) = self.entry_path(fingerprint) else {
            return Ok(());
        };

        // A readable entry is kept; one that no longer decodes is replaced.
        match fs::read(&path) {
            Ok(existing) if std::str::from_utf8(&existing).is_ok() => {
                debug!("Cache entry {} already present", fingerprint.short());
                return Ok(());
            }
            Ok(_) => warn!("Replacing corrupt cache entry {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(&path, e)),
        }

        write_atomic(&path, text.as_bytes())?;
        debug!("Cached {} bytes under {}", text.len(), fingerprint.short());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_cache_always_misses() {
        let cache = FileCache::disabled();
        let fp = fingerprint_bytes(b"document").unwrap();

        cache.put(&fp, "text").unwrap();
        assert_eq!(cache.get(&fp).unwrap(), None);
        assert!(!cache.is_enabled());
        assert!(cache.entry_path(&fp).is_none());
    }

    #[test]
    fn test_error_display_names_path() {
        let err = CacheError::io(
            Path::new("/nowhere/cache"),
            std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/nowhere/cache"));
    }
}
