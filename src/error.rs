//! Error taxonomy shared by every layer of the store.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the selector engine, the config store and the façade.
#[derive(Debug, Error)]
pub enum Error {
    /// The selector was empty.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        selector: String,
        reason: &'static str,
    },

    /// A segment of the selector does not exist in the document.
    #[error("key `{segment}` not found while resolving `{path}`")]
    KeyNotFound { segment: String, path: String },

    /// A non-terminal segment resolved to a scalar instead of a table.
    #[error("`{segment}` in `{path}` holds a {found}, expected a table")]
    TypeMismatch {
        segment: String,
        path: String,
        found: &'static str,
    },

    /// The backing file exists but does not hold a valid document.
    #[error("store file {} is corrupt: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The store directory path is occupied by something other than a directory.
    #[error("{} exists but is not a directory", path.display())]
    DirectoryConflict { path: PathBuf },

    /// The store directory could not be determined from the given input.
    #[error("invalid store directory: {0}")]
    InvalidStoreDirectory(String),

    /// The write would clobber the store's reserved `meta` timestamps.
    #[error("cannot write `{path}`: {reason}")]
    ReservedKey { path: String, reason: &'static str },

    /// A timestamp falls outside the four-digit years TOML can store.
    #[error("year {year} is out of range for a stored timestamp (0..=9999)")]
    TimestampOutOfRange { year: i32 },

    /// `destroy` was called on a store that was not opened in testing mode.
    #[error("refusing to destroy {}: store was not opened in testing mode", path.display())]
    DestroyRefused { path: PathBuf },

    /// The document could not be rendered as TOML.
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A file system operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for [`Error::KeyNotFound`], so callers can treat absence as a value.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Why a store file could not be turned into a [`Document`](crate::Document).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// The file holds a value the store cannot represent.
    #[error("unsupported {kind} value at `{key}`")]
    UnsupportedValue { key: String, kind: &'static str },
}
