//! Error types for `ResKit`

use std::path::PathBuf;

use thiserror::Error;

use crate::index::ResType;

/// The error type for `ResKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A package archive could not be opened or an entry could not be extracted.
    #[error("archive error: {0}")]
    Archive(String),

    // ==================== Index Format Errors ====================
    /// The index data is structurally invalid (bad tag, offset or count out of bounds).
    #[error("malformed index data at offset {offset}: {context}")]
    MalformedData {
        /// What was being decoded when the problem was found.
        context: String,
        /// Byte offset of the offending field.
        offset: usize,
    },

    /// A read needed more bytes than the buffer holds.
    #[error("allocation failure: needed {requested} bytes at offset {offset}, {available} available")]
    AllocationFailure {
        /// Number of bytes the read required.
        requested: usize,
        /// Byte offset the read started at.
        offset: usize,
        /// Number of bytes remaining in the buffer.
        available: usize,
    },

    /// The index uses a layout this library does not recognise.
    #[error("unrecognised index layout: {0}")]
    UnknownIndexFormat(String),

    // ==================== Lookup Errors ====================
    /// No resource matched the id or name, or no variant matched the configuration.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A resource was found but has a different type than requested.
    #[error("resource {id:#x} has type {found}, expected {expected}")]
    TypeMismatch {
        /// Resource id.
        id: u32,
        /// Type the caller asked for.
        expected: ResType,
        /// Type stored in the package.
        found: ResType,
    },

    /// A reference chain or parent chain exceeded the maximum depth.
    #[error("reference chain too deep resolving '{value}' (limit {depth})")]
    ReferenceTooDeep {
        /// The value whose resolution was abandoned.
        value: String,
        /// The depth limit that was hit.
        depth: usize,
    },

    /// A stored value could not be interpreted as the requested kind.
    #[error("cannot parse '{value}' as {kind}")]
    ParseValue {
        /// The raw value.
        value: String,
        /// The kind that was expected (boolean, integer, color, ...).
        kind: &'static str,
    },

    // ==================== Package Management Errors ====================
    /// The package path is already loaded in this manager.
    #[error("package already loaded: {0}")]
    AlreadyLoaded(PathBuf),

    /// The package path is not loaded in this manager.
    #[error("package not loaded: {0}")]
    NotLoaded(PathBuf),

    /// A lock guarding shared state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    // ==================== Argument / Config Errors ====================
    /// An argument was out of range or ill-formed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A string's placeholders did not fit the supplied format arguments.
    #[error("cannot format string: {0}")]
    Format(String),

    /// A settings file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::MalformedData`].
    pub(crate) fn malformed(context: impl Into<String>, offset: usize) -> Self {
        Error::MalformedData {
            context: context.into(),
            offset,
        }
    }

    /// Whether this error means "nothing matched" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Io(std::io::Error::other(err.to_string()))
    }
}

/// A specialized Result type for `ResKit` operations.
pub type Result<T> = std::result::Result<T, Error>;
