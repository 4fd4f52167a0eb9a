// error.rs

#[cfg(feature = "cli")]
use indicatif::style::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsIndexError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("index \"{}\" exists, stubbornly refusing to proceed", .0.display())]
    DestinationExists(PathBuf),

    #[error("\"{}\" is not an rsidx index, refusing to overwrite it", .0.display())]
    NotAStore(PathBuf),

    #[error("Invalid rsID \"{0}\": expected an integer, optionally prefixed with \"rs\"")]
    InvalidIdentifier(String),

    #[error("Malformed record, no identifier field: {0}")]
    MalformedRecord(String),

    #[error("Index \"{}\" is incomplete or missing its key index", .0.display())]
    StoreNotFinalized(PathBuf),

    #[error("Incompatible index format version {found} (expected {expected})")]
    IncompatibleStore { found: u32, expected: u32 },

    #[error("Unsorted keys in block: found key {current} after {previous}")]
    UnsortedKeys { previous: u64, current: u64 },

    #[error("Block offset {0} is not in the index")]
    InvalidOffset(u64),

    #[error("Region retrieval failed: {0}")]
    Retrieval(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Bincode error: {0}")]
    BincodeError(String),

    #[error("{0}")]
    StringError(String),

    #[cfg(feature = "cli")]
    #[error("{0}")]
    StreamError(#[from] crate::io::IoError),

    #[cfg(feature = "cli")]
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
}

// Add a convenience implementation for &str errors
impl From<&str> for RsIndexError {
    fn from(error: &str) -> Self {
        RsIndexError::StringError(error.to_string())
    }
}

impl From<String> for RsIndexError {
    fn from(error: String) -> Self {
        RsIndexError::StringError(error)
    }
}

impl From<Box<bincode::ErrorKind>> for RsIndexError {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        RsIndexError::BincodeError(error.to_string())
    }
}
