//! Error types for OxiZip operations.
//!
//! One enum covers the whole engine: binary-structure errors, password and
//! integrity failures, split-volume topology errors, and configuration
//! mistakes caught before any I/O happens.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for OxiZip operations.
#[derive(Debug, Error)]
pub enum ZipError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or truncated binary structure. Fatal to the read of the
    /// archive or entry it occurred in.
    #[error("Corrupt header: {message}")]
    CorruptHeader {
        /// Description of the structural problem.
        message: String,
    },

    /// A local file header that is logically inconsistent (e.g. a stored,
    /// non-directory entry recorded with zero size).
    #[error("Invalid local file header: {message}")]
    InvalidLocalFileHeader {
        /// Description of the inconsistency.
        message: String,
    },

    /// Password verifier mismatch. Raised before any plaintext is returned;
    /// recoverable by retrying with a different password.
    #[error("Wrong password")]
    WrongPassword,

    /// CRC or MAC mismatch at end-of-entry. Fatal to that entry; the session
    /// may continue with other entries.
    #[error("Integrity check failed for '{name}': {detail}")]
    IntegrityCheckFailed {
        /// Entry name.
        name: String,
        /// What failed (CRC value pair, MAC mismatch, size mismatch).
        detail: String,
    },

    /// Unknown compression or encryption method code.
    #[error("Unsupported method: {method}")]
    UnsupportedMethod {
        /// The method identifier.
        method: String,
    },

    /// An expected split volume does not exist. Fatal to the session.
    #[error("Split volume missing: {}", path.display())]
    SplitFileMissing {
        /// Path of the missing volume.
        path: PathBuf,
    },

    /// Split volume numbering is inconsistent with the archive. Fatal to the
    /// session.
    #[error("Invalid split volume sequence: {message}")]
    InvalidSplitSequence {
        /// Description of the topology problem.
        message: String,
    },

    /// A write was attempted after the AES-CTR stream emitted its final,
    /// non-block-aligned output. Programming error.
    #[error("Encryptor already finished")]
    EncryptorFinished,

    /// Invalid parameters, rejected before any I/O.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the rejected configuration.
        message: String,
    },

    /// Entry not found in the archive.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// Name of the missing entry.
        name: String,
    },

    /// Entry name escapes the extraction root (e.g. contains "..").
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious entry name.
        path: String,
    },

    /// The operation was cancelled through its progress monitor.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for OxiZip operations.
pub type Result<T> = std::result::Result<T, ZipError>;

impl ZipError {
    /// Create a corrupt header error.
    pub fn corrupt_header(message: impl Into<String>) -> Self {
        Self::CorruptHeader {
            message: message.into(),
        }
    }

    /// Create an invalid local file header error.
    pub fn invalid_local_file_header(message: impl Into<String>) -> Self {
        Self::InvalidLocalFileHeader {
            message: message.into(),
        }
    }

    /// Create an integrity check failure.
    pub fn integrity_check_failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IntegrityCheckFailed {
            name: name.into(),
            detail: detail.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a missing split volume error.
    pub fn split_file_missing(path: impl Into<PathBuf>) -> Self {
        Self::SplitFileMissing { path: path.into() }
    }

    /// Create an invalid split sequence error.
    pub fn invalid_split_sequence(message: impl Into<String>) -> Self {
        Self::InvalidSplitSequence {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an entry not found error.
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound { name: name.into() }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }
}
