//! # OxiZip Core
//!
//! Core components for the OxiZip archive engine.
//!
//! This crate provides the fundamental building blocks shared by the codec
//! and pipeline layers:
//!
//! - [`bytes`]: Little-endian integer read/write helpers for binary records
//! - [`crc`]: Streaming CRC-32 (ISO 3309)
//! - [`error`]: The `ZipError` taxonomy and `Result` alias
//! - [`status`]: The shared progress/cancellation monitor for background tasks
//!
//! ## Architecture
//!
//! OxiZip is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Sessions                                            │
//! │     write/read pipelines, archive model, task wrapper   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Records & volumes                                   │
//! │     header codecs, split-volume sink/source             │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate + oxizip-crypto)             │
//! │     byte codecs, CRC-32, ciphers, KDF                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxizip_core::crc::Crc32;
//!
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bytes;
pub mod crc;
pub mod error;
pub mod status;

// Re-exports for convenience
pub use crc::Crc32;
pub use error::{Result, ZipError};
pub use status::{ProgressMonitor, TaskResult, TaskState};
