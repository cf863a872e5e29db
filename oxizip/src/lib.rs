//! # OxiZip
//!
//! A ZIP archive codec engine: binary headers (including Zip64 and split
//! extensions), a split-volume virtual I/O layer, streaming pipelines that
//! compose checksum, compression, and encryption transforms, and the
//! ZIP-specific cipher constructions (ZipCrypto and AES-CTR with HMAC-SHA1
//! authentication, AE-1/AE-2).
//!
//! The engine decides nothing about *what* to archive: callers hand it
//! sinks, sources, and per-entry parameters, and optionally poll a shared
//! progress monitor while a worker thread runs one operation.
//!
//! ## Writing
//!
//! ```rust,no_run
//! use oxizip::{CountingWriter, ZipParameters, ZipWriter};
//! use oxizip::params::EncryptionMethod;
//!
//! # fn main() -> oxizip::Result<()> {
//! let sink = CountingWriter::new(Vec::new());
//! let mut writer = ZipWriter::new(sink, Some(b"secret".as_slice()))?;
//!
//! let params = ZipParameters::new("notes.txt").with_encryption(EncryptionMethod::Aes);
//! writer.put_next_entry(&params)?;
//! writer.write(b"the payload")?;
//! writer.close_entry()?;
//!
//! let (model, sink) = writer.finish()?;
//! assert_eq!(model.len(), 1);
//! # let _ = sink; Ok(())
//! # }
//! ```
//!
//! ## Reading
//!
//! ```rust,no_run
//! # fn main() -> oxizip::Result<()> {
//! let mut reader = oxizip::open_archive("bundle.zip")?;
//! let names: Vec<String> = reader
//!     .entries()
//!     .iter()
//!     .map(|e| e.fields.filename.clone())
//!     .collect();
//! for name in names {
//!     let data = reader.read_entry_to_vec(&name, Some(b"secret".as_slice()))?;
//!     println!("{}: {} bytes", name, data.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod header;
pub mod model;
pub mod params;
pub mod read;
pub mod split;
pub mod task;
pub mod write;

// Re-exports for convenience
pub use model::ZipModel;
pub use oxizip_core::crc::Crc32;
pub use oxizip_core::error::{Result, ZipError};
pub use oxizip_core::status::{ProgressMonitor, TaskResult, TaskState};
pub use params::{
    AesKeyStrength, AesVersion, CompressionLevel, CompressionMethod, EncryptionMethod,
    ZipParameters,
};
pub use read::{open_archive, EntryReader, StreamingZipReader, ZipReader};
pub use split::{
    ArchiveSink, ArchiveSource, CountingWriter, SeekableSource, SplitNaming, SplitReader,
    SplitWriter, MIN_SPLIT_LENGTH,
};
pub use task::{copy_with_monitor, run_in_background, run_monitored};
pub use write::ZipWriter;
