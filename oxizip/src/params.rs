//! Entry parameters and method enums.
//!
//! A [`ZipParameters`] value describes one entry to be written: method,
//! level, encryption, name, timestamps. Parameters are immutable per entry
//! and cloned per file when batch-adding.

use std::time::SystemTime;

/// ZIP compression method codes this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// Stored (no compression), code 0.
    Stored,
    /// DEFLATE, code 8.
    #[default]
    Deflate,
    /// The AES sentinel code 99; the real method hides in the AES extra
    /// data record.
    Aes,
    /// Any other code.
    Unknown(u16),
}

impl CompressionMethod {
    /// Map a raw method code.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Stored,
            8 => Self::Deflate,
            99 => Self::Aes,
            other => Self::Unknown(other),
        }
    }

    /// The raw method code.
    pub fn to_code(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
            Self::Aes => 99,
            Self::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => write!(f, "Stored"),
            Self::Deflate => write!(f, "Deflate"),
            Self::Aes => write!(f, "AES"),
            Self::Unknown(code) => write!(f, "Unknown({})", code),
        }
    }
}

/// Per-entry encryption method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMethod {
    /// No encryption.
    #[default]
    None,
    /// Legacy PKWARE stream cipher.
    ZipCrypto,
    /// AES-CTR with HMAC-SHA1 authentication.
    Aes,
}

/// AES key strength class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AesKeyStrength {
    /// AES-128: 16-byte key, 8-byte salt.
    Aes128 = 1,
    /// AES-192: 24-byte key, 12-byte salt.
    Aes192 = 2,
    /// AES-256: 32-byte key, 16-byte salt.
    #[default]
    Aes256 = 3,
}

impl AesKeyStrength {
    /// Salt length in bytes.
    pub fn salt_len(self) -> usize {
        match self {
            Self::Aes128 => 8,
            Self::Aes192 => 12,
            Self::Aes256 => 16,
        }
    }

    /// Cipher key length in bytes. The MAC key has the same length.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Total derived key material: cipher key + MAC key + 2-byte verifier.
    pub fn derived_key_len(self) -> usize {
        self.key_len() * 2 + 2
    }

    /// Map the key-strength code from an AES extra data record.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Aes128),
            2 => Some(Self::Aes192),
            3 => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// AES scheme version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum AesVersion {
    /// AE-1: the entry CRC is kept and verified in addition to the MAC.
    One = 1,
    /// AE-2: the stored CRC is forced to zero; the MAC alone carries
    /// integrity.
    #[default]
    Two = 2,
}

/// DEFLATE compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (stored blocks).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom level, clamped to 0-9.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// The level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

/// Parameters for one entry of a write session.
#[derive(Debug, Clone)]
pub struct ZipParameters {
    /// Name of the entry inside the archive; a trailing `/` marks a
    /// directory.
    pub file_name_in_zip: String,
    /// Compression method (`Stored` or `Deflate`; the AES sentinel is
    /// applied by the pipeline, not the caller).
    pub compression_method: CompressionMethod,
    /// DEFLATE level, ignored for stored entries.
    pub compression_level: CompressionLevel,
    /// Encryption method.
    pub encryption_method: EncryptionMethod,
    /// AES key strength, when AES encryption is selected.
    pub aes_key_strength: AesKeyStrength,
    /// AES scheme version, when AES encryption is selected.
    pub aes_version: AesVersion,
    /// Last modification time; the current time when absent.
    pub last_modified: Option<SystemTime>,
    /// Uncompressed size, required for stored non-directory entries.
    pub entry_size: Option<u64>,
    /// Pre-computed CRC-32; lets a stored entry get a complete local header
    /// with no trailing data descriptor.
    pub entry_crc: Option<u32>,
    /// Per-entry comment for the central directory record.
    pub comment: Option<String>,
}

impl ZipParameters {
    /// Parameters for a deflated, unencrypted entry.
    pub fn new(file_name_in_zip: impl Into<String>) -> Self {
        Self {
            file_name_in_zip: file_name_in_zip.into(),
            compression_method: CompressionMethod::Deflate,
            compression_level: CompressionLevel::DEFAULT,
            encryption_method: EncryptionMethod::None,
            aes_key_strength: AesKeyStrength::default(),
            aes_version: AesVersion::default(),
            last_modified: None,
            entry_size: None,
            entry_crc: None,
            comment: None,
        }
    }

    /// Whether the name marks a directory entry.
    pub fn is_directory(&self) -> bool {
        self.file_name_in_zip.ends_with('/')
    }

    /// Builder: set the compression method.
    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.compression_method = method;
        self
    }

    /// Builder: set the compression level.
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    /// Builder: select an encryption method.
    pub fn with_encryption(mut self, method: EncryptionMethod) -> Self {
        self.encryption_method = method;
        self
    }

    /// Builder: select the AES key strength.
    pub fn with_aes_strength(mut self, strength: AesKeyStrength) -> Self {
        self.aes_key_strength = strength;
        self
    }

    /// Builder: select the AES scheme version.
    pub fn with_aes_version(mut self, version: AesVersion) -> Self {
        self.aes_version = version;
        self
    }

    /// Builder: set the modification time.
    pub fn with_modified(mut self, time: SystemTime) -> Self {
        self.last_modified = Some(time);
        self
    }

    /// Builder: declare the uncompressed size.
    pub fn with_entry_size(mut self, size: u64) -> Self {
        self.entry_size = Some(size);
        self
    }

    /// Builder: supply a pre-computed CRC-32.
    pub fn with_entry_crc(mut self, crc: u32) -> Self {
        self.entry_crc = Some(crc);
        self
    }

    /// Builder: set the entry comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_codes() {
        assert_eq!(CompressionMethod::from_code(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_code(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_code(99), CompressionMethod::Aes);
        assert!(matches!(
            CompressionMethod::from_code(12),
            CompressionMethod::Unknown(12)
        ));
        assert_eq!(CompressionMethod::Unknown(12).to_code(), 12);
    }

    #[test]
    fn test_aes_strength_properties() {
        assert_eq!(AesKeyStrength::Aes128.salt_len(), 8);
        assert_eq!(AesKeyStrength::Aes128.key_len(), 16);
        assert_eq!(AesKeyStrength::Aes128.derived_key_len(), 34);

        assert_eq!(AesKeyStrength::Aes192.salt_len(), 12);
        assert_eq!(AesKeyStrength::Aes192.derived_key_len(), 50);

        assert_eq!(AesKeyStrength::Aes256.salt_len(), 16);
        assert_eq!(AesKeyStrength::Aes256.key_len(), 32);
        assert_eq!(AesKeyStrength::Aes256.derived_key_len(), 66);

        assert_eq!(AesKeyStrength::from_code(3), Some(AesKeyStrength::Aes256));
        assert_eq!(AesKeyStrength::from_code(9), None);
    }

    #[test]
    fn test_compression_level_clamps() {
        assert_eq!(CompressionLevel::new(100).level(), 9);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
    }

    #[test]
    fn test_directory_detection() {
        assert!(ZipParameters::new("docs/").is_directory());
        assert!(!ZipParameters::new("docs/readme.md").is_directory());
    }
}
