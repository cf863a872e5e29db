//! # OxiZip Crypto
//!
//! Cipher primitives specific to the ZIP format, implemented in pure Rust:
//!
//! - [`sha1`]: SHA-1 (RFC 3174) and streaming HMAC-SHA1 (RFC 2104)
//! - [`pbkdf2`]: PBKDF2-HMAC-SHA1 key derivation (RFC 2898)
//! - [`aes`]: AES-128/192/256 block cipher (FIPS 197) and the ZIP CTR mode
//! - [`zipcrypto`]: the legacy PKWARE 3-key stream cipher
//!
//! **Security warning**: ZipCrypto is cryptographically weak and kept only
//! for compatibility with existing archives. Use the AES mode for anything
//! that matters.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aes;
pub mod pbkdf2;
pub mod sha1;
pub mod zipcrypto;

// Re-exports for convenience
pub use aes::{Aes, AesCtrZip, AES_BLOCK_SIZE};
pub use pbkdf2::pbkdf2_hmac_sha1;
pub use sha1::{hmac_sha1, sha1, HmacSha1};
pub use zipcrypto::{ZipCryptoKeys, ZIPCRYPTO_HEADER_SIZE};
