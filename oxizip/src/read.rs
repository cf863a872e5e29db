//! The streaming read pipeline.
//!
//! Opening an archive scans backward for the end of central directory
//! record, follows the Zip64 locator when present, and loads the central
//! directory into a [`ZipModel`]. Reading an entry seeks to its local
//! header, arms the inverse transform chain (decrypt, then decompress),
//! and verifies integrity at end-of-entry: the CRC-32 against the header or
//! trailing data descriptor, or the 10-byte authentication tag for AES.
//!
//! A [`StreamingZipReader`] walks local headers front to back instead,
//! for archives whose central directory is unavailable; entries whose
//! sizes live only in a data descriptor are then readable only when
//! unencrypted (the ciphertext boundary is unknowable in one forward pass).

use crate::header::{
    self, AesExtraDataRecord, CentralDirectoryHeader, LocalFileHeader, DATA_DESCRIPTOR_SIG,
    END_OF_CENTRAL_DIR_SIG, LOCAL_FILE_HEADER_SIG, ZIP64_MARKER_16, ZIP64_MARKER_32,
};
use crate::model::ZipModel;
use crate::params::{AesVersion, CompressionMethod, EncryptionMethod};
use crate::split::{ArchiveSource, SplitReader};
use encoding_rs::Encoding;
use flate2::{Decompress, FlushDecompress, Status};
use oxizip_core::bytes;
use oxizip_core::crc::Crc32;
use oxizip_core::error::{Result, ZipError};
use oxizip_crypto::aes::AesCtrZip;
use oxizip_crypto::pbkdf2::pbkdf2_hmac_sha1;
use oxizip_crypto::sha1::HmacSha1;
use oxizip_crypto::zipcrypto::{ZipCryptoKeys, ZIPCRYPTO_HEADER_SIZE};
use std::io::{self, Read, Write};

const CHUNK: usize = 32 * 1024;
const AES_KDF_ITERATIONS: u32 = 1000;
const AES_AUTH_TAG_LEN: usize = 10;
/// EOCD fixed part plus the largest possible comment.
const EOCD_SEARCH_WINDOW: u64 = 22 + 65535;

/// Open a file-backed archive (single volume or split) for reading.
pub fn open_archive(path: impl AsRef<std::path::Path>) -> Result<ZipReader<SplitReader>> {
    let path = path.as_ref();
    let source = SplitReader::open(path)?;
    let mut reader = ZipReader::new(source, None)?;
    reader.model.archive_path = Some(path.to_path_buf());
    Ok(reader)
}

/// A read session: the archive model plus the positioned source.
#[derive(Debug)]
pub struct ZipReader<S: ArchiveSource> {
    source: S,
    model: ZipModel,
    charset: Option<&'static Encoding>,
}

impl<S: ArchiveSource> ZipReader<S> {
    /// Parse the archive structure from a source.
    pub fn new(mut source: S, charset: Option<&'static Encoding>) -> Result<Self> {
        let model = parse_model(&mut source, charset)?;
        Ok(Self {
            source,
            model,
            charset,
        })
    }

    /// The parsed archive model.
    pub fn model(&self) -> &ZipModel {
        &self.model
    }

    /// Give up the source and keep the parsed model.
    pub fn into_model(self) -> ZipModel {
        self.model
    }

    /// The central directory headers.
    pub fn entries(&self) -> &[CentralDirectoryHeader] {
        self.model.entries()
    }

    /// Open the decryption/decompression pipeline for one entry.
    ///
    /// A wrong AES password fails here, before any plaintext is produced.
    pub fn entry_reader(
        &mut self,
        name: &str,
        password: Option<&[u8]>,
    ) -> Result<EntryReader<'_, S>> {
        let central = self
            .model
            .entry_by_name(name)
            .ok_or_else(|| ZipError::entry_not_found(name))?
            .clone();

        self.source
            .seek_to_disk(central.disk_number_start, central.local_header_offset)?;
        let local = header::read_local_file_header(&mut self.source, self.charset)?;

        // The central directory is authoritative for sizes and CRC; the
        // local copy may predate them.
        let fields = &central.fields;
        let config = EntryConfig {
            name: fields.filename.clone(),
            method: fields.actual_compression_method(),
            encryption: fields.encryption_method(),
            aes: fields.aes.or(local.fields.aes),
            compressed_size: Some(fields.compressed_size),
            expected_size: Some(fields.uncompressed_size),
            expected_crc: Some(fields.crc32),
            has_descriptor: false,
            descriptor_zip64: false,
        };
        EntryReader::open(&mut self.source, config, password)
    }

    /// Decode one entry fully into memory.
    pub fn read_entry_to_vec(&mut self, name: &str, password: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut reader = self.entry_reader(name, password)?;
        let mut out = Vec::new();
        reader.copy_to(&mut out)?;
        Ok(out)
    }
}

/// Locate and parse the trailer records, then load the central directory.
fn parse_model<S: ArchiveSource>(
    source: &mut S,
    charset: Option<&'static Encoding>,
) -> Result<ZipModel> {
    let len = source.logical_len()?;
    let window = len.min(EOCD_SEARCH_WINDOW);
    source.seek_logical(len - window)?;
    let mut tail = vec![0u8; window as usize];
    source.read_exact(&mut tail)?;

    let sig = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
    let eocd_offset_in_tail = tail
        .windows(4)
        .rposition(|w| w == sig)
        .ok_or_else(|| ZipError::corrupt_header("end of central directory not found"))?;
    let eocd_logical = len - window + eocd_offset_in_tail as u64;
    let eocd = header::parse_end_of_central_directory(&tail[eocd_offset_in_tail..])?;

    let mut model = ZipModel::new();
    model.charset = charset;

    // A Zip64 locator, if present, sits directly before the EOCD record.
    let mut locator = None;
    if eocd_logical >= 20 {
        source.seek_logical(eocd_logical - 20)?;
        let mut buf = [0u8; 20];
        source.read_exact(&mut buf)?;
        if bytes::u32_at(&buf, 0) == header::ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG {
            locator = Some(header::parse_zip64_eocd_locator(&buf)?);
        }
    }

    let (disk_number, cd_start_disk, total_entries, cd_offset);
    if let Some(locator) = locator {
        source.seek_to_disk(locator.eocd_start_disk, locator.eocd_offset)?;
        let zip64 = header::read_zip64_end_of_central_directory(source)?;
        disk_number = zip64.disk_number;
        cd_start_disk = zip64.cd_start_disk;
        total_entries = zip64.total_entries;
        cd_offset = zip64.cd_offset;
        model.zip64_locator = Some(locator);
        model.zip64_eocd = Some(zip64);
    } else {
        if eocd.total_entries == ZIP64_MARKER_16 as u64
            || eocd.cd_size == ZIP64_MARKER_32 as u64
            || eocd.cd_offset == ZIP64_MARKER_32 as u64
        {
            return Err(ZipError::corrupt_header(
                "Zip64 sentinel values without a Zip64 locator",
            ));
        }
        disk_number = eocd.disk_number;
        cd_start_disk = eocd.cd_start_disk;
        total_entries = eocd.total_entries;
        cd_offset = eocd.cd_offset;
    }

    model.split_archive = disk_number > 0;
    model.eocd = eocd;

    source.seek_to_disk(cd_start_disk, cd_offset)?;
    for _ in 0..total_entries {
        let entry = header::read_central_directory_header(source, charset)?;
        model.add_entry(entry)?;
    }

    Ok(model)
}

/// Everything the pipeline needs to know about one entry before decoding.
struct EntryConfig {
    name: String,
    method: CompressionMethod,
    encryption: EncryptionMethod,
    aes: Option<AesExtraDataRecord>,
    /// Total compressed size including cipher header and tag; `None` when
    /// only a trailing data descriptor knows it.
    compressed_size: Option<u64>,
    expected_size: Option<u64>,
    expected_crc: Option<u32>,
    has_descriptor: bool,
    descriptor_zip64: bool,
}

#[derive(Debug)]
enum Decompressor {
    Stored,
    Deflate(Box<Decompress>),
}

#[derive(Debug)]
enum Decryptor {
    None,
    ZipCrypto(ZipCryptoKeys),
    Aes {
        ctr: AesCtrZip,
        mac: HmacSha1,
        version: AesVersion,
    },
}

/// Streaming decoder for a single entry.
///
/// Implements [`Read`]; end-of-entry verification runs when the logical end
/// is reached, so draining the reader (or calling [`EntryReader::copy_to`])
/// is what proves integrity.
#[derive(Debug)]
pub struct EntryReader<'a, S: ArchiveSource> {
    source: &'a mut S,
    name: String,
    decompressor: Decompressor,
    decryptor: Decryptor,
    /// Compressed payload bytes left to read (cipher header and AES tag
    /// excluded); `None` when unknown until the data descriptor.
    data_remaining: Option<u64>,
    bounded: bool,
    has_descriptor: bool,
    descriptor_zip64: bool,
    expected_crc: Option<u32>,
    expected_size: Option<u64>,
    crc: Crc32,
    produced: u64,
    raw: Vec<u8>,
    /// Undecrypted copy of the staged bytes, for push-back in unbounded mode.
    raw_cipher: Vec<u8>,
    raw_start: usize,
    raw_end: usize,
    stream_ended: bool,
    finished: bool,
}

impl<'a, S: ArchiveSource> EntryReader<'a, S> {
    /// Arm the pipeline: consume the cipher header, derive keys, and verify
    /// the AES password verifier.
    fn open(source: &'a mut S, config: EntryConfig, password: Option<&[u8]>) -> Result<Self> {
        let mut data_remaining = config.compressed_size;

        let decryptor = match config.encryption {
            EncryptionMethod::None => Decryptor::None,
            EncryptionMethod::ZipCrypto => {
                let password = non_empty_password(password)?;
                let Some(remaining) = data_remaining.as_mut() else {
                    return Err(ZipError::corrupt_header(
                        "encrypted entry with unknown size needs the central directory",
                    ));
                };
                if *remaining < ZIPCRYPTO_HEADER_SIZE as u64 {
                    return Err(ZipError::corrupt_header("entry shorter than its cipher header"));
                }
                let mut crypto_header = [0u8; ZIPCRYPTO_HEADER_SIZE];
                source.read_exact(&mut crypto_header)?;
                *remaining -= ZIPCRYPTO_HEADER_SIZE as u64;

                let mut keys = ZipCryptoKeys::new(password);
                // The header check byte catches most wrong passwords but not
                // all; the end-of-entry CRC is authoritative, so a mismatch
                // here is not treated as proof of anything.
                let _check_byte = keys.decrypt_header(&crypto_header);
                Decryptor::ZipCrypto(keys)
            }
            EncryptionMethod::Aes => {
                let password = non_empty_password(password)?;
                let record = config.aes.ok_or_else(|| {
                    ZipError::corrupt_header("AES entry without an AES extra data record")
                })?;
                let Some(remaining) = data_remaining.as_mut() else {
                    return Err(ZipError::corrupt_header(
                        "encrypted entry with unknown size needs the central directory",
                    ));
                };
                let strength = record.strength;
                let overhead = (strength.salt_len() + 2 + AES_AUTH_TAG_LEN) as u64;
                if *remaining < overhead {
                    return Err(ZipError::corrupt_header("entry shorter than its cipher header"));
                }

                let mut salt = vec![0u8; strength.salt_len()];
                source.read_exact(&mut salt)?;
                let mut stored_verifier = [0u8; 2];
                source.read_exact(&mut stored_verifier)?;
                *remaining -= overhead;

                let derived = pbkdf2_hmac_sha1(
                    password,
                    &salt,
                    AES_KDF_ITERATIONS,
                    strength.derived_key_len(),
                );
                let key_len = strength.key_len();
                let derived_verifier = &derived[key_len * 2..key_len * 2 + 2];
                if derived_verifier != stored_verifier {
                    return Err(ZipError::WrongPassword);
                }

                Decryptor::Aes {
                    ctr: AesCtrZip::new(&derived[..key_len])?,
                    mac: HmacSha1::new(&derived[key_len..key_len * 2]),
                    version: record.version,
                }
            }
        };

        let decompressor = match config.method {
            CompressionMethod::Stored => Decompressor::Stored,
            CompressionMethod::Deflate => Decompressor::Deflate(Box::new(Decompress::new(false))),
            other => return Err(ZipError::unsupported_method(other.to_string())),
        };
        if matches!(decompressor, Decompressor::Stored) && data_remaining.is_none() {
            return Err(ZipError::corrupt_header(
                "stored entry with unknown size needs the central directory",
            ));
        }

        Ok(Self {
            source,
            name: config.name,
            decompressor,
            decryptor,
            bounded: data_remaining.is_some(),
            data_remaining,
            has_descriptor: config.has_descriptor,
            descriptor_zip64: config.descriptor_zip64,
            expected_crc: config.expected_crc,
            expected_size: config.expected_size,
            crc: Crc32::new(),
            produced: 0,
            raw: Vec::new(),
            raw_cipher: Vec::new(),
            raw_start: 0,
            raw_end: 0,
            stream_ended: false,
            finished: false,
        })
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded bytes produced so far.
    pub fn bytes_produced(&self) -> u64 {
        self.produced
    }

    /// Stage the next chunk of compressed payload, decrypting in place.
    /// Returns false when the payload is exhausted.
    fn fill_raw(&mut self) -> Result<bool> {
        let want = match self.data_remaining {
            Some(0) => return Ok(false),
            Some(n) => n.min(CHUNK as u64) as usize,
            None => CHUNK,
        };
        self.raw.resize(want, 0);
        let n = self.source.read(&mut self.raw[..want])?;
        if n == 0 {
            if self.data_remaining.is_some() {
                return Err(ZipError::corrupt_header(format!(
                    "entry '{}' payload is truncated",
                    self.name
                )));
            }
            return Ok(false);
        }
        if let Some(remaining) = self.data_remaining.as_mut() {
            *remaining -= n as u64;
        }
        if !self.bounded {
            self.raw_cipher.clear();
            self.raw_cipher.extend_from_slice(&self.raw[..n]);
        }

        match &mut self.decryptor {
            Decryptor::None => {}
            Decryptor::ZipCrypto(keys) => keys.decrypt_buffer(&mut self.raw[..n]),
            Decryptor::Aes { ctr, mac, .. } => {
                // The MAC covers ciphertext
                mac.update(&self.raw[..n]);
                ctr.process(&mut self.raw[..n]);
            }
        }
        self.raw_start = 0;
        self.raw_end = n;
        Ok(true)
    }

    /// Decode into `buf`, returning 0 only at the (verified) end of entry.
    fn read_decoded(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        loop {
            match &mut self.decompressor {
                Decompressor::Stored => {
                    if self.raw_start == self.raw_end && !self.fill_raw()? {
                        self.finish_entry()?;
                        return Ok(0);
                    }
                    let n = buf.len().min(self.raw_end - self.raw_start);
                    buf[..n].copy_from_slice(&self.raw[self.raw_start..self.raw_start + n]);
                    self.raw_start += n;
                    self.crc.update(&buf[..n]);
                    self.produced += n as u64;
                    return Ok(n);
                }
                Decompressor::Deflate(_) => {
                    if self.stream_ended {
                        self.finish_entry()?;
                        return Ok(0);
                    }
                    if self.raw_start == self.raw_end && !self.fill_raw()? {
                        return Err(ZipError::corrupt_header(format!(
                            "entry '{}' ends before its compressed stream does",
                            self.name
                        )));
                    }

                    let Decompressor::Deflate(inflater) = &mut self.decompressor else {
                        unreachable!()
                    };
                    let before_in = inflater.total_in();
                    let before_out = inflater.total_out();
                    let status = inflater
                        .decompress(
                            &self.raw[self.raw_start..self.raw_end],
                            buf,
                            FlushDecompress::None,
                        )
                        .map_err(|e| {
                            ZipError::corrupt_header(format!(
                                "entry '{}': {}",
                                self.name, e
                            ))
                        })?;
                    let consumed = (inflater.total_in() - before_in) as usize;
                    let produced = (inflater.total_out() - before_out) as usize;
                    self.raw_start += consumed;
                    self.crc.update(&buf[..produced]);
                    self.produced += produced as u64;

                    if status == Status::StreamEnd {
                        self.stream_ended = true;
                        if !self.bounded && self.raw_start < self.raw_end {
                            // Over-read bytes belong to the next structure
                            self.source
                                .unread(&self.raw_cipher[self.raw_start..self.raw_end]);
                            self.raw_start = self.raw_end;
                        }
                    }
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
            }
        }
    }

    /// End-of-entry bookkeeping: drain leftover ciphertext, read the data
    /// descriptor when it carries the values, and verify CRC or tag.
    fn finish_entry(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // Any payload bytes the decompressor did not need still belong to
        // the entry; the AES tag covers them.
        let mut drain = [0u8; 1024];
        while matches!(self.data_remaining, Some(n) if n > 0) {
            let want = self
                .data_remaining
                .unwrap_or(0)
                .min(drain.len() as u64) as usize;
            let n = self.source.read(&mut drain[..want])?;
            if n == 0 {
                return Err(ZipError::corrupt_header(format!(
                    "entry '{}' payload is truncated",
                    self.name
                )));
            }
            if let Decryptor::Aes { mac, .. } = &mut self.decryptor {
                mac.update(&drain[..n]);
            }
            if let Some(remaining) = self.data_remaining.as_mut() {
                *remaining -= n as u64;
            }
        }

        if self.has_descriptor && self.expected_crc.is_none() {
            let descriptor = header::read_data_descriptor(self.source, self.descriptor_zip64)?;
            self.expected_crc = Some(descriptor.crc32);
            self.expected_size = Some(descriptor.uncompressed_size);
        }

        match &mut self.decryptor {
            Decryptor::Aes { mac, version, .. } => {
                let mut stored_tag = [0u8; AES_AUTH_TAG_LEN];
                self.source.read_exact(&mut stored_tag)?;
                let computed = mac.clone().finalize();
                if computed[..AES_AUTH_TAG_LEN] != stored_tag {
                    return Err(ZipError::integrity_check_failed(
                        &self.name,
                        "authentication tag mismatch",
                    ));
                }
                // AE-1 carries a real CRC alongside the tag
                if *version == AesVersion::One {
                    verify_crc(&self.name, self.expected_crc, self.crc.value())?;
                }
            }
            _ => {
                verify_crc(&self.name, self.expected_crc, self.crc.value())?;
                if let Some(expected) = self.expected_size {
                    if self.produced != expected {
                        return Err(ZipError::integrity_check_failed(
                            &self.name,
                            format!("expected {} bytes, decoded {}", expected, self.produced),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode the whole entry into a writer, verifying integrity at the end.
    pub fn copy_to<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        let mut buf = vec![0u8; CHUNK];
        let mut total = 0u64;
        loop {
            let n = self.read_decoded(&mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            writer.write_all(&buf[..n])?;
            total += n as u64;
        }
    }
}

fn verify_crc(name: &str, expected: Option<u32>, computed: u32) -> Result<()> {
    if let Some(expected) = expected {
        if expected != computed {
            return Err(ZipError::integrity_check_failed(
                name,
                format!("CRC expected {:#010x}, computed {:#010x}", expected, computed),
            ));
        }
    }
    Ok(())
}

fn non_empty_password(password: Option<&[u8]>) -> Result<&[u8]> {
    match password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ZipError::invalid_configuration(
            "encrypted entry needs a password",
        )),
    }
}

impl<S: ArchiveSource> Read for EntryReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_decoded(buf).map_err(io::Error::other)
    }
}

/// Forward-only reader that walks local headers without a central
/// directory scan.
pub struct StreamingZipReader<S: ArchiveSource> {
    source: S,
    charset: Option<&'static Encoding>,
    at_start: bool,
}

impl<S: ArchiveSource> StreamingZipReader<S> {
    /// Start a sequential walk at the front of the archive.
    pub fn new(source: S, charset: Option<&'static Encoding>) -> Self {
        Self {
            source,
            charset,
            at_start: true,
        }
    }

    /// Open the next entry, or `None` at the central directory.
    ///
    /// Each entry must be fully drained before the next call so the source
    /// is positioned at the following record.
    pub fn next_entry(&mut self, password: Option<&[u8]>) -> Result<Option<EntryReader<'_, S>>> {
        let mut sig = [0u8; 4];
        if self.at_start {
            self.at_start = false;
            // A split archive marks its first volume with the descriptor
            // signature; skip it when present.
            if let Err(e) = self.source.read_exact(&mut sig) {
                return if e.kind() == io::ErrorKind::UnexpectedEof {
                    Ok(None)
                } else {
                    Err(e.into())
                };
            }
            if bytes::u32_at(&sig, 0) != DATA_DESCRIPTOR_SIG {
                self.source.unread(&sig);
            }
        }

        if let Err(e) = self.source.read_exact(&mut sig) {
            return if e.kind() == io::ErrorKind::UnexpectedEof {
                Ok(None)
            } else {
                Err(e.into())
            };
        }
        let signature = bytes::u32_at(&sig, 0);
        self.source.unread(&sig);
        if signature != LOCAL_FILE_HEADER_SIG {
            // The central directory (or trailer) ends the entry walk
            return Ok(None);
        }

        let local = header::read_local_file_header(&mut self.source, self.charset)?;
        let config = config_from_local(&local);
        EntryReader::open(&mut self.source, config, password).map(Some)
    }
}

/// Build a pipeline config from a local header alone.
fn config_from_local(local: &LocalFileHeader) -> EntryConfig {
    let fields = &local.fields;
    let has_descriptor = fields.has_data_descriptor();
    // With a data descriptor pending, zeroed fields mean "unknown"; a
    // stored entry still carries its real sizes up front.
    let sizes_known = !has_descriptor || fields.compressed_size != 0;
    EntryConfig {
        name: fields.filename.clone(),
        method: fields.actual_compression_method(),
        encryption: fields.encryption_method(),
        aes: fields.aes,
        compressed_size: sizes_known.then_some(fields.compressed_size),
        expected_size: sizes_known.then_some(fields.uncompressed_size),
        expected_crc: (!has_descriptor).then_some(fields.crc32),
        has_descriptor,
        descriptor_zip64: fields.compressed_size >= ZIP64_MARKER_32 as u64
            || fields.uncompressed_size >= ZIP64_MARKER_32 as u64,
    }
}
