//! The streaming write pipeline.
//!
//! Per entry the pipeline composes: plaintext CRC/byte counting, a
//! compressor stage (store passthrough or DEFLATE), an encryptor stage
//! (none, ZipCrypto, or AES-CTR), and the positioned sink. The stages are
//! chosen once when the entry opens; each is a plain push transform.
//!
//! A session writes, per entry: local header, optional cipher header
//! (ZipCrypto 12-byte header, or AES salt + verifier), transformed payload,
//! optional AES tag, optional data descriptor. Closing the session writes
//! the central directory, Zip64 records when any value overflows, and the
//! end of central directory record.

use crate::header::{
    self, AesExtraDataRecord, CentralDirectoryHeader, DataDescriptor, EndOfCentralDirectory,
    EntryFields, LocalFileHeader, Zip64EndOfCentralDirectory, Zip64EocdLocator, FLAG_DATA_DESCRIPTOR,
    FLAG_ENCRYPTED, FLAG_UTF8, ZIP64_MARKER_16, ZIP64_MARKER_32,
};
use crate::model::ZipModel;
use crate::params::{AesVersion, CompressionMethod, EncryptionMethod, ZipParameters};
use crate::split::{write_record, ArchiveSink};
use flate2::{Compress, Compression, FlushCompress, Status};
use oxizip_core::crc::Crc32;
use oxizip_core::error::{Result, ZipError};
use oxizip_crypto::aes::{AesCtrZip, AES_BLOCK_SIZE};
use oxizip_crypto::pbkdf2::pbkdf2_hmac_sha1;
use oxizip_crypto::sha1::HmacSha1;
use oxizip_crypto::zipcrypto::{ZipCryptoKeys, ZIPCRYPTO_HEADER_SIZE};
use rand::RngCore;
use std::io::{self, Write};
use std::time::SystemTime;

/// "Version made by": Unix, spec 3.0.
const VERSION_MADE_BY: u16 = 0x031E;

const VERSION_NEEDED_STORE: u16 = 10;
const VERSION_NEEDED_DEFLATE: u16 = 20;
const VERSION_NEEDED_ZIP64: u16 = 45;
const VERSION_NEEDED_AES: u16 = 51;

/// PBKDF2 iteration count fixed by the AES scheme.
const AES_KDF_ITERATIONS: u32 = 1000;

/// Truncated HMAC tag length.
const AES_AUTH_TAG_LEN: usize = 10;

/// Compressor stage of the pipeline.
enum Compressor {
    Stored,
    Deflate(Box<Compress>),
}

impl Compressor {
    fn new(method: CompressionMethod, level: u8) -> Result<Self> {
        match method {
            CompressionMethod::Stored => Ok(Self::Stored),
            CompressionMethod::Deflate => Ok(Self::Deflate(Box::new(Compress::new(
                Compression::new(level as u32),
                false,
            )))),
            other => Err(ZipError::unsupported_method(other.to_string())),
        }
    }

    /// Push plaintext through; compressed bytes append to `out`.
    fn process(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Stored => {
                out.extend_from_slice(data);
                Ok(())
            }
            Self::Deflate(compress) => run_deflate(compress, data, false, out),
        }
    }

    /// Flush the stream to its end; final bytes append to `out`.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Stored => Ok(()),
            Self::Deflate(compress) => run_deflate(compress, &[], true, out),
        }
    }
}

fn run_deflate(
    compress: &mut Compress,
    data: &[u8],
    finish: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    let flush = if finish {
        FlushCompress::Finish
    } else {
        FlushCompress::None
    };
    let mut buf = vec![0u8; 32 * 1024];
    let mut offset = 0;
    loop {
        let before_in = compress.total_in();
        let before_out = compress.total_out();
        let status = compress
            .compress(&data[offset..], &mut buf, flush)
            .map_err(|e| ZipError::Io(io::Error::other(e)))?;
        offset += (compress.total_in() - before_in) as usize;
        let produced = (compress.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if finish {
                    continue;
                }
                if offset >= data.len() && produced < buf.len() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// AES-CTR encryptor stage: buffers to 16-byte blocks, authenticates
/// ciphertext, and refuses further input after its final short block.
struct AesEncryptor {
    ctr: AesCtrZip,
    mac: HmacSha1,
    pending: [u8; AES_BLOCK_SIZE],
    pending_len: usize,
    finished: bool,
}

impl AesEncryptor {
    fn new(cipher_key: &[u8], mac_key: &[u8]) -> Result<Self> {
        Ok(Self {
            ctr: AesCtrZip::new(cipher_key)?,
            mac: HmacSha1::new(mac_key),
            pending: [0u8; AES_BLOCK_SIZE],
            pending_len: 0,
            finished: false,
        })
    }

    fn emit(&mut self, plaintext: &[u8], out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(plaintext);
        let ciphertext = &mut out[start..];
        self.ctr.process(ciphertext);
        self.mac.update(ciphertext);
    }

    /// Encrypt `data`, holding back any trailing partial block.
    fn process(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Err(ZipError::EncryptorFinished);
        }
        let mut input = data;

        if self.pending_len > 0 {
            let space = AES_BLOCK_SIZE - self.pending_len;
            let take = space.min(input.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];
            if self.pending_len < AES_BLOCK_SIZE {
                return Ok(());
            }
            let block = self.pending;
            self.emit(&block, out);
            self.pending_len = 0;
        }

        let full = input.len() - input.len() % AES_BLOCK_SIZE;
        if full > 0 {
            let (aligned, rest) = input.split_at(full);
            self.emit(aligned, out);
            input = rest;
        }
        if !input.is_empty() {
            self.pending[..input.len()].copy_from_slice(input);
            self.pending_len = input.len();
        }
        Ok(())
    }

    /// Emit the final (possibly short) block and close the stream.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Err(ZipError::EncryptorFinished);
        }
        if self.pending_len > 0 {
            let block = self.pending;
            let len = self.pending_len;
            self.emit(&block[..len], out);
            self.pending_len = 0;
        }
        self.finished = true;
        Ok(())
    }

    /// The 10-byte truncated authentication tag over all ciphertext.
    fn tag(self) -> [u8; AES_AUTH_TAG_LEN] {
        let full = self.mac.finalize();
        let mut tag = [0u8; AES_AUTH_TAG_LEN];
        tag.copy_from_slice(&full[..AES_AUTH_TAG_LEN]);
        tag
    }
}

/// Encryptor stage of the pipeline.
enum Encryptor {
    None,
    ZipCrypto(ZipCryptoKeys),
    Aes(AesEncryptor),
}

impl Encryptor {
    fn process(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::None => {
                out.extend_from_slice(data);
                Ok(())
            }
            Self::ZipCrypto(keys) => {
                let start = out.len();
                out.extend_from_slice(data);
                keys.encrypt_buffer(&mut out[start..]);
                Ok(())
            }
            Self::Aes(aes) => aes.process(data, out),
        }
    }
}

/// Per-entry pipeline state.
struct EntryContext {
    local: LocalFileHeader,
    central: CentralDirectoryHeader,
    crc: Crc32,
    uncompressed: u64,
    compressed: u64,
    compressor: Compressor,
    encryptor: Encryptor,
    use_descriptor: bool,
    declared_size: Option<u64>,
    declared_crc: Option<u32>,
    aes_version: Option<AesVersion>,
    is_directory: bool,
}

/// A ZIP write session over a positioned sink.
///
/// Entries move through `put_next_entry` -> `write`* -> `close_entry`;
/// `finish` writes the central directory and trailer records and returns
/// the resulting archive model.
pub struct ZipWriter<S: ArchiveSink> {
    sink: S,
    model: ZipModel,
    password: Option<Vec<u8>>,
    comment: Vec<u8>,
    current: Option<EntryContext>,
}

impl<S: ArchiveSink> ZipWriter<S> {
    /// Begin a write session. A split sink gets the 4-byte split marker as
    /// the very first bytes of the first volume.
    pub fn new(mut sink: S, password: Option<&[u8]>) -> Result<Self> {
        let mut model = ZipModel::new();
        if sink.is_split() {
            sink.write_all(&header::DATA_DESCRIPTOR_SIG.to_le_bytes())?;
            model.split_archive = true;
            model.split_length = sink.split_volume_len();
        }
        Ok(Self {
            sink,
            model,
            password: password.map(|p| p.to_vec()),
            comment: Vec::new(),
            current: None,
        })
    }

    /// Begin a write session that extends an existing archive model.
    ///
    /// The caller positions the sink where new entry data should start
    /// (after the last surviving entry); `finish` then writes a central
    /// directory covering the existing entries plus anything added here.
    pub fn with_existing(sink: S, password: Option<&[u8]>, model: ZipModel) -> Result<Self> {
        Ok(Self {
            sink,
            model,
            password: password.map(|p| p.to_vec()),
            comment: Vec::new(),
            current: None,
        })
    }

    /// Set the archive comment written with the end of central directory
    /// record.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) {
        self.comment = comment.into();
    }

    /// Open the next entry: validates parameters, writes the local header
    /// and any cipher header, and arms the transform pipeline.
    pub fn put_next_entry(&mut self, params: &ZipParameters) -> Result<()> {
        if self.current.is_some() {
            return Err(ZipError::invalid_configuration(
                "previous entry is still open",
            ));
        }
        if params.file_name_in_zip.is_empty() {
            return Err(ZipError::invalid_configuration("entry name is empty"));
        }
        if self.model.entry_by_name(&params.file_name_in_zip).is_some() {
            return Err(ZipError::invalid_configuration(format!(
                "duplicate entry name '{}'",
                params.file_name_in_zip
            )));
        }

        let is_directory = params.is_directory();
        let method = if is_directory {
            CompressionMethod::Stored
        } else {
            params.compression_method
        };
        match method {
            CompressionMethod::Stored | CompressionMethod::Deflate => {}
            other => return Err(ZipError::unsupported_method(other.to_string())),
        }

        let encryption = if is_directory {
            EncryptionMethod::None
        } else {
            params.encryption_method
        };
        let password = match encryption {
            EncryptionMethod::None => None,
            _ => match self.password.as_deref() {
                Some(p) if !p.is_empty() => Some(p.to_vec()),
                _ => {
                    return Err(ZipError::invalid_configuration(
                        "encryption requested without a password",
                    ));
                }
            },
        };

        if method == CompressionMethod::Stored && !is_directory {
            match params.entry_size {
                None => {
                    return Err(ZipError::invalid_configuration(
                        "stored entries need a declared size",
                    ));
                }
                // A zero-size stored header cannot be told apart from one
                // written before its size was known, so readers reject it
                Some(0) if encryption != EncryptionMethod::Aes => {
                    return Err(ZipError::invalid_configuration(
                        "empty stored entries are not representable; deflate them",
                    ));
                }
                _ => {}
            }
        }

        let (mdate, mtime) = header::dos_date_time_from_system(
            params.last_modified.unwrap_or_else(SystemTime::now),
        );

        // A stored entry with a caller-supplied CRC gets a complete local
        // header; everything else defers CRC/sizes to a data descriptor.
        // AES always defers: its compressed size is known only at close.
        let use_descriptor = !is_directory
            && !(method == CompressionMethod::Stored
                && params.entry_crc.is_some()
                && encryption != EncryptionMethod::Aes);

        let mut flags = 0u16;
        if encryption != EncryptionMethod::None {
            flags |= FLAG_ENCRYPTED;
        }
        if use_descriptor {
            flags |= FLAG_DATA_DESCRIPTOR;
        }
        if !params.file_name_in_zip.is_ascii() {
            flags |= FLAG_UTF8;
        }

        let cipher_overhead = match encryption {
            EncryptionMethod::None => 0,
            EncryptionMethod::ZipCrypto => ZIPCRYPTO_HEADER_SIZE as u64,
            EncryptionMethod::Aes => {
                (params.aes_key_strength.salt_len() + 2 + AES_AUTH_TAG_LEN) as u64
            }
        };

        // Stored entries always carry their real sizes; deflated entries
        // leave them for the descriptor.
        let (uncompressed_size, compressed_size) = match (is_directory, method) {
            (true, _) => (0, 0),
            (false, CompressionMethod::Stored) => {
                let size = params.entry_size.unwrap_or(0);
                (size, size + cipher_overhead)
            }
            _ => (0, 0),
        };

        let crc32 = if !use_descriptor {
            params.entry_crc.unwrap_or(0)
        } else {
            0
        };

        let outer_method = if encryption == EncryptionMethod::Aes {
            CompressionMethod::Aes
        } else {
            method
        };

        let aes_record = (encryption == EncryptionMethod::Aes).then(|| AesExtraDataRecord {
            version: params.aes_version,
            strength: params.aes_key_strength,
            compression_method: method,
        });

        let mut version_needed = match method {
            CompressionMethod::Deflate => VERSION_NEEDED_DEFLATE,
            _ => VERSION_NEEDED_STORE,
        };
        if encryption == EncryptionMethod::Aes {
            version_needed = version_needed.max(VERSION_NEEDED_AES);
        }
        if uncompressed_size >= ZIP64_MARKER_32 as u64
            || compressed_size >= ZIP64_MARKER_32 as u64
        {
            version_needed = version_needed.max(VERSION_NEEDED_ZIP64);
        }

        let fields = EntryFields {
            version_needed,
            flags,
            method: outer_method,
            mtime,
            mdate,
            crc32,
            compressed_size,
            uncompressed_size,
            filename: params.file_name_in_zip.clone(),
            extra: Vec::new(),
            aes: aes_record,
        };
        let local = LocalFileHeader {
            fields: fields.clone(),
        };

        let encoded = header::encode_local_file_header(&local);
        let (disk, offset) = write_record(&mut self.sink, &encoded)?;

        let external_attr = if is_directory {
            0o40755 << 16
        } else {
            0o100644 << 16
        };
        let central = CentralDirectoryHeader {
            fields,
            version_made_by: VERSION_MADE_BY,
            comment: params
                .comment
                .as_ref()
                .map(|c| c.as_bytes().to_vec())
                .unwrap_or_default(),
            disk_number_start: disk,
            internal_attr: 0,
            external_attr,
            local_header_offset: offset,
        };

        // The cipher header is payload, not a structural record: it counts
        // toward the compressed size and may split across volumes.
        let mut compressed = 0u64;
        let encryptor = match encryption {
            EncryptionMethod::None => Encryptor::None,
            EncryptionMethod::ZipCrypto => {
                let password = password.as_deref().unwrap_or_default();
                let mut keys = ZipCryptoKeys::new(password);
                let check_byte = if use_descriptor {
                    (mtime >> 8) as u8
                } else {
                    (crc32 >> 24) as u8
                };
                let crypto_header = keys.generate_header(check_byte);
                self.sink.write_all(&crypto_header)?;
                compressed += crypto_header.len() as u64;
                Encryptor::ZipCrypto(keys)
            }
            EncryptionMethod::Aes => {
                let password = password.as_deref().unwrap_or_default();
                let strength = params.aes_key_strength;
                let mut salt = vec![0u8; strength.salt_len()];
                rand::rng().fill_bytes(&mut salt);

                let derived =
                    pbkdf2_hmac_sha1(password, &salt, AES_KDF_ITERATIONS, strength.derived_key_len());
                let key_len = strength.key_len();
                let cipher_key = &derived[..key_len];
                let mac_key = &derived[key_len..key_len * 2];
                let verifier = &derived[key_len * 2..key_len * 2 + 2];

                self.sink.write_all(&salt)?;
                self.sink.write_all(verifier)?;
                compressed += (salt.len() + verifier.len()) as u64;
                Encryptor::Aes(AesEncryptor::new(cipher_key, mac_key)?)
            }
        };

        self.current = Some(EntryContext {
            local,
            central,
            crc: Crc32::new(),
            uncompressed: 0,
            compressed,
            compressor: Compressor::new(method, params.compression_level.level())?,
            encryptor,
            use_descriptor,
            declared_size: params.entry_size,
            declared_crc: params.entry_crc,
            aes_version: (encryption == EncryptionMethod::Aes).then_some(params.aes_version),
            is_directory,
        });
        Ok(())
    }

    /// Stream entry bytes through the pipeline.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let ctx = self
            .current
            .as_mut()
            .ok_or_else(|| ZipError::invalid_configuration("no entry is open"))?;
        if ctx.is_directory && !data.is_empty() {
            return Err(ZipError::invalid_configuration(
                "directory entries carry no data",
            ));
        }

        ctx.crc.update(data);
        ctx.uncompressed += data.len() as u64;

        let mut compressed = Vec::new();
        ctx.compressor.process(data, &mut compressed)?;

        let mut transformed = Vec::new();
        ctx.encryptor.process(&compressed, &mut transformed)?;

        self.sink.write_all(&transformed)?;
        ctx.compressed += transformed.len() as u64;
        Ok(())
    }

    /// Finish the open entry: flush the transforms, append the AES tag and
    /// optional data descriptor, and fold the final CRC/sizes into both
    /// header copies.
    pub fn close_entry(&mut self) -> Result<()> {
        let mut ctx = self
            .current
            .take()
            .ok_or_else(|| ZipError::invalid_configuration("no entry is open"))?;

        let mut tail = Vec::new();
        ctx.compressor.finish(&mut tail)?;

        let mut transformed = Vec::new();
        ctx.encryptor.process(&tail, &mut transformed)?;
        if let Encryptor::Aes(ref mut aes) = ctx.encryptor {
            aes.finish(&mut transformed)?;
        }
        self.sink.write_all(&transformed)?;
        ctx.compressed += transformed.len() as u64;

        if let Encryptor::Aes(aes) = ctx.encryptor {
            let tag = aes.tag();
            self.sink.write_all(&tag)?;
            ctx.compressed += tag.len() as u64;
        }

        let computed_crc = ctx.crc.finalize();
        if let Some(declared) = ctx.declared_size {
            if !ctx.is_directory && ctx.uncompressed != declared {
                return Err(ZipError::invalid_configuration(format!(
                    "entry '{}' declared {} bytes but received {}",
                    ctx.central.fields.filename, declared, ctx.uncompressed
                )));
            }
        }
        if let Some(declared) = ctx.declared_crc {
            if declared != computed_crc {
                return Err(ZipError::integrity_check_failed(
                    &ctx.central.fields.filename,
                    format!(
                        "declared CRC {:#010x} but computed {:#010x}",
                        declared, computed_crc
                    ),
                ));
            }
        }

        // AE-2 hides the CRC behind the authentication tag
        let final_crc = match ctx.aes_version {
            Some(AesVersion::Two) => 0,
            _ => computed_crc,
        };

        for fields in [&mut ctx.local.fields, &mut ctx.central.fields] {
            fields.crc32 = final_crc;
            fields.compressed_size = ctx.compressed;
            fields.uncompressed_size = ctx.uncompressed;
            if ctx.compressed >= ZIP64_MARKER_32 as u64
                || ctx.uncompressed >= ZIP64_MARKER_32 as u64
            {
                fields.version_needed = fields.version_needed.max(VERSION_NEEDED_ZIP64);
            }
        }

        if ctx.use_descriptor {
            let descriptor = DataDescriptor {
                crc32: final_crc,
                compressed_size: ctx.compressed,
                uncompressed_size: ctx.uncompressed,
            };
            let zip64 = ctx.compressed >= ZIP64_MARKER_32 as u64
                || ctx.uncompressed >= ZIP64_MARKER_32 as u64;
            let encoded = header::encode_data_descriptor(&descriptor, zip64);
            write_record(&mut self.sink, &encoded)?;
        }

        self.model.add_entry(ctx.central)
    }

    /// Entries written so far.
    pub fn model(&self) -> &ZipModel {
        &self.model
    }

    /// Close the session: central directory, Zip64 records when needed, end
    /// of central directory. Returns the finished model and the sink.
    pub fn finish(mut self) -> Result<(ZipModel, S)> {
        if self.current.is_some() {
            return Err(ZipError::invalid_configuration(
                "an entry is still open",
            ));
        }

        let mut cd_start = (self.sink.disk_index(), self.sink.disk_position());
        let mut cd_size = 0u64;
        let mut record_disks = Vec::with_capacity(self.model.len());
        for index in 0..self.model.len() {
            let encoded = header::encode_central_directory_header(&self.model.entries()[index]);
            let position = write_record(&mut self.sink, &encoded)?;
            if index == 0 {
                cd_start = position;
            }
            record_disks.push(position.0);
            cd_size += encoded.len() as u64;
        }

        let total_entries = self.model.len() as u64;
        let needs_zip64 = total_entries >= ZIP64_MARKER_16 as u64
            || cd_size >= ZIP64_MARKER_32 as u64
            || cd_start.1 >= ZIP64_MARKER_32 as u64
            || self.sink.disk_index() >= ZIP64_MARKER_16 as u32
            || self.model.entries().iter().any(|e| e.needs_zip64());

        if needs_zip64 {
            // Roll over first if needed so the record's own position is final
            self.sink.begin_record(56)?;
            let zip64_position = (self.sink.disk_index(), self.sink.disk_position());
            let entries_here = record_disks
                .iter()
                .filter(|&&d| d == self.sink.disk_index())
                .count() as u64;
            let zip64_eocd = Zip64EndOfCentralDirectory {
                version_made_by: VERSION_MADE_BY,
                version_needed: VERSION_NEEDED_ZIP64,
                disk_number: self.sink.disk_index(),
                cd_start_disk: cd_start.0,
                entries_on_this_disk: entries_here,
                total_entries,
                cd_size,
                cd_offset: cd_start.1,
            };
            self.sink
                .write_all(&header::encode_zip64_end_of_central_directory(&zip64_eocd))?;

            self.sink.begin_record(20)?;
            let locator = Zip64EocdLocator {
                eocd_start_disk: zip64_position.0,
                eocd_offset: zip64_position.1,
                total_disks: self.sink.disk_index() + 1,
            };
            self.sink
                .write_all(&header::encode_zip64_eocd_locator(&locator))?;

            self.model.zip64_eocd = Some(zip64_eocd);
            self.model.zip64_locator = Some(locator);
        }

        self.sink.begin_record(22 + self.comment.len())?;
        let entries_on_this_disk = if self.model.split_archive {
            record_disks
                .iter()
                .filter(|&&d| d == self.sink.disk_index())
                .count() as u64
        } else {
            total_entries
        };
        let eocd = EndOfCentralDirectory {
            disk_number: self.sink.disk_index(),
            cd_start_disk: cd_start.0,
            entries_on_this_disk,
            total_entries,
            cd_size,
            cd_offset: cd_start.1,
            comment: std::mem::take(&mut self.comment),
        };
        self.sink
            .write_all(&header::encode_end_of_central_directory(&eocd))?;

        self.sink.finish()?;
        self.model.eocd = eocd;
        Ok((self.model, self.sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::CountingWriter;

    fn memory_writer() -> ZipWriter<CountingWriter<Vec<u8>>> {
        ZipWriter::new(CountingWriter::new(Vec::new()), None).unwrap()
    }

    #[test]
    fn test_write_without_open_entry_fails() {
        let mut writer = memory_writer();
        assert!(matches!(
            writer.write(b"data"),
            Err(ZipError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            writer.close_entry(),
            Err(ZipError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_two_open_entries_rejected() {
        let mut writer = memory_writer();
        writer.put_next_entry(&ZipParameters::new("a.txt")).unwrap();
        let err = writer
            .put_next_entry(&ZipParameters::new("b.txt"))
            .unwrap_err();
        assert!(matches!(err, ZipError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_duplicate_entry_name_rejected() {
        let mut writer = memory_writer();
        writer.put_next_entry(&ZipParameters::new("a.txt")).unwrap();
        writer.write(b"one").unwrap();
        writer.close_entry().unwrap();
        let err = writer
            .put_next_entry(&ZipParameters::new("a.txt"))
            .unwrap_err();
        assert!(matches!(err, ZipError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_stored_requires_size() {
        let mut writer = memory_writer();
        let params = ZipParameters::new("raw.bin").with_method(CompressionMethod::Stored);
        assert!(matches!(
            writer.put_next_entry(&params),
            Err(ZipError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_stored_size_mismatch_detected() {
        let mut writer = memory_writer();
        let params = ZipParameters::new("raw.bin")
            .with_method(CompressionMethod::Stored)
            .with_entry_size(10);
        writer.put_next_entry(&params).unwrap();
        writer.write(b"only7b!").unwrap();
        assert!(matches!(
            writer.close_entry(),
            Err(ZipError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_encryption_without_password_rejected() {
        let mut writer = memory_writer();
        let params = ZipParameters::new("secret.txt")
            .with_encryption(EncryptionMethod::Aes);
        assert!(matches!(
            writer.put_next_entry(&params),
            Err(ZipError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_directory_rejects_data() {
        let mut writer = memory_writer();
        writer.put_next_entry(&ZipParameters::new("dir/")).unwrap();
        assert!(writer.write(b"payload").is_err());
    }

    #[test]
    fn test_aes_encryptor_blocks_after_final_block() {
        let mut aes = AesEncryptor::new(&[0u8; 32], &[1u8; 32]).unwrap();
        let mut out = Vec::new();
        aes.process(b"seven by", &mut out).unwrap();
        aes.finish(&mut out).unwrap();
        // 8 bytes in, 8 ciphertext bytes out once flushed
        assert_eq!(out.len(), 8);

        let err = aes.process(b"more", &mut out).unwrap_err();
        assert!(matches!(err, ZipError::EncryptorFinished));
    }

    #[test]
    fn test_aes_encryptor_buffers_partial_blocks() {
        let mut aes = AesEncryptor::new(&[0u8; 16], &[1u8; 16]).unwrap();
        let mut out = Vec::new();
        // 20 bytes: one full block emitted, 4 held back
        aes.process(&[0xABu8; 20], &mut out).unwrap();
        assert_eq!(out.len(), 16);
        // 12 more completes the pending block
        aes.process(&[0xCDu8; 12], &mut out).unwrap();
        assert_eq!(out.len(), 32);
        aes.finish(&mut out).unwrap();
        assert_eq!(out.len(), 32);
    }

    #[test]
    fn test_finish_with_open_entry_rejected() {
        let mut writer = memory_writer();
        writer.put_next_entry(&ZipParameters::new("open.txt")).unwrap();
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_empty_session_produces_bare_eocd() {
        let writer = memory_writer();
        let (model, sink) = writer.finish().unwrap();
        assert_eq!(model.eocd.total_entries, 0);
        assert_eq!(model.eocd.cd_size, 0);
        // Nothing but the 22-byte record itself
        assert_eq!(sink.into_inner().len(), 22);
    }
}
