//! ZIP header records and their binary codecs.
//!
//! Every record is identified by a 4-byte little-endian signature and uses
//! fixed-width little-endian integers. Variable-length fields (file name,
//! extra blocks, comment) are preceded by explicit 2-byte lengths that are
//! honored exactly on encode. Extra-field blocks are (id, length, payload)
//! triples; unknown ids are preserved as opaque [`ExtraDataRecord`]s.
//!
//! The local and central header records share the [`EntryFields`] struct by
//! value; encode/decode are free functions, dispatched by the caller on the
//! signature it reads.

use crate::params::{AesKeyStrength, AesVersion, CompressionMethod, EncryptionMethod};
use encoding_rs::Encoding;
use oxizip_core::bytes;
use oxizip_core::error::{Result, ZipError};
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// Central directory header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// End of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// Zip64 end of central directory signature.
pub const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x06064B50;

/// Zip64 end of central directory locator signature.
pub const ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG: u32 = 0x07064B50;

/// Data descriptor signature; also written as the split-archive marker at
/// the start of the first volume.
pub const DATA_DESCRIPTOR_SIG: u32 = 0x08074B50;

/// Zip64 extended information extra field id.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// AES extra data record id.
pub const AES_EXTRA_FIELD_ID: u16 = 0x9901;

/// Sentinel for 32-bit fields whose real value lives in a Zip64 block.
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Sentinel for 16-bit fields whose real value lives in a Zip64 block.
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// Flag bit: entry payload is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Flag bit: CRC/sizes follow the payload in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Flag bit: the file name is encoded as UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// An opaque extra-field block whose id this engine does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraDataRecord {
    /// Extra field header id.
    pub header_id: u16,
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

/// Zip64 extended information block. Each field is present only when the
/// corresponding fixed-width field holds the sentinel value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zip64ExtendedInfo {
    /// Real uncompressed size.
    pub uncompressed_size: Option<u64>,
    /// Real compressed size.
    pub compressed_size: Option<u64>,
    /// Real local header offset.
    pub local_header_offset: Option<u64>,
    /// Real starting disk number.
    pub disk_number_start: Option<u32>,
}

/// AES extra data record (id 0x9901): vendor "AE", scheme version, key
/// strength, and the real compression method hidden behind the AES sentinel
/// code in the outer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtraDataRecord {
    /// AE-1 keeps the entry CRC; AE-2 zeroes it in favor of the MAC.
    pub version: AesVersion,
    /// Key strength class (128/192/256).
    pub strength: AesKeyStrength,
    /// The compression method applied before encryption.
    pub compression_method: CompressionMethod,
}

impl AesExtraDataRecord {
    /// Serialize as a complete extra-field block (id + length + payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(11);
        bytes.extend_from_slice(&AES_EXTRA_FIELD_ID.to_le_bytes());
        bytes.extend_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(&(self.version as u16).to_le_bytes());
        bytes.extend_from_slice(b"AE");
        bytes.push(self.strength as u8);
        bytes.extend_from_slice(&self.compression_method.to_code().to_le_bytes());
        bytes
    }

    /// Parse from an extra-field payload (the 7 bytes after id + length).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 7 {
            return Err(ZipError::corrupt_header("AES extra data record too short"));
        }
        let version = match bytes::u16_at(payload, 0) {
            1 => AesVersion::One,
            2 => AesVersion::Two,
            other => {
                return Err(ZipError::corrupt_header(format!(
                    "unknown AES scheme version {}",
                    other
                )));
            }
        };
        if &payload[2..4] != b"AE" {
            return Err(ZipError::corrupt_header("bad AES vendor id"));
        }
        let strength = AesKeyStrength::from_code(payload[4]).ok_or_else(|| {
            ZipError::corrupt_header(format!("unknown AES key strength {}", payload[4]))
        })?;
        let compression_method = CompressionMethod::from_code(bytes::u16_at(payload, 5));
        Ok(Self {
            version,
            strength,
            compression_method,
        })
    }
}

/// Fields shared between the local and central header records.
#[derive(Debug, Clone)]
pub struct EntryFields {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Outer compression method code (the AES sentinel hides the real one).
    pub method: CompressionMethod,
    /// DOS modification time.
    pub mtime: u16,
    /// DOS modification date.
    pub mdate: u16,
    /// CRC-32 of the uncompressed data (zero for AE-2 entries).
    pub crc32: u32,
    /// Compressed size, including any cipher header and trailing tag.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub uncompressed_size: u64,
    /// Entry name.
    pub filename: String,
    /// Extra-field blocks this engine does not interpret, preserved as-is.
    pub extra: Vec<ExtraDataRecord>,
    /// AES extra data record, when the entry is AES-encrypted.
    pub aes: Option<AesExtraDataRecord>,
}

impl EntryFields {
    /// Whether the entry is a directory (name ends with a slash).
    pub fn is_directory(&self) -> bool {
        self.filename.ends_with('/')
    }

    /// Whether the encrypted flag is set.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Whether CRC/sizes follow the payload in a data descriptor.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// The encryption method, derived from the flag and the AES record.
    pub fn encryption_method(&self) -> EncryptionMethod {
        if !self.is_encrypted() {
            EncryptionMethod::None
        } else if self.aes.is_some() || self.method == CompressionMethod::Aes {
            EncryptionMethod::Aes
        } else {
            EncryptionMethod::ZipCrypto
        }
    }

    /// The compression method actually applied to the payload (looks behind
    /// the AES sentinel).
    pub fn actual_compression_method(&self) -> CompressionMethod {
        match (&self.method, &self.aes) {
            (CompressionMethod::Aes, Some(record)) => record.compression_method,
            _ => self.method,
        }
    }

    /// Last modification time as `SystemTime`.
    pub fn modified_time(&self) -> SystemTime {
        system_from_dos_date_time(self.mdate, self.mtime)
    }
}

/// Local file header: the per-entry metadata written immediately before the
/// entry payload.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    /// Shared header fields.
    pub fields: EntryFields,
}

/// Central directory header: the consolidated per-entry record at the end of
/// the archive.
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    /// Shared header fields.
    pub fields: EntryFields,
    /// Version (and host) that wrote the entry.
    pub version_made_by: u16,
    /// Entry comment bytes.
    pub comment: Vec<u8>,
    /// Disk on which the local header starts.
    pub disk_number_start: u32,
    /// Internal file attributes.
    pub internal_attr: u16,
    /// External (host-specific) file attributes.
    pub external_attr: u32,
    /// Offset of the local header within its starting disk.
    pub local_header_offset: u64,
}

impl CentralDirectoryHeader {
    /// Whether any field overflows its fixed-width encoding.
    pub fn needs_zip64(&self) -> bool {
        self.fields.compressed_size >= ZIP64_MARKER_32 as u64
            || self.fields.uncompressed_size >= ZIP64_MARKER_32 as u64
            || self.local_header_offset >= ZIP64_MARKER_32 as u64
            || self.disk_number_start >= ZIP64_MARKER_16 as u32
    }
}

/// Trailing CRC/size record for entries whose header was written before
/// those values were known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub uncompressed_size: u64,
}

/// End of central directory record, with fields widened past their on-disk
/// sizes so Zip64 values flow through unchanged.
#[derive(Debug, Clone, Default)]
pub struct EndOfCentralDirectory {
    /// Number of this disk (the last one).
    pub disk_number: u32,
    /// Disk where the central directory starts.
    pub cd_start_disk: u32,
    /// Central directory records on this disk.
    pub entries_on_this_disk: u64,
    /// Total central directory records.
    pub total_entries: u64,
    /// Size of the central directory in bytes.
    pub cd_size: u64,
    /// Offset of the central directory within its starting disk.
    pub cd_offset: u64,
    /// Archive comment bytes.
    pub comment: Vec<u8>,
}

/// Zip64 end of central directory record.
#[derive(Debug, Clone, Default)]
pub struct Zip64EndOfCentralDirectory {
    /// Version (and host) that wrote the record.
    pub version_made_by: u16,
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// Number of this disk.
    pub disk_number: u32,
    /// Disk where the central directory starts.
    pub cd_start_disk: u32,
    /// Central directory records on this disk.
    pub entries_on_this_disk: u64,
    /// Total central directory records.
    pub total_entries: u64,
    /// Size of the central directory in bytes.
    pub cd_size: u64,
    /// Offset of the central directory within its starting disk.
    pub cd_offset: u64,
}

/// Zip64 end of central directory locator.
#[derive(Debug, Clone, Default)]
pub struct Zip64EocdLocator {
    /// Disk containing the Zip64 EOCD record.
    pub eocd_start_disk: u32,
    /// Offset of the Zip64 EOCD record within that disk.
    pub eocd_offset: u64,
    /// Total number of disks.
    pub total_disks: u32,
}

// ---------------------------------------------------------------------------
// Name encoding
// ---------------------------------------------------------------------------

/// Decode an entry name: UTF-8 when the flag says so, otherwise through the
/// configured charset, otherwise lossy UTF-8.
pub fn decode_entry_name(raw: &[u8], flags: u16, charset: Option<&'static Encoding>) -> String {
    if flags & FLAG_UTF8 != 0 {
        return String::from_utf8_lossy(raw).into_owned();
    }
    match charset {
        Some(encoding) => encoding.decode(raw).0.into_owned(),
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Extra-field walking
// ---------------------------------------------------------------------------

/// Split raw extra-field bytes into blocks, extracting the Zip64 and AES
/// records and preserving everything else opaquely.
///
/// `sentinel_*` report which fixed-width fields held marker values, which
/// controls which Zip64 sub-fields are present.
struct ParsedExtra {
    zip64: Zip64ExtendedInfo,
    aes: Option<AesExtraDataRecord>,
    other: Vec<ExtraDataRecord>,
}

fn parse_extra_fields(
    raw: &[u8],
    sentinel_uncompressed: bool,
    sentinel_compressed: bool,
    sentinel_offset: bool,
    sentinel_disk: bool,
) -> Result<ParsedExtra> {
    let mut zip64 = Zip64ExtendedInfo::default();
    let mut aes = None;
    let mut other = Vec::new();

    let mut offset = 0;
    while offset + 4 <= raw.len() {
        let header_id = bytes::u16_at(raw, offset);
        let data_size = bytes::u16_at(raw, offset + 2) as usize;
        offset += 4;
        if offset + data_size > raw.len() {
            return Err(ZipError::corrupt_header(format!(
                "extra field 0x{:04x} overruns its container",
                header_id
            )));
        }
        let payload = &raw[offset..offset + data_size];

        match header_id {
            ZIP64_EXTRA_FIELD_ID => {
                let mut pos = 0;
                if sentinel_uncompressed && pos + 8 <= payload.len() {
                    zip64.uncompressed_size = Some(bytes::u64_at(payload, pos));
                    pos += 8;
                }
                if sentinel_compressed && pos + 8 <= payload.len() {
                    zip64.compressed_size = Some(bytes::u64_at(payload, pos));
                    pos += 8;
                }
                if sentinel_offset && pos + 8 <= payload.len() {
                    zip64.local_header_offset = Some(bytes::u64_at(payload, pos));
                    pos += 8;
                }
                if sentinel_disk && pos + 4 <= payload.len() {
                    zip64.disk_number_start = Some(bytes::u32_at(payload, pos));
                }
            }
            AES_EXTRA_FIELD_ID => {
                aes = Some(AesExtraDataRecord::parse(payload)?);
            }
            _ => {
                other.push(ExtraDataRecord {
                    header_id,
                    data: payload.to_vec(),
                });
            }
        }

        offset += data_size;
    }

    Ok(ParsedExtra { zip64, aes, other })
}

/// Build a Zip64 extended-info block for the values that overflow, in the
/// canonical field order. Empty when nothing overflows.
fn encode_zip64_extra(
    uncompressed_size: u64,
    compressed_size: u64,
    local_header_offset: Option<u64>,
    disk_number_start: Option<u32>,
) -> Vec<u8> {
    let mut payload = Vec::new();
    if uncompressed_size >= ZIP64_MARKER_32 as u64 {
        payload.extend_from_slice(&uncompressed_size.to_le_bytes());
    }
    if compressed_size >= ZIP64_MARKER_32 as u64 {
        payload.extend_from_slice(&compressed_size.to_le_bytes());
    }
    if let Some(offset) = local_header_offset {
        if offset >= ZIP64_MARKER_32 as u64 {
            payload.extend_from_slice(&offset.to_le_bytes());
        }
    }
    if let Some(disk) = disk_number_start {
        if disk >= ZIP64_MARKER_16 as u32 {
            payload.extend_from_slice(&disk.to_le_bytes());
        }
    }
    if payload.is_empty() {
        return Vec::new();
    }

    let mut block = Vec::with_capacity(4 + payload.len());
    block.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
    block.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    block.extend_from_slice(&payload);
    block
}

fn encode_opaque_extras(records: &[ExtraDataRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        out.extend_from_slice(&record.header_id.to_le_bytes());
        out.extend_from_slice(&(record.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&record.data);
    }
    out
}

fn clamp_u32(value: u64) -> u32 {
    if value >= ZIP64_MARKER_32 as u64 {
        ZIP64_MARKER_32
    } else {
        value as u32
    }
}

fn clamp_u16(value: u64) -> u16 {
    if value >= ZIP64_MARKER_16 as u64 {
        ZIP64_MARKER_16
    } else {
        value as u16
    }
}

// ---------------------------------------------------------------------------
// Local file header codec
// ---------------------------------------------------------------------------

/// Read a local file header (including its signature) from the stream.
pub fn read_local_file_header<R: Read>(
    reader: &mut R,
    charset: Option<&'static Encoding>,
) -> Result<LocalFileHeader> {
    let signature = bytes::read_u32(reader)?;
    if signature != LOCAL_FILE_HEADER_SIG {
        return Err(ZipError::corrupt_header(format!(
            "expected local file header signature, found 0x{:08x}",
            signature
        )));
    }

    let mut buf = [0u8; 26];
    reader.read_exact(&mut buf)?;

    let version_needed = bytes::u16_at(&buf, 0);
    let flags = bytes::u16_at(&buf, 2);
    let method = CompressionMethod::from_code(bytes::u16_at(&buf, 4));
    let mtime = bytes::u16_at(&buf, 6);
    let mdate = bytes::u16_at(&buf, 8);
    let crc32 = bytes::u32_at(&buf, 10);
    let compressed_size_32 = bytes::u32_at(&buf, 14);
    let uncompressed_size_32 = bytes::u32_at(&buf, 18);
    let filename_len = bytes::u16_at(&buf, 22) as usize;
    let extra_len = bytes::u16_at(&buf, 24) as usize;

    let name_raw = bytes::read_vec(reader, filename_len)?;
    let filename = decode_entry_name(&name_raw, flags, charset);
    let extra_raw = bytes::read_vec(reader, extra_len)?;

    let parsed = parse_extra_fields(
        &extra_raw,
        uncompressed_size_32 == ZIP64_MARKER_32,
        compressed_size_32 == ZIP64_MARKER_32,
        false,
        false,
    )?;

    let uncompressed_size = parsed
        .zip64
        .uncompressed_size
        .unwrap_or(uncompressed_size_32 as u64);
    let compressed_size = parsed
        .zip64
        .compressed_size
        .unwrap_or(compressed_size_32 as u64);

    let fields = EntryFields {
        version_needed,
        flags,
        method,
        mtime,
        mdate,
        crc32,
        compressed_size,
        uncompressed_size,
        filename,
        extra: parsed.other,
        aes: parsed.aes,
    };

    // A stored, non-directory entry recorded with zero size cannot be told
    // apart from a header written before its size was known.
    if fields.method == CompressionMethod::Stored
        && !fields.is_directory()
        && fields.uncompressed_size == 0
    {
        return Err(ZipError::invalid_local_file_header(format!(
            "stored entry '{}' declares no size",
            fields.filename
        )));
    }

    Ok(LocalFileHeader { fields })
}

/// Encode a local file header, signature included.
pub fn encode_local_file_header(header: &LocalFileHeader) -> Vec<u8> {
    let fields = &header.fields;
    let name_bytes = fields.filename.as_bytes();

    let zip64_extra = encode_zip64_extra(
        fields.uncompressed_size,
        fields.compressed_size,
        None,
        None,
    );
    let aes_extra = fields.aes.as_ref().map(|a| a.encode()).unwrap_or_default();
    let opaque_extra = encode_opaque_extras(&fields.extra);
    let extra_len = zip64_extra.len() + aes_extra.len() + opaque_extra.len();

    let mut out = Vec::with_capacity(30 + name_bytes.len() + extra_len);
    out.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&fields.version_needed.to_le_bytes());
    out.extend_from_slice(&fields.flags.to_le_bytes());
    out.extend_from_slice(&fields.method.to_code().to_le_bytes());
    out.extend_from_slice(&fields.mtime.to_le_bytes());
    out.extend_from_slice(&fields.mdate.to_le_bytes());
    out.extend_from_slice(&fields.crc32.to_le_bytes());
    out.extend_from_slice(&clamp_u32(fields.compressed_size).to_le_bytes());
    out.extend_from_slice(&clamp_u32(fields.uncompressed_size).to_le_bytes());
    out.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra_len as u16).to_le_bytes());
    out.extend_from_slice(name_bytes);
    out.extend_from_slice(&zip64_extra);
    out.extend_from_slice(&aes_extra);
    out.extend_from_slice(&opaque_extra);
    out
}

// ---------------------------------------------------------------------------
// Central directory header codec
// ---------------------------------------------------------------------------

/// Read a central directory header (including its signature) from the stream.
pub fn read_central_directory_header<R: Read>(
    reader: &mut R,
    charset: Option<&'static Encoding>,
) -> Result<CentralDirectoryHeader> {
    let signature = bytes::read_u32(reader)?;
    if signature != CENTRAL_DIR_HEADER_SIG {
        return Err(ZipError::corrupt_header(format!(
            "expected central directory header signature, found 0x{:08x}",
            signature
        )));
    }

    let mut buf = [0u8; 42];
    reader.read_exact(&mut buf)?;

    let version_made_by = bytes::u16_at(&buf, 0);
    let version_needed = bytes::u16_at(&buf, 2);
    let flags = bytes::u16_at(&buf, 4);
    let method = CompressionMethod::from_code(bytes::u16_at(&buf, 6));
    let mtime = bytes::u16_at(&buf, 8);
    let mdate = bytes::u16_at(&buf, 10);
    let crc32 = bytes::u32_at(&buf, 12);
    let compressed_size_32 = bytes::u32_at(&buf, 16);
    let uncompressed_size_32 = bytes::u32_at(&buf, 20);
    let filename_len = bytes::u16_at(&buf, 24) as usize;
    let extra_len = bytes::u16_at(&buf, 26) as usize;
    let comment_len = bytes::u16_at(&buf, 28) as usize;
    let disk_start_16 = bytes::u16_at(&buf, 30);
    let internal_attr = bytes::u16_at(&buf, 32);
    let external_attr = bytes::u32_at(&buf, 34);
    let offset_32 = bytes::u32_at(&buf, 38);

    let name_raw = bytes::read_vec(reader, filename_len)?;
    let filename = decode_entry_name(&name_raw, flags, charset);
    let extra_raw = bytes::read_vec(reader, extra_len)?;
    let comment = bytes::read_vec(reader, comment_len)?;

    let parsed = parse_extra_fields(
        &extra_raw,
        uncompressed_size_32 == ZIP64_MARKER_32,
        compressed_size_32 == ZIP64_MARKER_32,
        offset_32 == ZIP64_MARKER_32,
        disk_start_16 == ZIP64_MARKER_16,
    )?;

    Ok(CentralDirectoryHeader {
        fields: EntryFields {
            version_needed,
            flags,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size: parsed
                .zip64
                .compressed_size
                .unwrap_or(compressed_size_32 as u64),
            uncompressed_size: parsed
                .zip64
                .uncompressed_size
                .unwrap_or(uncompressed_size_32 as u64),
            filename,
            extra: parsed.other,
            aes: parsed.aes,
        },
        version_made_by,
        comment,
        disk_number_start: parsed
            .zip64
            .disk_number_start
            .unwrap_or(disk_start_16 as u32),
        internal_attr,
        external_attr,
        local_header_offset: parsed.zip64.local_header_offset.unwrap_or(offset_32 as u64),
    })
}

/// Encode a central directory header, signature included.
pub fn encode_central_directory_header(header: &CentralDirectoryHeader) -> Vec<u8> {
    let fields = &header.fields;
    let name_bytes = fields.filename.as_bytes();

    let zip64_extra = encode_zip64_extra(
        fields.uncompressed_size,
        fields.compressed_size,
        Some(header.local_header_offset),
        Some(header.disk_number_start),
    );
    let aes_extra = fields.aes.as_ref().map(|a| a.encode()).unwrap_or_default();
    let opaque_extra = encode_opaque_extras(&fields.extra);
    let extra_len = zip64_extra.len() + aes_extra.len() + opaque_extra.len();

    let mut out = Vec::with_capacity(46 + name_bytes.len() + extra_len + header.comment.len());
    out.extend_from_slice(&CENTRAL_DIR_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&header.version_made_by.to_le_bytes());
    out.extend_from_slice(&fields.version_needed.to_le_bytes());
    out.extend_from_slice(&fields.flags.to_le_bytes());
    out.extend_from_slice(&fields.method.to_code().to_le_bytes());
    out.extend_from_slice(&fields.mtime.to_le_bytes());
    out.extend_from_slice(&fields.mdate.to_le_bytes());
    out.extend_from_slice(&fields.crc32.to_le_bytes());
    out.extend_from_slice(&clamp_u32(fields.compressed_size).to_le_bytes());
    out.extend_from_slice(&clamp_u32(fields.uncompressed_size).to_le_bytes());
    out.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra_len as u16).to_le_bytes());
    out.extend_from_slice(&(header.comment.len() as u16).to_le_bytes());
    out.extend_from_slice(&clamp_u16(header.disk_number_start as u64).to_le_bytes());
    out.extend_from_slice(&header.internal_attr.to_le_bytes());
    out.extend_from_slice(&header.external_attr.to_le_bytes());
    out.extend_from_slice(&clamp_u32(header.local_header_offset).to_le_bytes());
    out.extend_from_slice(name_bytes);
    out.extend_from_slice(&zip64_extra);
    out.extend_from_slice(&aes_extra);
    out.extend_from_slice(&opaque_extra);
    out.extend_from_slice(&header.comment);
    out
}

// ---------------------------------------------------------------------------
// Data descriptor codec
// ---------------------------------------------------------------------------

/// Read a data descriptor. The signature word is optional on disk; `zip64`
/// selects 8-byte sizes.
pub fn read_data_descriptor<R: Read>(reader: &mut R, zip64: bool) -> Result<DataDescriptor> {
    let first_word = bytes::read_u32(reader)?;
    let crc32 = if first_word == DATA_DESCRIPTOR_SIG {
        bytes::read_u32(reader)?
    } else {
        first_word
    };

    let (compressed_size, uncompressed_size) = if zip64 {
        (bytes::read_u64(reader)?, bytes::read_u64(reader)?)
    } else {
        (bytes::read_u32(reader)? as u64, bytes::read_u32(reader)? as u64)
    };

    Ok(DataDescriptor {
        crc32,
        compressed_size,
        uncompressed_size,
    })
}

/// Encode a data descriptor with the signature word. `zip64` selects 8-byte
/// sizes.
pub fn encode_data_descriptor(descriptor: &DataDescriptor, zip64: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&DATA_DESCRIPTOR_SIG.to_le_bytes());
    out.extend_from_slice(&descriptor.crc32.to_le_bytes());
    if zip64 {
        out.extend_from_slice(&descriptor.compressed_size.to_le_bytes());
        out.extend_from_slice(&descriptor.uncompressed_size.to_le_bytes());
    } else {
        out.extend_from_slice(&(descriptor.compressed_size as u32).to_le_bytes());
        out.extend_from_slice(&(descriptor.uncompressed_size as u32).to_le_bytes());
    }
    out
}

// ---------------------------------------------------------------------------
// End of central directory codecs
// ---------------------------------------------------------------------------

/// Parse an end of central directory record from a slice beginning at its
/// signature.
pub fn parse_end_of_central_directory(buf: &[u8]) -> Result<EndOfCentralDirectory> {
    if buf.len() < 22 {
        return Err(ZipError::corrupt_header("end of central directory too short"));
    }
    if bytes::u32_at(buf, 0) != END_OF_CENTRAL_DIR_SIG {
        return Err(ZipError::corrupt_header(
            "bad end of central directory signature",
        ));
    }

    let comment_len = bytes::u16_at(buf, 20) as usize;
    if buf.len() < 22 + comment_len {
        return Err(ZipError::corrupt_header("archive comment truncated"));
    }

    Ok(EndOfCentralDirectory {
        disk_number: bytes::u16_at(buf, 4) as u32,
        cd_start_disk: bytes::u16_at(buf, 6) as u32,
        entries_on_this_disk: bytes::u16_at(buf, 8) as u64,
        total_entries: bytes::u16_at(buf, 10) as u64,
        cd_size: bytes::u32_at(buf, 12) as u64,
        cd_offset: bytes::u32_at(buf, 16) as u64,
        comment: buf[22..22 + comment_len].to_vec(),
    })
}

/// Encode an end of central directory record, clamping overflowing fields to
/// their sentinel values.
pub fn encode_end_of_central_directory(eocd: &EndOfCentralDirectory) -> Vec<u8> {
    let mut out = Vec::with_capacity(22 + eocd.comment.len());
    out.extend_from_slice(&END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    out.extend_from_slice(&clamp_u16(eocd.disk_number as u64).to_le_bytes());
    out.extend_from_slice(&clamp_u16(eocd.cd_start_disk as u64).to_le_bytes());
    out.extend_from_slice(&clamp_u16(eocd.entries_on_this_disk).to_le_bytes());
    out.extend_from_slice(&clamp_u16(eocd.total_entries).to_le_bytes());
    out.extend_from_slice(&clamp_u32(eocd.cd_size).to_le_bytes());
    out.extend_from_slice(&clamp_u32(eocd.cd_offset).to_le_bytes());
    out.extend_from_slice(&(eocd.comment.len() as u16).to_le_bytes());
    out.extend_from_slice(&eocd.comment);
    out
}

/// Read a Zip64 end of central directory record (including its signature).
pub fn read_zip64_end_of_central_directory<R: Read>(
    reader: &mut R,
) -> Result<Zip64EndOfCentralDirectory> {
    let signature = bytes::read_u32(reader)?;
    if signature != ZIP64_END_OF_CENTRAL_DIR_SIG {
        return Err(ZipError::corrupt_header(
            "bad Zip64 end of central directory signature",
        ));
    }

    let record_size = bytes::read_u64(reader)?;
    if record_size < 44 {
        return Err(ZipError::corrupt_header(
            "Zip64 end of central directory record too short",
        ));
    }

    let mut buf = [0u8; 44];
    reader.read_exact(&mut buf)?;

    // Skip the extensible data sector, if any
    let extension = record_size - 44;
    if extension > 0 {
        std::io::copy(&mut reader.take(extension), &mut std::io::sink())?;
    }

    Ok(Zip64EndOfCentralDirectory {
        version_made_by: bytes::u16_at(&buf, 0),
        version_needed: bytes::u16_at(&buf, 2),
        disk_number: bytes::u32_at(&buf, 4),
        cd_start_disk: bytes::u32_at(&buf, 8),
        entries_on_this_disk: bytes::u64_at(&buf, 12),
        total_entries: bytes::u64_at(&buf, 20),
        cd_size: bytes::u64_at(&buf, 28),
        cd_offset: bytes::u64_at(&buf, 36),
    })
}

/// Encode a Zip64 end of central directory record.
pub fn encode_zip64_end_of_central_directory(record: &Zip64EndOfCentralDirectory) -> Vec<u8> {
    let mut out = Vec::with_capacity(56);
    out.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    out.extend_from_slice(&44u64.to_le_bytes());
    out.extend_from_slice(&record.version_made_by.to_le_bytes());
    out.extend_from_slice(&record.version_needed.to_le_bytes());
    out.extend_from_slice(&record.disk_number.to_le_bytes());
    out.extend_from_slice(&record.cd_start_disk.to_le_bytes());
    out.extend_from_slice(&record.entries_on_this_disk.to_le_bytes());
    out.extend_from_slice(&record.total_entries.to_le_bytes());
    out.extend_from_slice(&record.cd_size.to_le_bytes());
    out.extend_from_slice(&record.cd_offset.to_le_bytes());
    out
}

/// Parse a Zip64 end of central directory locator from a 20-byte slice.
pub fn parse_zip64_eocd_locator(buf: &[u8]) -> Result<Zip64EocdLocator> {
    if buf.len() < 20 || bytes::u32_at(buf, 0) != ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG {
        return Err(ZipError::corrupt_header("bad Zip64 locator"));
    }
    Ok(Zip64EocdLocator {
        eocd_start_disk: bytes::u32_at(buf, 4),
        eocd_offset: bytes::u64_at(buf, 8),
        total_disks: bytes::u32_at(buf, 16),
    })
}

/// Encode a Zip64 end of central directory locator.
pub fn encode_zip64_eocd_locator(locator: &Zip64EocdLocator) -> Vec<u8> {
    let mut out = Vec::with_capacity(20);
    out.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG.to_le_bytes());
    out.extend_from_slice(&locator.eocd_start_disk.to_le_bytes());
    out.extend_from_slice(&locator.eocd_offset.to_le_bytes());
    out.extend_from_slice(&locator.total_disks.to_le_bytes());
    out
}

// ---------------------------------------------------------------------------
// DOS timestamps
// ---------------------------------------------------------------------------

/// Days from 1970-01-01 to the given civil date (proleptic Gregorian).
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = (y - era * 400) as i64;
    let mp = if month > 2 { month - 3 } else { month + 9 } as i64;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// Civil date (year, month, day) for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = z.div_euclid(146097);
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { y + 1 } else { y }, month, day)
}

/// Convert a `SystemTime` to DOS (date, time). Times before the DOS epoch
/// (1980-01-01) clamp to it.
pub fn dos_date_time_from_system(time: SystemTime) -> (u16, u16) {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0) as i64;
    let days = secs.div_euclid(86400);
    let time_of_day = secs.rem_euclid(86400);

    let (year, month, day) = civil_from_days(days);
    if year < 1980 {
        // DOS epoch: 1980-01-01 00:00:00
        return (((1980 - 1980) << 9) | (1 << 5) | 1, 0);
    }

    let hours = (time_of_day / 3600) as u16;
    let minutes = ((time_of_day % 3600) / 60) as u16;
    let two_seconds = ((time_of_day % 60) / 2) as u16;

    let mdate = (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16;
    let mtime = (hours << 11) | (minutes << 5) | two_seconds;
    (mdate, mtime)
}

/// Convert DOS (date, time) to a `SystemTime`.
pub fn system_from_dos_date_time(mdate: u16, mtime: u16) -> SystemTime {
    let year = ((mdate >> 9) & 0x7F) as i64 + 1980;
    let month = ((mdate >> 5) & 0x0F).clamp(1, 12) as u32;
    let day = (mdate & 0x1F).clamp(1, 31) as u32;

    let hours = ((mtime >> 11) & 0x1F) as i64;
    let minutes = ((mtime >> 5) & 0x3F) as i64;
    let seconds = ((mtime & 0x1F) as i64) * 2;

    let days = days_from_civil(year, month, day);
    let total = days * 86400 + hours * 3600 + minutes * 60 + seconds;
    UNIX_EPOCH + Duration::from_secs(total.max(0) as u64)
}
