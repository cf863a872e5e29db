//! Split-volume I/O.
//!
//! Presents a numbered sequence of physical volume files as one continuous
//! byte space. Two naming schemes exist: the ZIP standard (`name.z01`,
//! `name.z02`, ..., final volume `name.zip`) and flat numbering
//! (`name.001`, `name.002`, ...).
//!
//! Write side: payload bytes split freely across a volume boundary, but a
//! structural record announced through [`ArchiveSink::begin_record`] rolls
//! the volume over first so no header ever straddles two volumes. Read
//! side: `read`/seek transparently open the next or target volume, and
//! over-read bytes can be pushed back for the next record parse.

use crate::header::END_OF_CENTRAL_DIR_SIG;
use oxizip_core::bytes;
use oxizip_core::error::{Result, ZipError};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Smallest allowed split volume length.
pub const MIN_SPLIT_LENGTH: u64 = 65536;

/// How split volumes are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitNaming {
    /// `base.z01`, `base.z02`, ... with the final volume named `base.zip`.
    #[default]
    ZipSpec,
    /// `base.001`, `base.002`, ... zero-padded to three digits.
    Numbered,
}

/// Destination of a write session: a positioned byte sink that knows which
/// disk it is on.
pub trait ArchiveSink: Write {
    /// Announce that the next `record_len` bytes are one structural record.
    /// A split sink rolls over first if the record would straddle a volume
    /// boundary.
    fn begin_record(&mut self, record_len: usize) -> Result<()> {
        let _ = record_len;
        Ok(())
    }

    /// Zero-based index of the current disk.
    fn disk_index(&self) -> u32 {
        0
    }

    /// Write position within the current disk.
    fn disk_position(&self) -> u64;

    /// Whether this sink spans multiple volumes.
    fn is_split(&self) -> bool {
        false
    }

    /// Configured volume length of a split sink.
    fn split_volume_len(&self) -> Option<u64> {
        None
    }

    /// Flush buffered bytes and finalize volume naming.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write one structural record through the sink, returning the (disk,
/// offset) where it landed.
pub fn write_record<S: ArchiveSink + ?Sized>(sink: &mut S, record: &[u8]) -> Result<(u32, u64)> {
    sink.begin_record(record.len())?;
    let position = (sink.disk_index(), sink.disk_position());
    sink.write_all(record)?;
    Ok(position)
}

/// Single-volume sink over any writer, tracking its position.
pub struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap a writer positioned at byte 0.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Consume the sink and return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> ArchiveSink for CountingWriter<W> {
    fn disk_position(&self) -> u64 {
        self.position
    }
}

/// File-backed sink that rolls across numbered volumes.
#[derive(Debug)]
pub struct SplitWriter {
    directory: PathBuf,
    stem: String,
    naming: SplitNaming,
    /// Volume capacity; `None` disables splitting.
    volume_len: Option<u64>,
    file: File,
    disk_index: u32,
    bytes_in_volume: u64,
}

impl SplitWriter {
    /// Create a single-volume archive file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path.as_ref(), None, SplitNaming::ZipSpec)
    }

    /// Create a split archive with the given volume length and naming
    /// scheme. `path` names the archive (`base.zip` for the ZIP scheme).
    pub fn create_split(
        path: impl AsRef<Path>,
        volume_len: u64,
        naming: SplitNaming,
    ) -> Result<Self> {
        if volume_len < MIN_SPLIT_LENGTH {
            return Err(ZipError::invalid_configuration(format!(
                "split volume length {} is below the {} byte minimum",
                volume_len, MIN_SPLIT_LENGTH
            )));
        }
        Self::new(path.as_ref(), Some(volume_len), naming)
    }

    fn new(path: &Path, volume_len: Option<u64>, naming: SplitNaming) -> Result<Self> {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ZipError::invalid_configuration("archive path has no file name"))?
            .to_string();

        let first = match (volume_len, naming) {
            (Some(_), SplitNaming::Numbered) => directory.join(format!("{}.001", stem)),
            _ => path.to_path_buf(),
        };
        let file = File::create(&first)?;

        Ok(Self {
            directory,
            stem,
            naming,
            volume_len,
            file,
            disk_index: 0,
            bytes_in_volume: 0,
        })
    }

    /// Path of the volume with the given zero-based index, assuming it is
    /// not the final one.
    fn rolled_volume_path(&self, index: u32) -> PathBuf {
        match self.naming {
            SplitNaming::ZipSpec => self.directory.join(format!("{}.z{:02}", self.stem, index + 1)),
            SplitNaming::Numbered => self.directory.join(format!("{}.{:03}", self.stem, index + 1)),
        }
    }

    /// Close the current volume and open the next one.
    fn rollover(&mut self) -> io::Result<()> {
        self.file.flush()?;
        match self.naming {
            SplitNaming::ZipSpec => {
                // The growing file is always `base.zip`; the finished volume
                // takes its `.zNN` name now.
                let current = self.directory.join(format!("{}.zip", self.stem));
                let rolled = self.rolled_volume_path(self.disk_index);
                fs::rename(&current, &rolled)?;
                self.file = File::create(&current)?;
            }
            SplitNaming::Numbered => {
                let next = self.rolled_volume_path(self.disk_index + 1);
                self.file = File::create(&next)?;
            }
        }
        self.disk_index += 1;
        self.bytes_in_volume = 0;
        Ok(())
    }

    fn space_left(&self) -> u64 {
        match self.volume_len {
            Some(len) => len.saturating_sub(self.bytes_in_volume),
            None => u64::MAX,
        }
    }
}

impl Write for SplitWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let space = self.space_left();
            if space == 0 {
                self.rollover()?;
                continue;
            }
            let chunk = (buf.len() - written).min(space.min(usize::MAX as u64) as usize);
            self.file.write_all(&buf[written..written + chunk])?;
            self.bytes_in_volume += chunk as u64;
            written += chunk;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ArchiveSink for SplitWriter {
    fn begin_record(&mut self, record_len: usize) -> Result<()> {
        if let Some(volume_len) = self.volume_len {
            let record_len = record_len as u64;
            // A record longer than a whole volume cannot help but split.
            if record_len <= volume_len && record_len > self.space_left() {
                self.rollover()?;
            }
        }
        Ok(())
    }

    fn disk_index(&self) -> u32 {
        self.disk_index
    }

    fn disk_position(&self) -> u64 {
        self.bytes_in_volume
    }

    fn is_split(&self) -> bool {
        self.volume_len.is_some()
    }

    fn split_volume_len(&self) -> Option<u64> {
        self.volume_len
    }

    fn finish(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// Origin of a read session: a positioned byte source addressable by
/// (disk, offset) and by logical offset, with push-back for over-read bytes.
pub trait ArchiveSource: Read {
    /// Seek to an offset within the given disk.
    fn seek_to_disk(&mut self, disk: u32, offset: u64) -> Result<()>;

    /// Seek to an offset in the logical (concatenated) byte space.
    fn seek_logical(&mut self, offset: u64) -> Result<()>;

    /// Total logical length.
    fn logical_len(&mut self) -> Result<u64>;

    /// Return bytes to the source; the next `read` yields them first.
    fn unread(&mut self, data: &[u8]);
}

/// Single-volume source over any seekable reader.
#[derive(Debug)]
pub struct SeekableSource<R: Read + Seek> {
    inner: R,
    pushback: Vec<u8>,
    pushback_pos: usize,
}

impl<R: Read + Seek> SeekableSource<R> {
    /// Wrap a seekable reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pushback: Vec::new(),
            pushback_pos: 0,
        }
    }
}

impl<R: Read + Seek> Read for SeekableSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pushback_pos < self.pushback.len() {
            let pending = &self.pushback[self.pushback_pos..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            self.pushback_pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> ArchiveSource for SeekableSource<R> {
    fn seek_to_disk(&mut self, disk: u32, offset: u64) -> Result<()> {
        if disk != 0 {
            return Err(ZipError::invalid_split_sequence(format!(
                "single-volume archive has no disk {}",
                disk
            )));
        }
        self.seek_logical(offset)
    }

    fn seek_logical(&mut self, offset: u64) -> Result<()> {
        self.pushback.clear();
        self.pushback_pos = 0;
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn logical_len(&mut self) -> Result<u64> {
        let current = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(current))?;
        Ok(len)
    }

    fn unread(&mut self, data: &[u8]) {
        let mut pending = data.to_vec();
        pending.extend_from_slice(&self.pushback[self.pushback_pos..]);
        self.pushback = pending;
        self.pushback_pos = 0;
    }
}

/// File-backed source spanning the volumes of a split archive.
#[derive(Debug)]
pub struct SplitReader {
    volumes: Vec<PathBuf>,
    lengths: Vec<u64>,
    current: usize,
    file: File,
    pushback: Vec<u8>,
    pushback_pos: usize,
}

impl SplitReader {
    /// Open an archive by the path of its final volume (`base.zip`), a
    /// single-volume archive, or the first volume (`base.001`) of a
    /// flat-numbered split.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension
            .strip_prefix('z')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(ZipError::invalid_split_sequence(format!(
                "'{}' is an interior volume; open the final .zip volume",
                path.display()
            )));
        }

        if extension.chars().all(|c| c.is_ascii_digit()) && !extension.is_empty() {
            if extension != "001" {
                return Err(ZipError::invalid_split_sequence(format!(
                    "'{}' is not the first volume of a numbered split",
                    path.display()
                )));
            }
            return Self::open_numbered(path);
        }

        Self::open_zip_scheme(path)
    }

    /// Open `base.zip`, discovering `base.zNN` companions through the end of
    /// central directory record's disk number.
    fn open_zip_scheme(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ZipError::split_file_missing(path));
        }
        let last_disk = Self::read_disk_number(path)?;
        if last_disk == 0 {
            return Self::from_volumes(vec![path.to_path_buf()]);
        }

        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ZipError::invalid_configuration("archive path has no file name"))?;

        let mut volumes = Vec::with_capacity(last_disk as usize + 1);
        for index in 0..last_disk {
            let volume = directory.join(format!("{}.z{:02}", stem, index + 1));
            if !volume.exists() {
                return Err(ZipError::split_file_missing(volume));
            }
            volumes.push(volume);
        }
        volumes.push(path.to_path_buf());
        Self::from_volumes(volumes)
    }

    /// Open `base.001` and collect consecutively numbered companions.
    fn open_numbered(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ZipError::split_file_missing(path));
        }
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ZipError::invalid_configuration("archive path has no file name"))?;

        let mut volumes = vec![path.to_path_buf()];
        let mut index = 2u32;
        loop {
            let next = directory.join(format!("{}.{:03}", stem, index));
            if !next.exists() {
                break;
            }
            volumes.push(next);
            index += 1;
        }
        Self::from_volumes(volumes)
    }

    fn from_volumes(volumes: Vec<PathBuf>) -> Result<Self> {
        let mut lengths = Vec::with_capacity(volumes.len());
        for volume in &volumes {
            let meta = fs::metadata(volume)
                .map_err(|_| ZipError::split_file_missing(volume.clone()))?;
            lengths.push(meta.len());
        }
        let file = File::open(&volumes[0])
            .map_err(|_| ZipError::split_file_missing(volumes[0].clone()))?;
        Ok(Self {
            volumes,
            lengths,
            current: 0,
            file,
            pushback: Vec::new(),
            pushback_pos: 0,
        })
    }

    /// Scan the tail of the final volume for the end of central directory
    /// record and return its disk number.
    fn read_disk_number(path: &Path) -> Result<u32> {
        let mut file = File::open(path)?;
        let len = file.seek(SeekFrom::End(0))?;
        let tail_len = len.min(65535 + 22);
        file.seek(SeekFrom::Start(len - tail_len))?;
        let mut tail = vec![0u8; tail_len as usize];
        file.read_exact(&mut tail)?;

        let sig = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
        let offset = tail
            .windows(4)
            .rposition(|w| w == sig)
            .ok_or_else(|| ZipError::corrupt_header("end of central directory not found"))?;
        // The 16-bit disk field may hold the Zip64 sentinel; resolving the
        // real value needs the Zip64 record, which lives on the same final
        // volume, so the sentinel is usable as-is only for volume discovery.
        let disk_16 = bytes::u16_at(&tail, offset + 4);
        if disk_16 == 0xFFFF {
            // Fall back to the Zip64 locator directly before the EOCD.
            if offset >= 20 {
                let locator = &tail[offset - 20..offset];
                if bytes::u32_at(locator, 0) == crate::header::ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG
                {
                    return Ok(bytes::u32_at(locator, 16).saturating_sub(1));
                }
            }
            return Err(ZipError::corrupt_header(
                "Zip64 archive without a locator record",
            ));
        }
        Ok(disk_16 as u32)
    }

    /// Number of volumes.
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    fn open_volume(&mut self, index: usize) -> Result<()> {
        if index >= self.volumes.len() {
            return Err(ZipError::invalid_split_sequence(format!(
                "volume {} of {} requested",
                index + 1,
                self.volumes.len()
            )));
        }
        self.file = File::open(&self.volumes[index])
            .map_err(|_| ZipError::split_file_missing(self.volumes[index].clone()))?;
        self.current = index;
        Ok(())
    }
}

impl Read for SplitReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pushback_pos < self.pushback.len() {
            let pending = &self.pushback[self.pushback_pos..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            self.pushback_pos += n;
            return Ok(n);
        }

        loop {
            let n = self.file.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            if self.current + 1 >= self.volumes.len() {
                return Ok(0);
            }
            let next = self.current + 1;
            self.open_volume(next).map_err(io::Error::other)?;
        }
    }
}

impl ArchiveSource for SplitReader {
    fn seek_to_disk(&mut self, disk: u32, offset: u64) -> Result<()> {
        self.pushback.clear();
        self.pushback_pos = 0;
        if disk as usize != self.current {
            self.open_volume(disk as usize)?;
        }
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn seek_logical(&mut self, offset: u64) -> Result<()> {
        let mut remaining = offset;
        for (index, &len) in self.lengths.iter().enumerate() {
            let is_last = index + 1 == self.lengths.len();
            if remaining < len || (is_last && remaining <= len) {
                return self.seek_to_disk(index as u32, remaining);
            }
            remaining -= len;
        }
        Err(ZipError::corrupt_header(format!(
            "seek past end of archive ({} bytes beyond)",
            remaining
        )))
    }

    fn logical_len(&mut self) -> Result<u64> {
        Ok(self.lengths.iter().sum())
    }

    fn unread(&mut self, data: &[u8]) {
        let mut pending = data.to_vec();
        pending.extend_from_slice(&self.pushback[self.pushback_pos..]);
        self.pushback = pending;
        self.pushback_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_split_length_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let err = SplitWriter::create_split(dir.path().join("a.zip"), 1024, SplitNaming::ZipSpec)
            .unwrap_err();
        assert!(matches!(err, ZipError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_counting_writer_positions() {
        let mut sink = CountingWriter::new(Vec::new());
        sink.write_all(b"0123456789").unwrap();
        assert_eq!(sink.disk_position(), 10);
        assert_eq!(sink.disk_index(), 0);
        assert!(!sink.is_split());

        let (disk, offset) = write_record(&mut sink, b"record").unwrap();
        assert_eq!((disk, offset), (0, 10));
        assert_eq!(sink.into_inner().len(), 16);
    }

    #[test]
    fn test_zip_scheme_rollover_and_naming() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.zip");
        let mut sink =
            SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();

        // 150 KiB of payload crosses two boundaries
        let payload = vec![0xA5u8; 150 * 1024];
        sink.write_all(&payload).unwrap();
        ArchiveSink::finish(&mut sink).unwrap();
        drop(sink);

        let z01 = dir.path().join("big.z01");
        let z02 = dir.path().join("big.z02");
        assert_eq!(fs::metadata(&z01).unwrap().len(), MIN_SPLIT_LENGTH);
        assert_eq!(fs::metadata(&z02).unwrap().len(), MIN_SPLIT_LENGTH);
        let last = fs::metadata(&path).unwrap().len();
        assert_eq!(last, 150 * 1024 - 2 * MIN_SPLIT_LENGTH);
    }

    #[test]
    fn test_begin_record_forces_rollover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdr.zip");
        let mut sink =
            SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();

        // Leave 10 bytes of space in the first volume
        sink.write_all(&vec![0u8; MIN_SPLIT_LENGTH as usize - 10]).unwrap();
        assert_eq!(sink.disk_index(), 0);

        // A 30-byte record must move wholesale to the next volume
        let (disk, offset) = write_record(&mut sink, &[0x50u8; 30]).unwrap();
        assert_eq!(disk, 1);
        assert_eq!(offset, 0);
        ArchiveSink::finish(&mut sink).unwrap();
        drop(sink);

        // The rolled first volume is short of the limit
        let z01 = dir.path().join("hdr.z01");
        assert_eq!(fs::metadata(&z01).unwrap().len(), MIN_SPLIT_LENGTH - 10);
    }

    #[test]
    fn test_numbered_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SplitWriter::create_split(
            dir.path().join("vol.zip"),
            MIN_SPLIT_LENGTH,
            SplitNaming::Numbered,
        )
        .unwrap();
        sink.write_all(&vec![1u8; (MIN_SPLIT_LENGTH + 100) as usize]).unwrap();
        ArchiveSink::finish(&mut sink).unwrap();
        drop(sink);

        assert!(dir.path().join("vol.001").exists());
        assert!(dir.path().join("vol.002").exists());
        assert_eq!(
            fs::metadata(dir.path().join("vol.002")).unwrap().len(),
            100
        );
    }

    #[test]
    fn test_seekable_source_pushback() {
        let mut source = SeekableSource::new(std::io::Cursor::new(b"abcdef".to_vec()));
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");

        source.unread(b"cd");
        let mut rest = Vec::new();
        source.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"cdef");
    }

    #[test]
    fn test_seekable_source_disk_bounds() {
        let mut source = SeekableSource::new(std::io::Cursor::new(vec![0u8; 8]));
        assert!(source.seek_to_disk(0, 4).is_ok());
        assert!(matches!(
            source.seek_to_disk(1, 0),
            Err(ZipError::InvalidSplitSequence { .. })
        ));
    }

    #[test]
    fn test_split_reader_spans_volumes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("span.zip");
        let mut sink =
            SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();

        let payload: Vec<u8> = (0..(MIN_SPLIT_LENGTH as usize * 2 + 500))
            .map(|i| (i % 251) as u8)
            .collect();
        sink.write_all(&payload).unwrap();
        // Minimal EOCD so the reader can discover the volume count
        let eocd = crate::header::encode_end_of_central_directory(
            &crate::header::EndOfCentralDirectory {
                disk_number: sink.disk_index(),
                cd_start_disk: sink.disk_index(),
                entries_on_this_disk: 0,
                total_entries: 0,
                cd_size: 0,
                cd_offset: sink.disk_position(),
                comment: Vec::new(),
            },
        );
        write_record(&mut sink, &eocd).unwrap();
        ArchiveSink::finish(&mut sink).unwrap();
        drop(sink);

        let mut reader = SplitReader::open(&path).unwrap();
        assert_eq!(reader.volume_count(), 3);

        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).unwrap();
        assert_eq!(&contents[..payload.len()], &payload[..]);

        // Random access by (disk, offset)
        reader.seek_to_disk(1, 0).unwrap();
        let mut one = [0u8; 1];
        reader.read_exact(&mut one).unwrap();
        assert_eq!(one[0], payload[MIN_SPLIT_LENGTH as usize]);

        // Logical seek resolves to the right volume
        reader.seek_logical(MIN_SPLIT_LENGTH * 2 + 7).unwrap();
        reader.read_exact(&mut one).unwrap();
        assert_eq!(one[0], payload[MIN_SPLIT_LENGTH as usize * 2 + 7]);
    }

    #[test]
    fn test_missing_volume_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.zip");
        let mut sink =
            SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();
        sink.write_all(&vec![7u8; (MIN_SPLIT_LENGTH + 64) as usize]).unwrap();
        let eocd = crate::header::encode_end_of_central_directory(
            &crate::header::EndOfCentralDirectory {
                disk_number: sink.disk_index(),
                cd_start_disk: 0,
                entries_on_this_disk: 0,
                total_entries: 0,
                cd_size: 0,
                cd_offset: 0,
                comment: Vec::new(),
            },
        );
        write_record(&mut sink, &eocd).unwrap();
        ArchiveSink::finish(&mut sink).unwrap();
        drop(sink);

        fs::remove_file(dir.path().join("gone.z01")).unwrap();
        let err = SplitReader::open(&path).unwrap_err();
        assert!(matches!(err, ZipError::SplitFileMissing { .. }));
    }

    #[test]
    fn test_interior_volume_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let z01 = dir.path().join("part.z01");
        fs::write(&z01, b"not the last volume").unwrap();
        let err = SplitReader::open(&z01).unwrap_err();
        assert!(matches!(err, ZipError::InvalidSplitSequence { .. }));

        let n005 = dir.path().join("part.005");
        fs::write(&n005, b"not the first volume").unwrap();
        let err = SplitReader::open(&n005).unwrap_err();
        assert!(matches!(err, ZipError::InvalidSplitSequence { .. }));
    }
}
