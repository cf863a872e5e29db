//! Split-archive round trips on real volume files: rollover invariants,
//! entries crossing volume boundaries, and volume topology errors.

use oxizip::params::{CompressionMethod, EncryptionMethod, ZipParameters};
use oxizip::split::{SplitNaming, SplitWriter, MIN_SPLIT_LENGTH};
use oxizip::{open_archive, ZipError, ZipWriter};
use std::fs;
use std::io::Read;

const PASSWORD: &[u8] = b"secret";

/// Deterministic, poorly compressible payload so entries genuinely span
/// volume boundaries even when deflated.
fn noise(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut state = 0x9E3779B97F4A7C15_u64;
    for _ in 0..len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.push((state >> 32) as u8);
    }
    out
}

#[test]
fn split_roundtrip_with_boundary_inside_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.zip");

    let big = noise(MIN_SPLIT_LENGTH as usize * 3 + 1234);
    let small = b"fits in one volume".to_vec();

    let sink = SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();
    let mut writer = ZipWriter::new(sink, None).unwrap();
    for (name, data) in [("big.bin", &big), ("small.txt", &small)] {
        writer
            .put_next_entry(
                &ZipParameters::new(name)
                    .with_method(CompressionMethod::Stored)
                    .with_entry_size(data.len() as u64),
            )
            .unwrap();
        writer.write(data).unwrap();
        writer.close_entry().unwrap();
    }
    let (model, _) = writer.finish().unwrap();
    assert!(model.split_archive);

    // The split marker opens the first volume
    let mut first = Vec::new();
    fs::File::open(dir.path().join("bundle.z01"))
        .unwrap()
        .read_to_end(&mut first)
        .unwrap();
    assert_eq!(&first[..4], &[0x50, 0x4B, 0x07, 0x08]);

    // Every volume except the last stays within the configured length
    let mut volumes = vec![
        dir.path().join("bundle.z01"),
        dir.path().join("bundle.z02"),
        dir.path().join("bundle.z03"),
    ];
    for volume in &volumes {
        assert!(fs::metadata(volume).unwrap().len() <= MIN_SPLIT_LENGTH);
    }
    volumes.push(path.clone());

    let mut reader = open_archive(&path).unwrap();
    assert_eq!(reader.entries().len(), 2);
    assert_eq!(reader.read_entry_to_vec("big.bin", None).unwrap(), big);
    assert_eq!(reader.read_entry_to_vec("small.txt", None).unwrap(), small);
}

#[test]
fn no_local_header_straddles_a_volume_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aligned.zip");

    let sink = SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();
    let mut writer = ZipWriter::new(sink, None).unwrap();
    // Entry sizes chosen to park the write cursor near a boundary before
    // each following header
    for (index, size) in [
        MIN_SPLIT_LENGTH as usize - 40,
        MIN_SPLIT_LENGTH as usize / 2,
        MIN_SPLIT_LENGTH as usize - 25,
        300,
    ]
    .into_iter()
    .enumerate()
    {
        let data = noise(size);
        writer
            .put_next_entry(
                &ZipParameters::new(format!("entry-{:02}.bin", index))
                    .with_method(CompressionMethod::Stored)
                    .with_entry_size(size as u64),
            )
            .unwrap();
        writer.write(&data).unwrap();
        writer.close_entry().unwrap();
    }
    let (model, _) = writer.finish().unwrap();

    // Rebuild each volume's byte length by naming scheme
    let last_disk = model.eocd.disk_number;
    let volume_len = |disk: u32| -> u64 {
        let volume = if disk == last_disk {
            path.clone()
        } else {
            dir.path().join(format!("aligned.z{:02}", disk + 1))
        };
        fs::metadata(volume).unwrap().len()
    };

    for entry in model.entries() {
        // The fixed part, name, and extra of the local header must sit
        // entirely inside the volume it starts on
        let header_len = 30 + entry.fields.filename.len() as u64;
        assert!(
            entry.local_header_offset + header_len <= volume_len(entry.disk_number_start),
            "local header of {} crosses a volume edge",
            entry.fields.filename
        );
    }

    // And the archive still reads back clean
    let mut reader = open_archive(&path).unwrap();
    for index in 0..4 {
        let name = format!("entry-{:02}.bin", index);
        reader.read_entry_to_vec(&name, None).unwrap();
    }
}

#[test]
fn split_aes_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.zip");
    let payload = noise(MIN_SPLIT_LENGTH as usize * 2 + 777);

    let sink = SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();
    let mut writer = ZipWriter::new(sink, Some(PASSWORD)).unwrap();
    writer
        .put_next_entry(
            &ZipParameters::new("vault.bin").with_encryption(EncryptionMethod::Aes),
        )
        .unwrap();
    writer.write(&payload).unwrap();
    writer.close_entry().unwrap();
    writer.finish().unwrap();

    let mut reader = open_archive(&path).unwrap();
    assert!(reader.model().split_archive);
    assert_eq!(
        reader.read_entry_to_vec("vault.bin", Some(PASSWORD)).unwrap(),
        payload
    );

    let err = reader.entry_reader("vault.bin", Some(b"wrong")).unwrap_err();
    assert!(matches!(err, ZipError::WrongPassword));
}

#[test]
fn numbered_split_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parts.zip");
    let payload = noise(MIN_SPLIT_LENGTH as usize + 4096);

    let sink = SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::Numbered).unwrap();
    let mut writer = ZipWriter::new(sink, None).unwrap();
    writer
        .put_next_entry(
            &ZipParameters::new("payload.bin")
                .with_method(CompressionMethod::Stored)
                .with_entry_size(payload.len() as u64),
        )
        .unwrap();
    writer.write(&payload).unwrap();
    writer.close_entry().unwrap();
    writer.finish().unwrap();

    assert!(dir.path().join("parts.001").exists());
    assert!(dir.path().join("parts.002").exists());

    let mut reader = open_archive(dir.path().join("parts.001")).unwrap();
    assert_eq!(reader.read_entry_to_vec("payload.bin", None).unwrap(), payload);
}

#[test]
fn missing_middle_volume_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("damaged.zip");
    let payload = noise(MIN_SPLIT_LENGTH as usize * 2 + 99);

    let sink = SplitWriter::create_split(&path, MIN_SPLIT_LENGTH, SplitNaming::ZipSpec).unwrap();
    let mut writer = ZipWriter::new(sink, None).unwrap();
    writer
        .put_next_entry(
            &ZipParameters::new("data.bin")
                .with_method(CompressionMethod::Stored)
                .with_entry_size(payload.len() as u64),
        )
        .unwrap();
    writer.write(&payload).unwrap();
    writer.close_entry().unwrap();
    writer.finish().unwrap();

    fs::remove_file(dir.path().join("damaged.z02")).unwrap();
    let err = open_archive(&path).unwrap_err();
    assert!(matches!(err, ZipError::SplitFileMissing { .. }));
}
