//! The in-memory archive model.
//!
//! [`ZipModel`] is the aggregate a read session produces and a write session
//! finalizes: the central directory, the end-of-central-directory records,
//! split topology, and the entry-name charset. The entry list and the
//! name-to-index map are only ever mutated together.

use crate::header::{
    CentralDirectoryHeader, EndOfCentralDirectory, Zip64EndOfCentralDirectory, Zip64EocdLocator,
};
use encoding_rs::Encoding;
use oxizip_core::error::{Result, ZipError};
use std::collections::HashMap;
use std::path::PathBuf;

/// Aggregate state of one archive.
#[derive(Debug, Default)]
pub struct ZipModel {
    entries: Vec<CentralDirectoryHeader>,
    name_index: HashMap<String, usize>,
    /// End of central directory record.
    pub eocd: EndOfCentralDirectory,
    /// Zip64 end of central directory record, when present.
    pub zip64_eocd: Option<Zip64EndOfCentralDirectory>,
    /// Zip64 locator, when present.
    pub zip64_locator: Option<Zip64EocdLocator>,
    /// Whether the archive spans multiple volumes.
    pub split_archive: bool,
    /// Per-volume length of a split archive.
    pub split_length: Option<u64>,
    /// Path of the archive on disk, when file-backed.
    pub archive_path: Option<PathBuf>,
    /// Charset for entry names without the UTF-8 flag.
    pub charset: Option<&'static Encoding>,
}

impl ZipModel {
    /// Create an empty model for a new archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// The central directory headers, in archive order.
    pub fn entries(&self) -> &[CentralDirectoryHeader] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by name.
    pub fn entry_by_name(&self, name: &str) -> Option<&CentralDirectoryHeader> {
        self.name_index.get(name).map(|&index| &self.entries[index])
    }

    /// Append an entry, keeping the name index in step.
    ///
    /// Names are unique lookup keys; adding a duplicate fails.
    pub fn add_entry(&mut self, header: CentralDirectoryHeader) -> Result<()> {
        let name = header.fields.filename.clone();
        if self.name_index.contains_key(&name) {
            return Err(ZipError::invalid_configuration(format!(
                "duplicate entry name '{}'",
                name
            )));
        }
        self.name_index.insert(name, self.entries.len());
        self.entries.push(header);
        Ok(())
    }

    /// Remove an entry by name, keeping the name index in step.
    pub fn remove_entry(&mut self, name: &str) -> Result<CentralDirectoryHeader> {
        let index = *self
            .name_index
            .get(name)
            .ok_or_else(|| ZipError::entry_not_found(name))?;
        let removed = self.entries.remove(index);
        self.name_index.remove(name);
        for slot in self.name_index.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Ok(removed)
    }

    /// Rename an entry, keeping the name index in step.
    pub fn rename_entry(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.name_index.contains_key(new_name) {
            return Err(ZipError::invalid_configuration(format!(
                "duplicate entry name '{}'",
                new_name
            )));
        }
        let index = *self
            .name_index
            .get(old_name)
            .ok_or_else(|| ZipError::entry_not_found(old_name))?;
        self.name_index.remove(old_name);
        self.name_index.insert(new_name.to_string(), index);
        self.entries[index].fields.filename = new_name.to_string();
        Ok(())
    }

    /// Whether any entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.entries.iter().any(|e| e.fields.is_encrypted())
    }

    /// Whether any field of the archive requires Zip64 records.
    pub fn needs_zip64(&self) -> bool {
        self.zip64_eocd.is_some() || self.entries.iter().any(|e| e.needs_zip64())
    }
}

/// Validate an entry name for extraction: no absolute paths, no parent
/// references, no NUL bytes.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let path = std::path::Path::new(name);
    if path.is_absolute() {
        return Err(ZipError::path_traversal(name));
    }
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                return Err(ZipError::path_traversal(name));
            }
            std::path::Component::Normal(part) => {
                if part.to_string_lossy().contains('\0') {
                    return Err(ZipError::path_traversal(name));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Sanitize an entry name for extraction, dropping absolute prefixes and
/// parent references.
pub fn sanitized_entry_name(name: &str) -> String {
    let mut result = String::new();
    for component in std::path::Path::new(name).components() {
        if let std::path::Component::Normal(part) = component {
            if !result.is_empty() && !result.ends_with('/') {
                result.push('/');
            }
            result.push_str(&part.to_string_lossy().replace('\0', "_"));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::EntryFields;
    use crate::params::CompressionMethod;

    fn header(name: &str) -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            fields: EntryFields {
                version_needed: 20,
                flags: 0,
                method: CompressionMethod::Deflate,
                mtime: 0,
                mdate: 0,
                crc32: 0,
                compressed_size: 0,
                uncompressed_size: 0,
                filename: name.to_string(),
                extra: Vec::new(),
                aes: None,
            },
            version_made_by: 0x031E,
            comment: Vec::new(),
            disk_number_start: 0,
            internal_attr: 0,
            external_attr: 0,
            local_header_offset: 0,
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut model = ZipModel::new();
        model.add_entry(header("a.txt")).unwrap();
        model.add_entry(header("b/c.txt")).unwrap();

        assert_eq!(model.len(), 2);
        assert!(model.entry_by_name("a.txt").is_some());
        assert!(model.entry_by_name("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut model = ZipModel::new();
        model.add_entry(header("a.txt")).unwrap();
        assert!(model.add_entry(header("a.txt")).is_err());
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut model = ZipModel::new();
        model.add_entry(header("a")).unwrap();
        model.add_entry(header("b")).unwrap();
        model.add_entry(header("c")).unwrap();

        model.remove_entry("b").unwrap();
        assert_eq!(model.len(), 2);
        assert!(model.entry_by_name("b").is_none());
        // Entries after the removal point are still reachable by name
        assert_eq!(model.entry_by_name("c").unwrap().fields.filename, "c");
        assert!(matches!(
            model.remove_entry("b"),
            Err(ZipError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_rename_keeps_index_consistent() {
        let mut model = ZipModel::new();
        model.add_entry(header("old.txt")).unwrap();
        model.rename_entry("old.txt", "new.txt").unwrap();

        assert!(model.entry_by_name("old.txt").is_none());
        assert_eq!(
            model.entry_by_name("new.txt").unwrap().fields.filename,
            "new.txt"
        );
    }

    #[test]
    fn test_validate_entry_name() {
        assert!(validate_entry_name("docs/readme.md").is_ok());
        assert!(validate_entry_name("../etc/passwd").is_err());
        assert!(validate_entry_name("/etc/passwd").is_err());
        assert!(validate_entry_name("a/../../b").is_err());
    }

    #[test]
    fn test_sanitized_entry_name() {
        assert_eq!(sanitized_entry_name("../etc/passwd"), "etc/passwd");
        assert_eq!(sanitized_entry_name("/abs/file.txt"), "abs/file.txt");
        assert_eq!(sanitized_entry_name("./a/./b/../c.txt"), "a/b/c.txt");
    }
}
