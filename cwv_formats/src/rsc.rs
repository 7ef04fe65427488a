use std::fs::{self, File};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;

use crate::error::FormatError;
use crate::reader::{read_u32, slice};

const HEADER_SIZE: usize = 4;
const ENTRY_SIZE: usize = 0x14;
const NAME_SLOT_SIZE: usize = 0x10;

// Name slots are padded with whatever was in memory after the terminator.
static FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)[^.]+\.[A-Z]{1,3}").expect("file name pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RscEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl RscEntry {
    pub fn data_range(&self) -> Range<usize> {
        let start = self.offset as usize;
        let end = start + self.size as usize;
        start..end
    }
}

/// Decodes the directory table at the start of a `GAME.RSC` buffer.
///
/// Sizes are not stored; each entry runs up to the next entry's offset and the
/// last one runs to the end of the buffer.
pub fn decode_directory(bytes: &[u8]) -> std::result::Result<Vec<RscEntry>, FormatError> {
    let count = read_u32(bytes, 0, "RSC entry count")? as usize;
    let table_len = count
        .checked_mul(ENTRY_SIZE)
        .ok_or(FormatError::Truncated {
            what: "RSC directory",
            offset: HEADER_SIZE,
            needed: usize::MAX,
            available: bytes.len(),
        })?;
    let table = slice(bytes, HEADER_SIZE, table_len, "RSC directory")?;

    let mut slots = Vec::with_capacity(count);
    for (index, record) in table.chunks_exact(ENTRY_SIZE).enumerate() {
        let name = normalize_name(index, &record[..NAME_SLOT_SIZE])?;
        let offset = read_u32(record, NAME_SLOT_SIZE, "RSC entry offset")?;
        slots.push((name, offset));
    }

    let mut entries = Vec::with_capacity(count);
    for (index, (name, offset)) in slots.iter().enumerate() {
        let end = match slots.get(index + 1) {
            Some((_, next)) => *next as usize,
            None => bytes.len(),
        };
        let start = *offset as usize;
        if start > bytes.len() {
            return Err(FormatError::EntryOutOfBounds {
                name: name.clone(),
                offset: *offset,
                archive_len: bytes.len(),
            });
        }
        if end < start {
            let (next_name, next_offset) = &slots[index + 1];
            return Err(FormatError::EntryOutOfOrder {
                name: next_name.clone(),
                offset: *next_offset,
                previous: *offset,
            });
        }
        entries.push(RscEntry {
            name: name.clone(),
            offset: *offset,
            size: (end - start) as u32,
        });
    }

    Ok(entries)
}

fn normalize_name(slot: usize, raw: &[u8]) -> std::result::Result<String, FormatError> {
    FILE_NAME
        .find(raw)
        .map(|found| String::from_utf8_lossy(found.as_bytes()).into_owned())
        .ok_or_else(|| FormatError::MalformedName {
            slot,
            raw: String::from_utf8_lossy(raw).into_owned(),
        })
}

#[derive(Debug)]
pub struct RscArchive {
    path: PathBuf,
    mmap: Mmap,
    entries: Vec<RscEntry>,
}

impl RscArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening RSC archive at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping RSC archive {}", path_buf.display()))?;

        let entries = decode_directory(&mmap)
            .with_context(|| format!("parsing RSC archive {}", path_buf.display()))?;

        Ok(RscArchive {
            path: path_buf,
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn entries(&self) -> &[RscEntry] {
        &self.entries
    }

    pub fn find_entry(&self, name: &str) -> Option<&RscEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn read_entry_bytes(&self, entry: &RscEntry) -> &[u8] {
        &self.mmap[entry.data_range()]
    }

    /// Writes the entry's bytes to `dest`, replacing any existing file.
    pub fn extract_entry<P: AsRef<Path>>(&self, entry: &RscEntry, dest: P) -> Result<()> {
        let dest = dest.as_ref();
        fs::write(dest, self.read_entry_bytes(entry))
            .with_context(|| format!("writing {} to {}", entry.name, dest.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn name_slot(name: &[u8], garbage: u8) -> [u8; NAME_SLOT_SIZE] {
        let mut slot = [garbage; NAME_SLOT_SIZE];
        slot[..name.len()].copy_from_slice(name);
        slot[name.len()] = 0;
        slot
    }

    fn build_archive(entries: &[(&[u8], u32)], total_len: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (name, offset) in entries {
            data.extend_from_slice(&name_slot(name, 0xCD));
            data.extend_from_slice(&offset.to_le_bytes());
        }
        let mut fill = 0u8;
        while data.len() < total_len {
            data.push(fill);
            fill = fill.wrapping_add(1);
        }
        data
    }

    #[test]
    fn infers_sizes_from_neighbouring_offsets() {
        let data = build_archive(
            &[(b"SHIP.BND", 24), (b"LOGO.TIM", 100), (b"X.T", 250)],
            300,
        );

        let entries = decode_directory(&data).unwrap();
        let sizes: Vec<u32> = entries.iter().map(|entry| entry.size).collect();
        assert_eq!(sizes, vec![76, 150, 50]);
        assert_eq!(entries[0].name, "SHIP.BND");
        assert_eq!(entries[1].name, "LOGO.TIM");
        assert_eq!(entries[2].name, "X.T");
    }

    #[test]
    fn sizes_cover_everything_after_the_directory() {
        let data = build_archive(&[(b"A.BND", 64), (b"B.BND", 90), (b"C.BND", 91)], 200);
        let entries = decode_directory(&data).unwrap();

        let table_len = HEADER_SIZE + entries.len() * ENTRY_SIZE;
        let sizes: usize = entries.iter().map(|entry| entry.size as usize).sum();
        assert_eq!(table_len + sizes, data.len());

        let mut payload = Vec::new();
        for entry in &entries {
            payload.extend_from_slice(&data[entry.data_range()]);
        }
        assert_eq!(payload, &data[table_len..]);
    }

    #[test]
    fn strips_garbage_after_extension() {
        let mut slot = [0u8; NAME_SLOT_SIZE];
        slot[..10].copy_from_slice(b"CARGO1.BND");
        slot[10] = 0;
        slot[11..].copy_from_slice(b"\xffJUNK");
        assert_eq!(normalize_name(0, &slot).unwrap(), "CARGO1.BND");
    }

    #[test]
    fn rejects_slot_without_extension() {
        let mut data = build_archive(&[(b"GOOD.BND", 24)], 40);
        data[4..4 + NAME_SLOT_SIZE].copy_from_slice(&[b'x'; NAME_SLOT_SIZE]);

        match decode_directory(&data) {
            Err(FormatError::MalformedName { slot, .. }) => assert_eq!(slot, 0),
            other => panic!("expected malformed name, got {other:?}"),
        }
    }

    #[test]
    fn rejects_lowercase_extension() {
        let slot = name_slot(b"ship.bnd", 0);
        assert!(matches!(
            normalize_name(3, &slot),
            Err(FormatError::MalformedName { slot: 3, .. })
        ));
    }

    #[test]
    fn rejects_descending_offsets() {
        let data = build_archive(&[(b"A.BND", 80), (b"B.BND", 60)], 120);
        assert!(matches!(
            decode_directory(&data),
            Err(FormatError::EntryOutOfOrder { offset: 60, previous: 80, .. })
        ));
    }

    #[test]
    fn rejects_offsets_past_the_end() {
        let data = build_archive(&[(b"A.BND", 500)], 64);
        assert!(matches!(
            decode_directory(&data),
            Err(FormatError::EntryOutOfBounds { offset: 500, .. })
        ));
    }

    #[test]
    fn empty_directory_has_no_entries() {
        let data = 0u32.to_le_bytes();
        assert!(decode_directory(&data).unwrap().is_empty());
    }

    #[test]
    fn decoding_is_repeatable() {
        let data = build_archive(&[(b"A.BND", 44), (b"B.TIM", 70)], 128);
        assert_eq!(
            decode_directory(&data).unwrap(),
            decode_directory(&data).unwrap()
        );
    }

    #[test]
    fn opens_archive_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = build_archive(&[(b"DEMO.BND", 24)], 24);
        data.extend_from_slice(b"ABCD");
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let archive = RscArchive::open(file.path()).unwrap();
        assert_eq!(archive.entries().len(), 1);
        let entry = archive.find_entry("demo.bnd").unwrap();
        assert_eq!(entry.offset, 24);
        assert_eq!(entry.size, 4);
        assert_eq!(archive.read_entry_bytes(entry), b"ABCD");

        let dest = NamedTempFile::new().unwrap();
        archive.extract_entry(entry, dest.path()).unwrap();
        assert_eq!(std::fs::read(dest.path()).unwrap(), b"ABCD");
    }
}
