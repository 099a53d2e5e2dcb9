//! # Partition FS archives (PFS0 / HFS0)
//!
//! A flat archive of named entries: a header, a fixed-size entry table, a
//! string table, then the file data itself (§4.6). PFS0 (`"PFS0"` magic) is
//! used for NSPs and for NCA-embedded partitions; HFS0 (`"HFS0"` magic) is
//! the same layout with a per-entry hash appended, used inside XCI images.
//! Both are parsed by the one `Partition` type here — only the magic and
//! entry stride differ.

use binrw::prelude::*;

use crate::error::Error;
use crate::io::{DynReader, ReaderCursor, Readable, SubRegion};
use std::sync::Arc;

#[derive(BinRead, Debug, Clone, Copy)]
#[brw(little)]
struct RawHeader {
    num_files: u32,
    string_table_size: u32,
    _reserved: u32,
}

/// The fields every Partition FS entry variant shares as its first 0x14
/// bytes; HFS0 entries carry 0x28 additional bytes (hashed-region size and a
/// SHA-256) that this crate doesn't otherwise need.
#[derive(BinRead, Debug, Clone, Copy)]
#[brw(little)]
struct RawEntryPrefix {
    data_offset: u64,
    data_size: u64,
    string_table_offset: u32,
    _reserved: u32,
}

/// One named entry in a partition, with offsets already resolved to
/// absolute positions within the partition's own address space.
#[derive(Debug, Clone)]
pub struct PartitionEntry {
    pub name: String,
    pub data_offset: u64,
    pub data_size: u64,
}

/// A parsed PFS0 or HFS0 archive.
pub struct Partition {
    reader: DynReader,
    entries: Vec<PartitionEntry>,
    data_start: u64,
}

impl Partition {
    pub const PFS0_MAGIC: [u8; 4] = *b"PFS0";
    pub const HFS0_MAGIC: [u8; 4] = *b"HFS0";
    const PFS0_ENTRY_STRIDE: u64 = 0x18;
    const HFS0_ENTRY_STRIDE: u64 = 0x40;

    pub fn parse_pfs0(reader: DynReader) -> Result<Self, Error> {
        Self::parse(reader, &Self::PFS0_MAGIC, Self::PFS0_ENTRY_STRIDE)
    }

    pub fn parse_hfs0(reader: DynReader) -> Result<Self, Error> {
        Self::parse(reader, &Self::HFS0_MAGIC, Self::HFS0_ENTRY_STRIDE)
    }

    fn parse(reader: DynReader, magic: &[u8; 4], entry_stride: u64) -> Result<Self, Error> {
        let header_magic = reader.read_exact_at(0, 4)?;
        if header_magic != magic {
            return Err(Error::InvalidHeader {
                expected: magic.to_vec(),
                got: header_magic,
            });
        }

        let mut cursor = ReaderCursor(Arc::clone(&reader));
        cursor.0.seek(4)?;
        let header: RawHeader = cursor.read_le()?;

        let entry_table_offset = 0x10u64;
        let string_table_offset = entry_table_offset + header.num_files as u64 * entry_stride;
        let data_start = string_table_offset + header.string_table_size as u64;

        let string_table =
            reader.read_exact_at(string_table_offset, header.string_table_size as usize)?;

        let mut entries = Vec::with_capacity(header.num_files as usize);
        for i in 0..header.num_files as u64 {
            let entry_offset = entry_table_offset + i * entry_stride;
            let raw = reader.read_exact_at(entry_offset, std::mem::size_of::<u64>() * 2 + 8)?;
            let prefix: RawEntryPrefix = binrw::io::Cursor::new(&raw).read_le()?;

            let name_start = prefix.string_table_offset as usize;
            let name_end = string_table[name_start..]
                .iter()
                .position(|&b| b == 0)
                .map(|p| name_start + p)
                .unwrap_or(string_table.len());
            let name = std::str::from_utf8(&string_table[name_start..name_end])?.to_string();

            entries.push(PartitionEntry {
                name,
                data_offset: prefix.data_offset,
                data_size: prefix.data_size,
            });
        }

        Ok(Self {
            reader,
            entries,
            data_start,
        })
    }

    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    pub fn get_entry(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Opens entry `name` as a bounded sub-region of the partition's
    /// underlying reader.
    pub fn open(&self, name: &str) -> Result<DynReader, Error> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| Error::KeyLookup(format!("no such entry: {name}")))?;
        tracing::trace!(
            name,
            offset = format!("{:012x}", self.data_start + entry.data_offset),
            size = entry.data_size,
            "opening partition entry"
        );
        Ok(Arc::new(SubRegion::new(
            Arc::clone(&self.reader),
            self.data_start + entry.data_offset,
            entry.data_size,
        )))
    }

    /// Opens entry at index `idx`, in table order.
    pub fn open_at(&self, idx: usize) -> Result<DynReader, Error> {
        let entry = self
            .entries
            .get(idx)
            .ok_or_else(|| Error::KeyLookup(format!("no entry at index {idx}")))?;
        Ok(Arc::new(SubRegion::new(
            Arc::clone(&self.reader),
            self.data_start + entry.data_offset,
            entry.data_size,
        )))
    }

    /// Convenience iterator over entries whose name ends in `.nca`.
    pub fn ncas(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.entries.iter().filter(|e| e.name.ends_with(".nca"))
    }
}
