//! # RomFS (Read-Only FS)
//!
//! The Switch's read-only filesystem format used inside NCA "data"/"romfs"
//! FS sections. A 0x50-byte header names four hash/meta tables; this crate
//! only walks the file meta-table, as a flat sibling-linked chain starting
//! at its first entry (§4.7). Single directory entries can be parsed with
//! [`RomFs::directory_at`]/[`RomFs::root_directory`], but nothing here walks
//! `child`/`sibling` into a tree — hierarchical directory iteration is a
//! documented gap, not attempted here.

use crate::error::Error;
use crate::formats::descriptor::{read_u32_le_at, read_u64_le_at};
use crate::io::{DynReader, Readable, SubRegion};
use std::sync::Arc;

const HEADER_SIZE: u64 = 0x50;
const LAST_SIBLING: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy)]
struct RomFsHeader {
    data_offset: u64,
    dir_hash_table_offset: u64,
    dir_hash_table_size: u64,
    dir_meta_table_offset: u64,
    dir_meta_table_size: u64,
    file_meta_table_offset: u64,
    file_meta_table_size: u64,
}

impl RomFsHeader {
    fn parse(reader: &DynReader) -> Result<Self, Error> {
        let header_size = reader.read_exact_at(0, 8)?;
        let header_size = u64::from_le_bytes(header_size.try_into().unwrap());
        if header_size > HEADER_SIZE {
            return Err(Error::InvalidRomFs);
        }

        let raw = reader.read_exact_at(0, HEADER_SIZE as usize)?;

        Ok(Self {
            dir_hash_table_offset: read_u64_le_at(&raw, 0x08),
            dir_hash_table_size: read_u64_le_at(&raw, 0x10),
            dir_meta_table_offset: read_u64_le_at(&raw, 0x18),
            dir_meta_table_size: read_u64_le_at(&raw, 0x20),
            file_meta_table_offset: read_u64_le_at(&raw, 0x38),
            file_meta_table_size: read_u64_le_at(&raw, 0x40),
            data_offset: read_u64_le_at(&raw, 0x48),
        })
    }
}

/// A file entry from the RomFS file meta-table: `parent`/`sibling` link the
/// flat chain, `offset`/`size` locate the data within the RomFS's data
/// region, and `name` is the file's leaf name (no path components).
#[derive(Debug, Clone)]
pub struct RomFsFile {
    pub parent: u32,
    pub sibling: u32,
    pub offset: u64,
    pub size: u64,
    pub name: String,
}

/// A directory entry from the RomFS dir meta-table: `child`/`file` point at
/// the first child directory/file, `sibling` at the next directory sharing
/// this one's parent. Parsed on request (§9: "hierarchical directory
/// traversal is a documented gap") — no recursive walk is built on top of
/// this, matching the flat file-chain-only scope of `populate_files`.
#[derive(Debug, Clone)]
pub struct RomFsDirectory {
    pub parent: u32,
    pub sibling: u32,
    pub child: u32,
    pub file: u32,
    pub name: String,
}

/// A parsed RomFS: its header plus the flat chain of files reachable from
/// the file meta-table's first entry.
pub struct RomFs {
    reader: DynReader,
    header: RomFsHeader,
    files: Vec<RomFsFile>,
}

impl RomFs {
    pub fn parse(reader: DynReader) -> Result<Self, Error> {
        let header = RomFsHeader::parse(&reader)?;
        let files = Self::walk_files(&reader, &header)?;
        Ok(Self {
            reader,
            header,
            files,
        })
    }

    fn walk_files(reader: &DynReader, header: &RomFsHeader) -> Result<Vec<RomFsFile>, Error> {
        let mut files = Vec::new();
        let mut offset = 0u64;

        loop {
            if offset >= header.file_meta_table_size {
                break;
            }
            let entry_base = header.file_meta_table_offset + offset;

            let fixed = reader.read_exact_at(entry_base, 0x20)?;

            let parent = read_u32_le_at(&fixed, 0x0);
            let sibling = read_u32_le_at(&fixed, 0x4);
            let file_offset = read_u64_le_at(&fixed, 0x8);
            let file_size = read_u64_le_at(&fixed, 0x10);
            let name_size = read_u32_le_at(&fixed, 0x1C) as usize;

            let name_bytes = reader.read_exact_at(entry_base + 0x20, name_size)?;
            let name = std::str::from_utf8(&name_bytes)?.to_string();

            files.push(RomFsFile {
                parent,
                sibling,
                offset: file_offset,
                size: file_size,
                name,
            });

            if sibling == LAST_SIBLING {
                break;
            }
            offset = sibling as u64;
        }

        Ok(files)
    }

    pub fn files(&self) -> &[RomFsFile] {
        &self.files
    }

    pub fn get_file_by_name(&self, name: &str) -> Option<&RomFsFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Opens `file`'s data as a bounded sub-region (§4.7 step 3).
    pub fn open(&self, file: &RomFsFile) -> DynReader {
        Arc::new(SubRegion::new(
            Arc::clone(&self.reader),
            self.header.data_offset + file.offset,
            file.size,
        ))
    }

    /// Parses the directory entry at `offset` within the dir meta-table.
    /// Doesn't walk `child`/`sibling` itself — callers that need a directory
    /// tree have to do that walk manually; see the module doc for why this
    /// crate doesn't.
    pub fn directory_at(&self, offset: u64) -> Result<RomFsDirectory, Error> {
        let entry_base = self.header.dir_meta_table_offset + offset;
        let fixed = self.reader.read_exact_at(entry_base, 0x18)?;

        let parent = read_u32_le_at(&fixed, 0x0);
        let sibling = read_u32_le_at(&fixed, 0x4);
        let child = read_u32_le_at(&fixed, 0x8);
        let file = read_u32_le_at(&fixed, 0xC);
        let name_size = read_u32_le_at(&fixed, 0x14) as usize;

        let name_bytes = self.reader.read_exact_at(entry_base + 0x18, name_size)?;
        let name = std::str::from_utf8(&name_bytes)?.to_string();

        Ok(RomFsDirectory {
            parent,
            sibling,
            child,
            file,
            name,
        })
    }

    /// The root directory entry, at offset 0 of the dir meta-table.
    pub fn root_directory(&self) -> Result<RomFsDirectory, Error> {
        self.directory_at(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    fn pad4(buf: &mut Vec<u8>) {
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }

    fn build_romfs(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut meta_table = Vec::new();
        let mut data = Vec::new();
        let mut data_offset = 0u64;

        for (i, (name, contents)) in files.iter().enumerate() {
            let sibling_placeholder = if i + 1 < files.len() { 0u32 } else { LAST_SIBLING };

            meta_table.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // parent (unused)
            let sibling_field_pos = meta_table.len();
            meta_table.extend_from_slice(&sibling_placeholder.to_le_bytes());
            meta_table.extend_from_slice(&data_offset.to_le_bytes());
            meta_table.extend_from_slice(&(contents.len() as u64).to_le_bytes());
            meta_table.extend_from_slice(&0u32.to_le_bytes()); // hash
            meta_table.extend_from_slice(&(name.len() as u32).to_le_bytes());
            meta_table.extend_from_slice(name.as_bytes());
            pad4(&mut meta_table);

            if i + 1 < files.len() {
                let next_offset = meta_table.len() as u32;
                meta_table[sibling_field_pos..sibling_field_pos + 4]
                    .copy_from_slice(&next_offset.to_le_bytes());
            }

            data.extend_from_slice(contents);
            data_offset += contents.len() as u64;
        }

        let header_size = 0x50u64;
        let file_meta_offset = header_size;
        let file_meta_size = meta_table.len() as u64;
        let data_start = file_meta_offset + file_meta_size;

        let mut header = vec![0u8; 0x50];
        header[0x00..0x08].copy_from_slice(&header_size.to_le_bytes());
        header[0x38..0x40].copy_from_slice(&file_meta_offset.to_le_bytes());
        header[0x40..0x48].copy_from_slice(&file_meta_size.to_le_bytes());
        header[0x48..0x50].copy_from_slice(&data_start.to_le_bytes());

        let mut out = header;
        out.extend_from_slice(&meta_table);
        out.extend_from_slice(&data);
        out
    }

    #[test]
    fn walks_sibling_chain_and_opens_file_data() {
        let bytes = build_romfs(&[("control.nacp", b"NACPDATA"), ("icon.dat", b"ICONBYTES")]);
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        let romfs = RomFs::parse(reader).unwrap();

        assert_eq!(romfs.files().len(), 2);
        assert_eq!(romfs.files()[0].name, "control.nacp");
        assert_eq!(romfs.files()[1].name, "icon.dat");

        let file = romfs.get_file_by_name("control.nacp").unwrap();
        let region = romfs.open(file);
        assert_eq!(region.read_exact_at(0, 8).unwrap(), b"NACPDATA");
    }

    #[test]
    fn root_directory_parses_name_and_links() {
        let mut bytes = build_romfs(&[("control.nacp", b"NACPDATA")]);

        // Splice a one-entry dir meta-table in right after the header,
        // shifting the file meta-table / data after it, and point the
        // header's dir-meta fields at it.
        let mut dir_entry = Vec::new();
        dir_entry.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // parent
        dir_entry.extend_from_slice(&LAST_SIBLING.to_le_bytes()); // sibling
        dir_entry.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // child
        dir_entry.extend_from_slice(&0u32.to_le_bytes()); // file
        dir_entry.extend_from_slice(&0u32.to_le_bytes()); // hash
        dir_entry.extend_from_slice(&0u32.to_le_bytes()); // name_size (root is unnamed)

        let old_file_meta_offset = u64::from_le_bytes(bytes[0x38..0x40].try_into().unwrap());
        let new_file_meta_offset = old_file_meta_offset + dir_entry.len() as u64;
        let old_data_offset = u64::from_le_bytes(bytes[0x48..0x50].try_into().unwrap());
        let new_data_offset = old_data_offset + dir_entry.len() as u64;

        bytes[0x18..0x20].copy_from_slice(&old_file_meta_offset.to_le_bytes()); // dir_meta_table_offset
        bytes[0x20..0x28].copy_from_slice(&(dir_entry.len() as u64).to_le_bytes()); // dir_meta_table_size
        bytes[0x38..0x40].copy_from_slice(&new_file_meta_offset.to_le_bytes());
        bytes[0x48..0x50].copy_from_slice(&new_data_offset.to_le_bytes());

        let header: Vec<u8> = bytes[..0x50].to_vec();
        let rest: Vec<u8> = bytes[0x50..].to_vec();
        let mut spliced = header;
        spliced.extend_from_slice(&dir_entry);
        spliced.extend_from_slice(&rest);

        let reader: DynReader = Arc::new(MemoryReader::new(spliced));
        let romfs = RomFs::parse(reader).unwrap();

        let root = romfs.root_directory().unwrap();
        assert_eq!(root.name, "");
        assert_eq!(root.sibling, LAST_SIBLING);
        assert_eq!(romfs.files()[0].name, "control.nacp");
    }

    #[test]
    fn oversized_header_size_is_invalid_romfs() {
        let mut bytes = build_romfs(&[("a", b"x")]);
        bytes[0..8].copy_from_slice(&81u64.to_le_bytes());
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        assert!(matches!(RomFs::parse(reader), Err(Error::InvalidRomFs)));
    }
}
