//! XCI (game-card image) containers, §4.8.
//!
//! The raw dump of a Switch game card: a 0x200-byte `HEAD` header followed
//! by a root HFS0 partition whose entries are themselves named HFS0
//! partitions (`update`, `normal`, `secure`, `logo`) rather than files. The
//! `secure` partition is the one that actually holds the title's NCAs.

use binrw::prelude::*;

use crate::error::Error;
use crate::formats::pfs0::{Partition, PartitionEntry};
use crate::io::{DynReader, Readable};
use std::sync::Arc;

/// Game-card capacity, stored as a one-byte enum at 0x10D.
#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSize {
    Size1Gb = 0xFA,
    Size2Gb = 0xF8,
    Size4Gb = 0xF0,
    Size8Gb = 0xE0,
    Size16Gb = 0xE1,
    Size32Gb = 0xE2,
}

/// The 0x200-byte `HEAD` header (§3). Only the fields spec §4.8 names are
/// kept; the RSA signature occupying the first 0x100 bytes is skipped.
#[derive(Debug, Clone)]
pub struct XciHeader {
    pub rom_area_start_page_address: u32,
    pub title_key_dec_index: u8,
    pub rom_size: Option<CardSize>,
    pub version: u8,
    pub hfs_header_offset: u64,
    pub hfs_header_size: u64,
}

const HEAD_SIZE: usize = 0x200;

impl XciHeader {
    fn parse(raw: &[u8; HEAD_SIZE]) -> Result<Self, Error> {
        let magic = &raw[0x100..0x104];
        if magic != b"HEAD" {
            return Err(Error::InvalidHeader {
                expected: b"HEAD".to_vec(),
                got: magic.to_vec(),
            });
        }

        let rom_area_start_page_address = u32::from_le_bytes(raw[0x104..0x108].try_into().unwrap());
        let title_key_dec_index = raw[0x10C];
        let rom_size = match raw[0x10D] {
            0xFA => Some(CardSize::Size1Gb),
            0xF8 => Some(CardSize::Size2Gb),
            0xF0 => Some(CardSize::Size4Gb),
            0xE0 => Some(CardSize::Size8Gb),
            0xE1 => Some(CardSize::Size16Gb),
            0xE2 => Some(CardSize::Size32Gb),
            _ => None,
        };
        let version = raw[0x10E];
        let hfs_header_offset = u64::from_le_bytes(raw[0x130..0x138].try_into().unwrap());
        let hfs_header_size = u64::from_le_bytes(raw[0x138..0x140].try_into().unwrap());

        Ok(Self {
            rom_area_start_page_address,
            title_key_dec_index,
            rom_size,
            version,
            hfs_header_offset,
            hfs_header_size,
        })
    }
}

/// The four root partitions a real game card exposes by name (§4.8). Not
/// every card populates all four (e.g. a card with no update data omits
/// `update`) — `partitions()` reports only what's actually present.
pub const ROOT_PARTITION_NAMES: [&str; 4] = ["update", "normal", "secure", "logo"];

/// A parsed XCI: the HEAD header plus the root HFS0 partition table.
pub struct Xci {
    reader: DynReader,
    pub header: XciHeader,
    root: Partition,
}

impl Xci {
    pub fn from_reader(reader: DynReader) -> Result<Self, Error> {
        let raw: [u8; HEAD_SIZE] = reader
            .read_exact_at(0, HEAD_SIZE)?
            .try_into()
            .expect("read_exact_at returns exactly the requested length");
        let header = XciHeader::parse(&raw)?;

        let root_region = Arc::new(crate::io::SubRegion::new(
            Arc::clone(&reader),
            header.hfs_header_offset,
            header.hfs_header_size,
        ));
        let root = Partition::parse_hfs0(root_region)?;

        Ok(Self {
            reader,
            header,
            root,
        })
    }

    /// The root HFS0's own entries — named partitions, not files.
    pub fn root_entries(&self) -> &[PartitionEntry] {
        self.root.entries()
    }

    /// Opens one of the root's named partitions (`update`/`normal`/`secure`/
    /// `logo`) as its own HFS0. All four are exposed uniformly — §9 flags
    /// that real-world tools are often inconsistent about this; this crate
    /// isn't.
    pub fn partition(&self, name: &str) -> Result<Partition, Error> {
        let reader = self.root.open(name)?;
        Partition::parse_hfs0(reader)
    }

    /// The `secure` partition, which is where a title's playable NCAs live.
    pub fn secure(&self) -> Result<Partition, Error> {
        self.partition("secure")
    }

    /// Convenience over `secure()`: entries whose name ends in `.nca`.
    pub fn ncas(&self) -> Result<Vec<PartitionEntry>, Error> {
        Ok(self.secure()?.ncas().cloned().collect())
    }

    pub fn underlying(&self) -> DynReader {
        Arc::clone(&self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    fn build_hfs0(partitions: &[(&str, &[u8])]) -> Vec<u8> {
        let mut names = Vec::new();
        let mut name_offsets = Vec::new();
        for (name, _) in partitions {
            name_offsets.push(names.len() as u32);
            names.extend_from_slice(name.as_bytes());
            names.push(0);
        }
        while names.len() % 4 != 0 {
            names.push(0);
        }

        let mut body = Vec::new();
        let mut data_offset = 0u64;
        let mut entries = Vec::new();
        for (i, (_, data)) in partitions.iter().enumerate() {
            entries.push((data_offset, data.len() as u64, name_offsets[i]));
            body.extend_from_slice(data);
            data_offset += data.len() as u64;
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"HFS0");
        out.extend_from_slice(&(partitions.len() as u32).to_le_bytes());
        out.extend_from_slice(&(names.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        for (offset, size, name_off) in entries {
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&name_off.to_le_bytes());
            out.extend_from_slice(&[0u8; 0x2C]); // HFS0 hash/reserved padding
        }
        out.extend_from_slice(&names);
        out.extend_from_slice(&body);
        out
    }

    fn build_xci(secure_nca: &[u8]) -> Vec<u8> {
        let secure_hfs0 = build_hfs0(&[("rom.nca", secure_nca)]);
        let root_hfs0 = build_hfs0(&[("secure", &secure_hfs0)]);

        let mut head = vec![0u8; HEAD_SIZE];
        head[0x100..0x104].copy_from_slice(b"HEAD");
        head[0x104..0x108].copy_from_slice(&0u32.to_le_bytes());
        head[0x10D] = 0xFA; // 1GB
        let hfs_offset = HEAD_SIZE as u64;
        head[0x130..0x138].copy_from_slice(&hfs_offset.to_le_bytes());
        head[0x138..0x140].copy_from_slice(&(root_hfs0.len() as u64).to_le_bytes());

        let mut out = head;
        out.extend_from_slice(&root_hfs0);
        out
    }

    #[test]
    fn parses_header_and_exposes_secure_partition() {
        let bytes = build_xci(b"NCADATA");
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        let xci = Xci::from_reader(reader).unwrap();

        assert_eq!(xci.header.rom_size, Some(CardSize::Size1Gb));
        assert_eq!(xci.root_entries().len(), 1);
        assert_eq!(xci.root_entries()[0].name, "secure");

        let ncas = xci.ncas().unwrap();
        assert_eq!(ncas.len(), 1);
        assert_eq!(ncas[0].name, "rom.nca");
    }

    #[test]
    fn wrong_magic_is_invalid_header() {
        let mut bytes = build_xci(b"x");
        bytes[0x100] = b'X';
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        assert!(matches!(
            Xci::from_reader(reader),
            Err(Error::InvalidHeader { .. })
        ));
    }
}
