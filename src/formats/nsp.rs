//! NSP (Nintendo Submission Package) containers, §4.8.
//!
//! An NSP is just a PFS0 opened directly on the root file reader — its
//! entries are NCAs plus a ticket/cert pair. `Nsp` is a thin named wrapper
//! over [`Partition`] so call sites read `Nsp::from_reader` rather than
//! reaching for the generic partition parser directly.

use crate::error::Error;
use crate::formats::pfs0::{Partition, PartitionEntry};
use crate::io::DynReader;

pub struct Nsp(Partition);

impl Nsp {
    pub fn from_reader(reader: DynReader) -> Result<Self, Error> {
        Ok(Self(Partition::parse_pfs0(reader)?))
    }

    pub fn entries(&self) -> &[PartitionEntry] {
        self.0.entries()
    }

    pub fn open(&self, name: &str) -> Result<DynReader, Error> {
        self.0.open(name)
    }

    /// Entries whose name ends in `.nca` — the titles's content archives.
    pub fn ncas(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.0.ncas()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use std::sync::Arc;

    #[test]
    fn nsp_is_a_plain_pfs0() {
        let mut names = Vec::new();
        names.extend_from_slice(b"game.nca\0ticket.tik\0");
        while names.len() % 4 != 0 {
            names.push(0);
        }

        let mut body = Vec::new();
        body.extend_from_slice(b"NCABYTES");
        body.extend_from_slice(b"TIKBYTES");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"PFS0");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&(names.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        // game.nca: offset 0, size 8, string_offset 0
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&8u64.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        // ticket.tik: offset 8, size 8, string_offset 9
        bytes.extend_from_slice(&8u64.to_le_bytes());
        bytes.extend_from_slice(&8u64.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&names);
        bytes.extend_from_slice(&body);

        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        let nsp = Nsp::from_reader(reader).unwrap();

        assert_eq!(nsp.entries().len(), 2);
        assert_eq!(nsp.ncas().count(), 1);
    }
}
