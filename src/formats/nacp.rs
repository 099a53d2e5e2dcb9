//! NACP (Application Control Property), §4.9.
//!
//! A fixed 0x4000-byte blob: 16 per-language title slots (name + publisher,
//! NUL-terminated, both empty ⇒ slot skipped) followed by a version string.
//! This is the file a control NCA's RomFS names `control.nacp`.

use crate::error::Error;
use crate::io::{DynReader, Readable};

const TITLE_SLOT_COUNT: usize = 16;
const TITLE_SLOT_SIZE: usize = 0x300;
const NAME_SIZE: usize = 0x200;
const PUBLISHER_SIZE: usize = 0x100;
const VERSION_OFFSET: u64 = 0x3060;
const VERSION_SIZE: usize = 0x10;

fn strip_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// One populated language slot (§3: "both all-zero ⇒ skip").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub language: u8,
    pub name: String,
    pub publisher: String,
}

/// A parsed NACP: the title slots that weren't empty, plus the version
/// string.
#[derive(Debug, Clone)]
pub struct Nacp {
    pub titles: Vec<Title>,
    pub version: String,
}

impl Nacp {
    pub fn parse(reader: DynReader) -> Result<Self, Error> {
        let mut titles = Vec::new();

        for i in 0..TITLE_SLOT_COUNT {
            let slot = reader.read_exact_at(i as u64 * TITLE_SLOT_SIZE as u64, TITLE_SLOT_SIZE)?;
            let name = strip_nul(&slot[..NAME_SIZE]);
            let publisher = strip_nul(&slot[NAME_SIZE..NAME_SIZE + PUBLISHER_SIZE]);

            if name.is_empty() && publisher.is_empty() {
                continue;
            }

            titles.push(Title {
                language: i as u8,
                name,
                publisher,
            });
        }

        let version_bytes = reader.read_exact_at(VERSION_OFFSET, VERSION_SIZE)?;
        let version = strip_nul(&version_bytes);

        Ok(Self { titles, version })
    }

    /// The first populated title slot, if any — the common case for
    /// single-language lookups (e.g. "what's this title called").
    pub fn primary_title(&self) -> Option<&Title> {
        self.titles.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use std::sync::Arc;

    fn build_nacp(slots: &[(usize, &str, &str)], version: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 0x4000];
        for &(index, name, publisher) in slots {
            let base = index * TITLE_SLOT_SIZE;
            buf[base..base + name.len()].copy_from_slice(name.as_bytes());
            buf[base + NAME_SIZE..base + NAME_SIZE + publisher.len()]
                .copy_from_slice(publisher.as_bytes());
        }
        let vbase = VERSION_OFFSET as usize;
        buf[vbase..vbase + version.len()].copy_from_slice(version.as_bytes());
        buf
    }

    #[test]
    fn only_populated_slots_survive_the_filter() {
        let bytes = build_nacp(
            &[(0, "Undertale", "tobyfox"), (3, "Undertale", "tobyfox")],
            "1.0.0",
        );
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        let nacp = Nacp::parse(reader).unwrap();

        assert_eq!(nacp.titles.len(), 2);
        assert_eq!(nacp.titles[0].language, 0);
        assert_eq!(nacp.titles[1].language, 3);
        assert_eq!(nacp.titles[0].name, "Undertale");
        assert_eq!(nacp.version, "1.0.0");
    }

    #[test]
    fn all_zero_slots_are_skipped() {
        let bytes = build_nacp(&[], "2.1.0");
        let reader: DynReader = Arc::new(MemoryReader::new(bytes));
        let nacp = Nacp::parse(reader).unwrap();
        assert!(nacp.titles.is_empty());
        assert_eq!(nacp.version, "2.1.0");
    }
}
