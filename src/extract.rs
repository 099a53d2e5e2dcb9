//! Component K: control flow composing the parsers below it to answer one
//! concrete question — "what is this title called?" — without the caller
//! having to hand-drive NCA/RomFS/NACP plumbing themselves.
//!
//! Grounded on `rominfo/main.py`'s control-NCA walk and `test.py`'s
//! `control_nca` end-to-end scenario: find the NCA whose `content_type` is
//! `Control`, open its first FS section as a RomFS, read `control.nacp`.

use crate::error::Error;
use crate::formats::keys::TitleKeys;
use crate::formats::keyset::Keyset;
use crate::formats::nacp::Nacp;
use crate::formats::nca::{ContentType, Nca};
use crate::formats::pfs0::PartitionEntry;
use crate::io::DynReader;

const CONTROL_NACP_NAME: &str = "control.nacp";

/// Anything that behaves like a container of NCAs: an [`Nsp`](crate::formats::nsp::Nsp)
/// directly, or an [`Xci`](crate::formats::xci::Xci) via its `secure` partition.
pub trait NcaSource {
    fn nca_entries(&self) -> Result<Vec<PartitionEntry>, Error>;
    fn open_nca(&self, name: &str) -> Result<DynReader, Error>;
}

impl NcaSource for crate::formats::nsp::Nsp {
    fn nca_entries(&self) -> Result<Vec<PartitionEntry>, Error> {
        Ok(self.ncas().cloned().collect())
    }

    fn open_nca(&self, name: &str) -> Result<DynReader, Error> {
        self.open(name)
    }
}

impl NcaSource for crate::formats::xci::Xci {
    fn nca_entries(&self) -> Result<Vec<PartitionEntry>, Error> {
        self.ncas()
    }

    fn open_nca(&self, name: &str) -> Result<DynReader, Error> {
        self.secure()?.open(name)
    }
}

/// Locates and opens the first NCA in `source` whose `content_type` is
/// `Control`.
pub fn find_control_nca(
    source: &impl NcaSource,
    keyset: &Keyset,
    title_keys: Option<&TitleKeys>,
) -> Result<Nca, Error> {
    for entry in source.nca_entries()? {
        let reader = source.open_nca(&entry.name)?;
        let nca = Nca::from_reader(reader, keyset, title_keys)?;
        if nca.header.content_type == ContentType::Control {
            return Ok(nca);
        }
    }

    Err(Error::KeyLookup("no control NCA found".into()))
}

/// End-to-end: find the control NCA, open its first FS section as a RomFS,
/// and parse `control.nacp` out of it.
pub fn read_title_nacp(
    source: &impl NcaSource,
    keyset: &Keyset,
    title_keys: Option<&TitleKeys>,
) -> Result<Nacp, Error> {
    let control = find_control_nca(source, keyset, title_keys)?;
    let romfs = control.open_romfs(0, keyset, title_keys)?;

    let file = romfs
        .get_file_by_name(CONTROL_NACP_NAME)
        .ok_or_else(|| Error::KeyLookup(format!("{CONTROL_NACP_NAME} not found in control RomFS")))?;
    let region = romfs.open(file);

    Nacp::parse(region)
}
