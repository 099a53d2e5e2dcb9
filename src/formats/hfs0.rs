//! The Nintendo Hashed filesystem (HFS0) is the flavor of Partition FS used
//! inside XCI game-card images: identical layout to PFS0, with a per-entry
//! hash this crate doesn't verify. See [`crate::formats::pfs0::Partition`]
//! for the parser; this module just names the HFS0-flavored constructor.
//!
//! You still need the XCI module to locate the root HFS0 in a game-card
//! image — see [xci](crate::formats::xci).

use crate::error::Error;
use crate::formats::pfs0::Partition;
use crate::io::DynReader;

pub fn parse(reader: DynReader) -> Result<Partition, Error> {
    Partition::parse_hfs0(reader)
}
