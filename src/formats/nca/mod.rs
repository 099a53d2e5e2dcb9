//! NCA (Nintendo Content Archive) parsing: header decryption, key-area
//! decryption, and FS-section opening.
//!
//! An NCA's first 0xC00 bytes are AES-XTS encrypted with the header key,
//! 0x200-byte sectors, Nintendo's big-endian tweak (§4.4). The decrypted
//! blob is a 0x200-byte main header (bytes 0x200..0x400 of the 0xC00, since
//! the leading 0x200 bytes beyond that are RSA signatures this crate
//! doesn't verify) followed by four 0x200-byte FS-section headers.

pub mod types;

use binrw::io::Cursor;
use binrw::BinReaderExt;
use std::sync::Arc;
use tracing::instrument;

use crate::crypto::aes_ecb_decrypt;
use crate::error::Error;
use crate::formats::descriptor::{bytes_or_absent, render_sdk_version};
use crate::formats::keyset::Keyset;
use crate::formats::keys::TitleKeys;
use crate::formats::pfs0::Partition;
use crate::formats::romfs::RomFs;
use crate::io::{CtrRegion, DynReader, Readable};

pub use types::{
    ContentType, DistributionType, EncryptionType, FsHeader, FsType, HashData, HashType,
    KeyAreaEncryptionKeyIndex, KeyGenerationOld,
};

const NCA_HEADER_SIZE: u64 = 0x400;
const NCA_FULL_HEADER_SIZE: usize = 0xC00;
const FS_SECTION_HEADER_SIZE: u64 = 0x200;

/// Rejects a raw `#[brw(repr = u8)]` enum byte that binrw would otherwise
/// report as an opaque `NoVariantMatch`, surfacing the field name and value
/// per §4.4 step 3 / §7 instead.
fn check_enum_byte(field: &'static str, value: u8, valid: &[u8]) -> Result<(), Error> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidEnum {
            field,
            value: value as u64,
        })
    }
}

/// A parsed FS entry from the NCA header's 4-entry table (§3): byte offsets
/// within the NCA, plus the original table index 0..3.
#[derive(Debug, Clone, Copy)]
pub struct FsEntry {
    pub index: usize,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// The decrypted key area (§4.4 step 4): `aes_xts_key` (0x20) ∥
/// `aes_ctr_key` (0x10) ∥ `unknown` (0x10).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyArea {
    pub aes_xts_key: [u8; 0x20],
    pub aes_ctr_key: [u8; 0x10],
    pub unknown: [u8; 0x10],
}

impl KeyArea {
    fn from_decrypted(bytes: &[u8; 0x40]) -> Self {
        let mut area = KeyArea::default();
        area.aes_xts_key.copy_from_slice(&bytes[..0x20]);
        area.aes_ctr_key.copy_from_slice(&bytes[0x20..0x30]);
        area.unknown.copy_from_slice(&bytes[0x30..0x40]);
        area
    }
}

/// Parsed, decrypted NCA header contents (§3/§4.4).
#[derive(Debug)]
pub struct NcaHeader {
    pub distribution_type: DistributionType,
    pub content_type: ContentType,
    pub key_generation_old: KeyGenerationOld,
    pub key_area_encryption_key_index: KeyAreaEncryptionKeyIndex,
    pub content_size: u64,
    pub program_id: u64,
    pub content_index: u32,
    pub sdk_version: String,
    pub key_generation: u8,
    pub rights_id: Option<[u8; 0x10]>,
    pub fs_entries: Vec<FsEntry>,
}

impl NcaHeader {
    /// Effective key generation, §4.4 step 4 / §9: `max(old, new)`, then
    /// `-1` unless the result is already zero.
    pub fn effective_key_generation(&self) -> u8 {
        let effective = self.key_generation_old as u8;
        let effective = effective.max(self.key_generation);
        if effective > 0 {
            effective - 1
        } else {
            effective
        }
    }

    fn parse(decrypted: &[u8]) -> Result<Self, Error> {
        let main = &decrypted[NCA_HEADER_SIZE as usize - 0x200..NCA_HEADER_SIZE as usize];

        check_enum_byte("distribution_type", main[4], &[0x00, 0x01])?;
        check_enum_byte("content_type", main[5], &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05])?;
        check_enum_byte("key_generation_old", main[6], &[0x00, 0x01, 0x02])?;
        check_enum_byte(
            "key_area_encryption_key_index",
            main[7],
            &[0x00, 0x01, 0x02],
        )?;

        let fixed: types::NcaHeaderFixed = Cursor::new(main).read_le().map_err(|e| {
            if matches!(e, binrw::Error::BadMagic { .. }) {
                Error::InvalidNca
            } else {
                Error::BinaryParser(e)
            }
        })?;

        let fs_entries = fixed
            .fs_entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.start_media != 0 || e.end_media != 0)
            .map(|(i, e)| FsEntry {
                index: i,
                start_offset: e.start_media as u64 * 0x200,
                end_offset: e.end_media as u64 * 0x200,
            })
            .collect();

        Ok(Self {
            distribution_type: fixed.distribution_type,
            content_type: fixed.content_type,
            key_generation_old: fixed.key_generation_old,
            key_area_encryption_key_index: fixed.key_area_encryption_key_index,
            content_size: fixed.content_size,
            program_id: fixed.program_id,
            content_index: fixed.content_index,
            sdk_version: render_sdk_version(fixed.sdk_version),
            key_generation: fixed.key_generation,
            rights_id: bytes_or_absent(&fixed.rights_id).map(|_| fixed.rights_id),
            fs_entries,
        })
    }
}

/// A parsed NCA: the decrypted header, its FS-section headers, and (if the
/// key area could be decrypted) the key area itself.
pub struct Nca {
    parent: DynReader,
    pub header: NcaHeader,
    /// FS-section headers tagged with their real section index (0..3) — the
    /// table is sparse, so this is never assumed to equal a `Vec` position.
    fs_headers: Vec<(usize, FsHeader)>,
    key_area: Option<KeyArea>,
}

impl Nca {
    #[instrument(level = "trace", skip(reader, keyset, title_keys), fields(content_type))]
    pub fn from_reader(
        reader: DynReader,
        keyset: &Keyset,
        title_keys: Option<&TitleKeys>,
    ) -> Result<Self, Error> {
        let encrypted = reader.read_exact_at(0, NCA_FULL_HEADER_SIZE)?;
        let decrypted = keyset.decrypt_header(&encrypted)?;

        let header = NcaHeader::parse(&decrypted)?;
        tracing::Span::current().record("content_type", format!("{:?}", header.content_type));
        tracing::trace!(
            program_id = format_args!("{:016x}", header.program_id),
            key_generation = header.key_generation,
            key_generation_old = header.key_generation_old as u8,
            sdk_version = %header.sdk_version,
            "NCA header decoded"
        );

        let mut fs_headers = Vec::new();
        for section in 0..4 {
            let offset = NCA_HEADER_SIZE as usize + section * FS_SECTION_HEADER_SIZE as usize;
            let slice = &decrypted[offset..offset + FS_SECTION_HEADER_SIZE as usize];
            if slice.iter().all(|&b| b == 0) {
                continue;
            }

            check_enum_byte("fs_type", slice[2], &[0x00, 0x01])?;
            check_enum_byte(
                "hash_type",
                slice[3],
                &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            )?;
            check_enum_byte(
                "encryption_type",
                slice[4],
                &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            )?;
            check_enum_byte("metadata_hash_type", slice[5], &[0x00, 0x01])?;

            let fs_header: FsHeader = Cursor::new(slice).read_le()?;
            tracing::trace!(
                section,
                fs_type = ?fs_header.fs_type,
                hash_type = ?fs_header.hash_type,
                encryption_type = ?fs_header.encryption_type,
                "FS-section header decoded"
            );
            fs_headers.push((section, fs_header));
        }

        let key_area = if header.rights_id.is_none() {
            let key_area_encrypted: [u8; 0x40] =
                decrypted[0x300..0x340].try_into().expect("0x40 bytes");
            Self::decrypt_key_area(&header, keyset, &key_area_encrypted)?
        } else {
            tracing::trace!("NCA is rights-ID protected, key area left undecrypted");
            None
        };

        Ok(Self {
            parent: reader,
            header,
            fs_headers,
            key_area,
        })
    }

    fn decrypt_key_area(
        header: &NcaHeader,
        keyset: &Keyset,
        encrypted: &[u8; 0x40],
    ) -> Result<Option<KeyArea>, Error> {
        let generation = header.effective_key_generation() as usize;
        let tier = match header.key_area_encryption_key_index {
            KeyAreaEncryptionKeyIndex::Application => &keyset.key_area_application,
            KeyAreaEncryptionKeyIndex::Ocean => &keyset.key_area_ocean,
            KeyAreaEncryptionKeyIndex::System => &keyset.key_area_system,
        };

        let Some(key) = tier.get(generation) else {
            tracing::warn!(
                generation,
                index = ?header.key_area_encryption_key_index,
                "key area key not present for this generation"
            );
            return Ok(None);
        };

        let decrypted = aes_ecb_decrypt(key, encrypted)?;
        let decrypted: [u8; 0x40] = decrypted.try_into().expect("ECB preserves length");
        Ok(Some(KeyArea::from_decrypted(&decrypted)))
    }

    /// The AES-CTR key to use for this NCA's FS sections: the key-area CTR
    /// key, or — if rights-ID protected — the decrypted title key.
    fn aes_ctr_key(&self, title_keys: Option<&TitleKeys>, keyset: &Keyset) -> Result<[u8; 0x10], Error> {
        if let Some(rights_id) = self.header.rights_id {
            let rights_id_hex = hex::encode_upper(rights_id);
            let title_keys = title_keys.ok_or(Error::UnsupportedRightsTicket)?;
            let kek = keyset
                .title_kek(self.header.effective_key_generation() as usize)
                .ok_or(Error::UnsupportedRightsTicket)?;
            return title_keys
                .decrypt_title_key(&rights_id_hex, &kek)
                .map_err(|_| Error::UnsupportedRightsTicket);
        }

        self.key_area
            .map(|area| area.aes_ctr_key)
            .ok_or_else(|| Error::KeyLookup("NCA key area was not decrypted".into()))
    }

    fn fs_entry_for(&self, section: usize) -> Option<&FsEntry> {
        self.header.fs_entries.iter().find(|e| e.index == section)
    }

    fn fs_header_for(&self, section: usize) -> Option<&FsHeader> {
        self.fs_headers
            .iter()
            .find(|(index, _)| *index == section)
            .map(|(_, header)| header)
    }

    /// Opens FS section `idx` (the true section index 0..3, not a position
    /// into an internal list) as a decrypted sub-region, per §4.5.
    #[instrument(level = "trace", skip(self, keyset, title_keys))]
    pub fn open_fs_section(
        &self,
        idx: usize,
        keyset: &Keyset,
        title_keys: Option<&TitleKeys>,
    ) -> Result<DynReader, Error> {
        let header = self
            .fs_header_for(idx)
            .ok_or_else(|| Error::KeyLookup(format!("no FS-section header at index {idx}")))?;

        if header.encryption_type != EncryptionType::AesCtr {
            return Err(Error::UnsupportedEncryption {
                found: format!("{:?}", header.encryption_type),
            });
        }

        let entry = self
            .fs_entry_for(idx)
            .ok_or_else(|| Error::KeyLookup(format!("no FS entry matching section {idx}")))?;

        let fs_start = match header.hash_type {
            HashType::HierarchicalSha256Hash | HashType::HierarchicalIntegrityHash => header
                .hash_data
                .fs_start_offset()
                .ok_or(Error::InvalidHashType)?,
            _ => return Err(Error::InvalidHashType),
        } + entry.start_offset;

        let key = self.aes_ctr_key(title_keys, keyset)?;

        Ok(Arc::new(CtrRegion::new(
            Arc::clone(&self.parent),
            fs_start,
            entry.end_offset,
            key,
            header.ctr_upper,
        )))
    }

    /// Opens FS section `idx` as a PFS0 partition.
    pub fn open_pfs0(
        &self,
        idx: usize,
        keyset: &Keyset,
        title_keys: Option<&TitleKeys>,
    ) -> Result<Partition, Error> {
        let reader = self.open_fs_section(idx, keyset, title_keys)?;
        Partition::parse_pfs0(reader)
    }

    /// Opens FS section `idx` as a RomFS.
    pub fn open_romfs(
        &self,
        idx: usize,
        keyset: &Keyset,
        title_keys: Option<&TitleKeys>,
    ) -> Result<RomFs, Error> {
        let reader = self.open_fs_section(idx, keyset, title_keys)?;
        RomFs::parse(reader)
    }
}
