//! `binrw` structures for the NCA header and its four FS-section headers.
//!
//! These describe the *decrypted* 0xC00-byte header blob: the first 0x200
//! bytes are RSA signatures we don't otherwise use, the main header occupies
//! the following 0x200 bytes (`NcaHeaderFixed`, starting with the `NCA3`
//! magic), and the remaining 0x800 bytes are four 0x200-byte `FsHeader`s.

use binrw::prelude::*;

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionType {
    Download = 0x00,
    GameCard = 0x01,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Program = 0x00,
    Meta = 0x01,
    Control = 0x02,
    Manual = 0x03,
    Data = 0x04,
    PublicData = 0x05,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGenerationOld {
    Gen1_0_0 = 0x00,
    Unused = 0x01,
    Gen3_0_0 = 0x02,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAreaEncryptionKeyIndex {
    Application = 0x00,
    Ocean = 0x01,
    System = 0x02,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    RomFs = 0x00,
    PartitionFs = 0x01,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashType {
    #[default]
    Auto = 0x00,
    None = 0x01,
    HierarchicalSha256Hash = 0x02,
    HierarchicalIntegrityHash = 0x03,
    AutoSha3 = 0x04,
    HierarchicalSha3256Hash = 0x05,
    HierarchicalIntegritySha3Hash = 0x06,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    Auto = 0x00,
    None = 0x01,
    AesXts = 0x02,
    AesCtr = 0x03,
    AesCtrEx = 0x04,
    AesCtrSkipLayerHash = 0x05,
    AesCtrExSkipLayerHash = 0x06,
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDataHashType {
    None = 0x00,
    HierarchicalIntegrity = 0x01,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRegion {
    pub offset: u64,
    pub size: u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, PartialEq, Eq)]
pub struct HierarchicalIntegrityLevelInfo {
    pub logical_offset: u64,
    pub size: u64,
    pub block_size_log2: u32,
    pub _reserved: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, PartialEq, Eq)]
pub struct InfoLevelHash {
    pub max_layers: u32,
    #[br(count = 6)]
    pub levels: Vec<HierarchicalIntegrityLevelInfo>,
    pub signature_salt: [u8; 0x20],
}

/// Tagged by the FS-section header's `hash_type` (§4.4 step 6, §9 "model as
/// tagged variants"). The first variant has no `pre_assert` and acts as the
/// fallback for hash types this crate doesn't otherwise distinguish (`Auto`,
/// `None`, the SHA3 variants) — callers reject those at the semantic level
/// (`INVALID_HASH_TYPE`, §4.5 step 3), not at parse time.
#[binrw]
#[brw(little)]
#[derive(Debug, PartialEq, Eq)]
#[br(import(hash_type: HashType))]
pub enum HashData {
    HierarchicalSha256Hash {
        master_hash: [u8; 0x20],
        hash_block_size: u32,
        layer_count: u32,
        #[br(count = layer_count)]
        layer_regions: Vec<LayerRegion>,
    },
    #[br(pre_assert(hash_type == HashType::HierarchicalIntegrityHash))]
    HierarchicalIntegrity {
        #[br(magic = b"IVFC")]
        version: u32,
        master_hash_size: u32,
        info_level_hash: InfoLevelHash,
        master_hash: [u8; 0x20],
    },
}

impl HashData {
    /// The FS-section start offset, per §4.5 step 3.
    pub fn fs_start_offset(&self) -> Option<u64> {
        match self {
            HashData::HierarchicalSha256Hash { layer_regions, .. } => {
                layer_regions.get(1).map(|r| r.offset)
            }
            HashData::HierarchicalIntegrity {
                info_level_hash, ..
            } => info_level_hash.levels.last().map(|l| l.logical_offset),
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug)]
pub struct FsHeader {
    pub version: u16,
    pub fs_type: FsType,
    pub hash_type: HashType,
    pub encryption_type: EncryptionType,
    pub metadata_hash_type: MetaDataHashType,
    pub _reserved: [u8; 0x2],
    #[brw(pad_size_to = 0xF8)]
    #[br(args(hash_type))]
    pub hash_data: HashData,
    #[br(count = 0x40)]
    pub patch_info: Vec<u8>,
    pub ctr_upper: u64,
    #[br(count = 0x30)]
    pub sparse_info: Vec<u8>,
    #[br(count = 0x28)]
    pub compression_info: Vec<u8>,
    #[br(count = 0x30)]
    pub metadata_hash_data_info: Vec<u8>,
    #[br(count = 0x30)]
    pub _reserved2: Vec<u8>,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
pub struct RawFsEntry {
    pub start_media: u32,
    pub end_media: u32,
    pub _reserved: [u8; 8],
}

/// The main 0x200-byte header block, relative to the decrypted header's
/// 0x200 offset (so the struct's own `NCA3` magic lands at absolute 0x200).
#[binrw]
#[brw(little, magic = b"NCA3")]
#[derive(Debug)]
pub struct NcaHeaderFixed {
    pub distribution_type: DistributionType,
    pub content_type: ContentType,
    pub key_generation_old: KeyGenerationOld,
    pub key_area_encryption_key_index: KeyAreaEncryptionKeyIndex,
    pub content_size: u64,
    pub program_id: u64,
    pub content_index: u32,
    pub sdk_version: [u8; 4],
    pub key_generation: u8,
    pub _reserved: [u8; 0xF],
    pub rights_id: [u8; 0x10],
    #[br(count = 4)]
    pub fs_entries: Vec<RawFsEntry>,
    pub _reserved2: [u8; 0x80],
    pub key_area_encrypted: [u8; 0x40],
    pub _reserved3: [u8; 0xC0],
}
