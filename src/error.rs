use cipher::InvalidLength;
use thiserror::Error;

/// Crate-wide error type.
///
/// Variants track the failure kinds named in the format-parsing specification
/// rather than wrapping every possible I/O detail; callers that need more
/// context should look at the `#[source]`/`#[from]` chain.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse binary data: {0}")]
    BinaryParser(#[from] binrw::Error),

    #[error("unable to parse string: {0}")]
    StringParser(#[from] core::str::Utf8Error),

    #[error("key file not found at {0}")]
    KeysNotFound(String),

    #[error("key file is malformed: {0}")]
    InvalidKeys(String),

    #[error("invalid header: expected {expected:?}, got {got:?}")]
    InvalidHeader { expected: Vec<u8>, got: Vec<u8> },

    #[error("invalid NCA: magic is not NCA3")]
    InvalidNca,

    #[error("unsupported FS-section encryption type: {found}")]
    UnsupportedEncryption { found: String },

    #[error("NCA is rights-ID protected; ticket-based title-key derivation is not implemented")]
    UnsupportedRightsTicket,

    #[error("FS-section hash type is neither HierarchicalSha256 nor HierarchicalIntegrity")]
    InvalidHashType,

    #[error("RomFS header size exceeds 0x50 bytes")]
    InvalidRomFs,

    #[error("seek outside the region's logical bounds")]
    OutOfBounds,

    #[error("unexpected end of stream reading a fixed-width value")]
    UnexpectedEof,

    #[error("invalid value {value:#x} for enum field {field}")]
    InvalidEnum { field: &'static str, value: u64 },

    #[error("key lookup failed: {0}")]
    KeyLookup(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("title key error: {0}")]
    TitleKey(#[from] crate::formats::keys::KeyError),
}

impl From<InvalidLength> for Error {
    fn from(_: InvalidLength) -> Self {
        Error::Crypto("invalid key length".to_string())
    }
}
