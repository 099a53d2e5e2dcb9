pub mod descriptor;
pub mod hfs0;
pub mod keys;
pub mod keyset;
pub mod nacp;
pub mod nca;
pub mod nsp;
pub mod pfs0;
pub mod romfs;
pub mod xci;

pub use keys::TitleKeys;
pub use keyset::Keyset;
