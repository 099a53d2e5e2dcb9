//! Key store: parses a Nintendo Switch `prod.keys`-style text file.
//!
//! Grouping rule (§4.2): lines named `key_area_key_application_*` /
//! `..._ocean_*` / `..._system_*` are appended to their tier list in file
//! order — NOT sorted by the hex suffix in the name. Every other line lands
//! in a flat `name -> bytes` map.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use hex::FromHex;

use crate::crypto::aes_xts_decrypt;
use crate::error::Error;

#[derive(Clone, Debug, Default)]
pub struct Keyset {
    raw: HashMap<String, Vec<u8>>,
    pub key_area_application: Vec<[u8; 0x10]>,
    pub key_area_ocean: Vec<[u8; 0x10]>,
    pub key_area_system: Vec<[u8; 0x10]>,
}

/// Default key-file location: `$HOME/.switch/prod.keys`.
pub fn default_keys_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".switch").join("prod.keys"))
}

impl Keyset {
    /// Loads keys from the default location (`$HOME/.switch/prod.keys`).
    pub fn from_default_path() -> Result<Self, Error> {
        let path = default_keys_path()
            .ok_or_else(|| Error::KeysNotFound("could not resolve home directory".into()))?;
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|_| Error::KeysNotFound(path.display().to_string()))?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let mut keyset = Keyset::default();

        for line in BufReader::new(reader).lines() {
            let line = line.map_err(|e| Error::InvalidKeys(e.to_string()))?;
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim().to_string();
            let value = value.trim();

            let Ok(bytes) = Vec::from_hex(value) else {
                tracing::warn!(key = %name, "invalid hex value, skipping");
                continue;
            };

            if let Some(tier_bytes) = as_key_area_tier_entry(&bytes) {
                if name.starts_with("key_area_key_application_") {
                    keyset.key_area_application.push(tier_bytes);
                    continue;
                }
                if name.starts_with("key_area_key_ocean_") {
                    keyset.key_area_ocean.push(tier_bytes);
                    continue;
                }
                if name.starts_with("key_area_key_system_") {
                    keyset.key_area_system.push(tier_bytes);
                    continue;
                }
            }

            keyset.raw.insert(name, bytes);
        }

        if keyset.raw.is_empty()
            && keyset.key_area_application.is_empty()
            && keyset.key_area_ocean.is_empty()
            && keyset.key_area_system.is_empty()
        {
            return Err(Error::InvalidKeys("no keys parsed from key file".into()));
        }

        Ok(keyset)
    }

    /// Flat lookup for any key not in one of the three tier lists.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.raw.get(name).map(Vec::as_slice)
    }

    pub fn get_fixed<const N: usize>(&self, name: &str) -> Option<[u8; N]> {
        self.get(name).and_then(|bytes| bytes.try_into().ok())
    }

    /// The 32-byte NCA header key, concatenation of two AES-128 halves.
    pub fn header_key(&self) -> Option<[u8; 0x20]> {
        self.get_fixed("header_key")
    }

    pub fn title_kek(&self, generation: usize) -> Option<[u8; 0x10]> {
        self.get_fixed(&format!("titlekek_{:02x}", generation))
    }

    /// Decrypts the NCA header (first 0xC00 bytes) with the header key.
    pub fn decrypt_header(&self, encrypted: &[u8]) -> Result<Vec<u8>, Error> {
        let key = self
            .header_key()
            .ok_or_else(|| Error::KeyLookup("header_key not present".into()))?;
        Ok(aes_xts_decrypt(&key, encrypted, 0x200, 0))
    }
}

fn as_key_area_tier_entry(bytes: &[u8]) -> Option<[u8; 0x10]> {
    bytes.try_into().ok()
}
