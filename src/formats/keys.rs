//! Title-key store: rights-ID keyed, for ticket-protected NCAs.
//!
//! This only covers decrypting an *already-present* encrypted title key with
//! a title KEK (§ supplement 1 in SPEC_FULL.md) — deriving title keys from a
//! console or parsing `.tik` ticket files is out of scope.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use aes::Aes128;
use cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray};
use hex::decode as hex_decode;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode hex value: {0}")]
    HexDecodeError(#[from] hex::FromHexError),

    #[error("no title key found for rights ID {0}")]
    KeyNotFound(String),
}

/// Rights-ID -> encrypted title key map, loaded from a `title.keys` file.
#[derive(Default, Debug)]
pub struct TitleKeys {
    keys: HashMap<String, Vec<u8>>,
}

impl TitleKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_title_key(&mut self, rights_id: &str, key: Vec<u8>) {
        self.keys.insert(rights_id.to_uppercase(), key);
    }

    pub fn get_title_key(&self, rights_id: &str) -> Option<&Vec<u8>> {
        self.keys.get(&rights_id.to_uppercase())
    }

    /// Decrypts the stored (encrypted) title key for `rights_id` using the
    /// title KEK for the NCA's key generation.
    pub fn decrypt_title_key(
        &self,
        rights_id: &str,
        title_kek: &[u8],
    ) -> Result<[u8; 16], KeyError> {
        let enc_key = self
            .get_title_key(rights_id)
            .ok_or_else(|| KeyError::KeyNotFound(rights_id.to_string()))?;

        let mut block = GenericArray::from(<[u8; 16]>::try_from(enc_key.as_slice()).map_err(
            |_| KeyError::KeyNotFound(format!("malformed title key for {rights_id}")),
        )?);
        let key = GenericArray::from_slice(title_kek);
        Aes128::new(key).decrypt_block(&mut block);

        Ok(*block.as_ref())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        let file = File::open(path)?;
        let reader = io::BufReader::new(file);
        let mut keys = TitleKeys::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let Some(pos) = line.find('=') else {
                continue;
            };
            let rights_id = line[..pos].trim();
            let key_hex = line[pos + 1..].trim();

            if rights_id.len() != 32 {
                continue;
            }

            match hex_decode(key_hex) {
                Ok(key) if key.len() == 16 => {
                    keys.add_title_key(rights_id, key);
                    info!(rights_id, "loaded title key");
                }
                Ok(_) => warn!(rights_id, "title key has wrong length, expected 16 bytes"),
                Err(e) => warn!(rights_id, error = %e, "failed to decode title key hex"),
            }
        }

        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
