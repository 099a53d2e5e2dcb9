//! Block-cipher wrapper functions.
//!
//! Pure-function crypto primitives (§6 of the design): the rest of the crate
//! never touches `aes`/`ctr`/`ecb`/`xts-mode` types directly, it calls these.

use aes::Aes128;
use cipher::{BlockDecryptMut, KeyInit, KeyIvInit, StreamCipher, block_padding::NoPadding};
use xts_mode::Xts128;

use crate::error::Error;

/// Returns the tweak Nintendo uses for NCA header AES-XTS: the sector index
/// packed as a big-endian 128-bit integer (standard XTS packs it little-endian).
pub fn get_nintendo_tweak(sector_index: u128) -> [u8; 0x10] {
    sector_index.to_be_bytes()
}

/// Decrypts `ciphertext` with AES-128-ECB using `key`. `ciphertext` must be a
/// multiple of the AES block size (16 bytes); the NCA key area (0x40 bytes)
/// always is.
pub fn aes_ecb_decrypt(key: &[u8; 0x10], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    type Aes128EcbDec = ecb::Decryptor<Aes128>;

    let mut buf = ciphertext.to_vec();
    Aes128EcbDec::new(key.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| Error::Crypto("ECB decrypt failed (bad block alignment)".into()))?;
    Ok(buf)
}

/// Decrypts `ciphertext` with AES-128-CTR using `key` and a 16-byte big-endian
/// IV. Length does not need to be block-aligned; CTR mode is a stream cipher.
pub fn aes_ctr_decrypt(key: &[u8; 0x10], iv: &[u8; 0x10], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = ciphertext.to_vec();
    let mut cipher = ctr::Ctr128BE::<Aes128>::new(key.into(), iv.into());
    cipher.apply_keystream(&mut buf);
    buf
}

/// Decrypts `ciphertext` with AES-XTS using the Nintendo (big-endian) tweak,
/// `sector_size`-byte sectors starting at `starting_sector`. `key` is the
/// 32-byte header key: two concatenated 16-byte AES-128 keys.
pub fn aes_xts_decrypt(
    key: &[u8; 0x20],
    ciphertext: &[u8],
    sector_size: usize,
    starting_sector: u128,
) -> Vec<u8> {
    let cipher_1 = Aes128::new_from_slice(&key[..0x10]).expect("16-byte key half");
    let cipher_2 = Aes128::new_from_slice(&key[0x10..]).expect("16-byte key half");
    let xts = Xts128::new(cipher_1, cipher_2);

    let mut buf = ciphertext.to_vec();
    xts.decrypt_area(&mut buf, sector_size, starting_sector, get_nintendo_tweak);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nintendo_tweak_is_big_endian_sector() {
        let tweak = get_nintendo_tweak(0x0102030405060708);
        assert_eq!(
            tweak,
            [0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn ctr_round_trip() {
        let key = [0x42u8; 0x10];
        let iv = get_nintendo_tweak(7);
        let plaintext = b"0123456789ABCDEF";

        let encrypted = aes_ctr_decrypt(&key, &iv, plaintext);
        let decrypted = aes_ctr_decrypt(&key, &iv, &encrypted);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ecb_round_trip_via_encrypt() {
        use cipher::BlockEncryptMut;
        type Aes128EcbEnc = ecb::Encryptor<Aes128>;

        let key = [0x11u8; 0x10];
        let plaintext = [0x55u8; 0x40];
        let mut buf = plaintext.to_vec();
        Aes128EcbEnc::new(&key.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, 0x40)
            .unwrap();

        let decrypted = aes_ecb_decrypt(&key, &buf).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
