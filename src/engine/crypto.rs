//! Page-level AES-CBC encryption keyed by a PBKDF2-HMAC-SHA1 password hash
//! (§6 "Encryption"). The header page is never encrypted: it carries its
//! own salt and format metadata in cleartext so a later `open` can derive
//! the same key from the password alone.
//!
//! Each page keeps its first 16 bytes (page id, type, prev/next pointers)
//! in cleartext and encrypts the remaining `PAGE_SIZE - 16` bytes as one
//! CBC run, with the IV derived from the page id so that no two pages
//! ever share plaintext/ciphertext alignment.

use crate::engine::PAGE_SIZE;
use crate::{Error, Result};
use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha1::Sha1;

pub(crate) const SALT_SIZE: usize = 16;
const PBKDF2_ITERATIONS: u32 = 20_000;
const CLEARTEXT_PREFIX: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub(crate) struct EncryptionService {
    key: [u8; 16],
    salt: [u8; SALT_SIZE],
}

impl EncryptionService {
    pub fn new(password: &str, salt: [u8; SALT_SIZE]) -> Self {
        let mut key = [0u8; 16];
        pbkdf2::<Hmac<Sha1>>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key)
            .expect("PBKDF2-HMAC-SHA1 with a 16-byte output never fails");

        EncryptionService { key, salt }
    }

    pub fn random_salt() -> [u8; SALT_SIZE] {
        use rand::RngCore;
        let mut salt = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut salt);
        salt
    }

    /// Per-page IV: the file salt with the page id folded into its first
    /// four bytes, so every page gets a distinct IV without storing one.
    fn iv_for_page(&self, page_id: u32) -> [u8; 16] {
        let mut iv = self.salt;
        for (byte, page_byte) in iv.iter_mut().zip(page_id.to_le_bytes()) {
            *byte ^= page_byte;
        }
        iv
    }

    /// Returns a ciphertext copy of `page`, leaving `page` itself
    /// untouched (the cache's copy must stay cleartext).
    pub fn encrypt_page(&self, page_id: u32, page: &[u8; PAGE_SIZE]) -> [u8; PAGE_SIZE] {
        let mut out = *page;
        let iv = self.iv_for_page(page_id);
        Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut out[CLEARTEXT_PREFIX..], PAGE_SIZE - CLEARTEXT_PREFIX)
            .expect("page body is a whole number of AES blocks");
        out
    }

    pub fn decrypt_page(&self, page_id: u32, page: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let iv = self.iv_for_page(page_id);
        Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut page[CLEARTEXT_PREFIX..])
            .map_err(|_| Error::wrong_password())?;
        Ok(())
    }
}

/// Decrypts `buf` in place if `enc` is set and `buf` isn't the header page
/// (page id 0, always cleartext). The page id is read straight out of
/// `buf`'s own cleartext prefix, so this needs no position bookkeeping.
pub(crate) fn maybe_decrypt(buf: &mut [u8; PAGE_SIZE], enc: Option<&EncryptionService>) -> Result<()> {
    let Some(enc) = enc else { return Ok(()) };
    let page_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if page_id == 0 {
        return Ok(());
    }
    enc.decrypt_page(page_id, buf)
}

/// Returns a ciphertext copy of `buf` for writing to disk, or a plain copy
/// when encryption is off or `buf` is the header page.
pub(crate) fn maybe_encrypt(buf: &[u8; PAGE_SIZE], enc: Option<&EncryptionService>) -> [u8; PAGE_SIZE] {
    let Some(enc) = enc else { return *buf };
    let page_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if page_id == 0 {
        return *buf;
    }
    enc.encrypt_page(page_id, buf)
}
