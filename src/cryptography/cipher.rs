use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::aead;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroize;

use super::kdf::{
    derive_legacy_key, derive_vault_key, DerivedKey, KEY_LEN, MAX_ITERATIONS, SALT_LEN,
};
use super::memlock::{lock_slice, unlock_slice};
use super::random::Rng;
use super::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const IV_LEN: usize = 16;
pub const BLOCK_LEN: usize = 16;
pub const NONCE_LEN: usize = 12; // 96-bit GCM nonce

// Sealed header layout (little-endian):
// magic: 4 bytes = b"LBOX"
// version: u16 = 1
// kdf_id: u8 (1 = PBKDF2-HMAC-SHA256)
// aead_id: u8 (1 = AES-256-GCM)
// iterations: u32
// salt: [u8; SALT_LEN]
// nonce: [u8; NONCE_LEN]
pub const HEADER_MAGIC: &[u8; 4] = b"LBOX";
pub const HEADER_VERSION: u16 = 1;
pub const KDF_PBKDF2_SHA256: u8 = 1;
pub const AEAD_AES256GCM: u8 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + SALT_LEN + NONCE_LEN;

/// On-disk layout used when writing a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaultFormat {
    /// Random per-vault salt, AES-256-GCM, header authenticated as AAD.
    #[default]
    Sealed,
    /// `IV || AES-256-CBC(plain)` under the fixed legacy salt; no integrity check.
    LegacyCbc,
}

impl fmt::Display for VaultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultFormat::Sealed => f.write_str("sealed"),
            VaultFormat::LegacyCbc => f.write_str("legacy-cbc"),
        }
    }
}

impl FromStr for VaultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sealed" => Ok(VaultFormat::Sealed),
            "legacy-cbc" | "legacy" | "cbc" => Ok(VaultFormat::LegacyCbc),
            other => Err(format!("unknown vault format \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedHeader {
    pub version: u16,
    pub kdf_id: u8,
    pub aead_id: u8,
    pub iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("ciphertext too short for header")]
    TooShort,
    #[error("invalid magic (expected LBOX)")]
    InvalidMagic,
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),
    #[error("unsupported kdf id: {0}")]
    UnsupportedKdf(u8),
    #[error("unsupported aead id: {0}")]
    UnsupportedAead(u8),
    #[error("iteration count {0} out of range")]
    InvalidIterations(u32),
}

fn build_header(iterations: u32, salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN]) -> Vec<u8> {
    let mut h = Vec::with_capacity(HEADER_LEN);
    h.extend_from_slice(HEADER_MAGIC);
    h.extend_from_slice(&HEADER_VERSION.to_le_bytes());
    h.push(KDF_PBKDF2_SHA256);
    h.push(AEAD_AES256GCM);
    h.extend_from_slice(&iterations.to_le_bytes());
    h.extend_from_slice(salt);
    h.extend_from_slice(nonce);
    h
}

/// Parse a sealed header; returns it with the offset where the ciphertext starts.
pub fn parse_header(data: &[u8]) -> Result<(SealedHeader, usize), HeaderError> {
    if data.len() < HEADER_LEN {
        return Err(HeaderError::TooShort);
    }
    if &data[0..4] != HEADER_MAGIC {
        return Err(HeaderError::InvalidMagic);
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != HEADER_VERSION {
        return Err(HeaderError::UnsupportedVersion(version));
    }
    let kdf_id = data[6];
    if kdf_id != KDF_PBKDF2_SHA256 {
        return Err(HeaderError::UnsupportedKdf(kdf_id));
    }
    let aead_id = data[7];
    if aead_id != AEAD_AES256GCM {
        return Err(HeaderError::UnsupportedAead(aead_id));
    }
    let iterations = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(HeaderError::InvalidIterations(iterations));
    }
    let salt_off = 12;
    let nonce_off = salt_off + SALT_LEN;
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[salt_off..nonce_off]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[nonce_off..nonce_off + NONCE_LEN]);
    let header = SealedHeader {
        version,
        kdf_id,
        aead_id,
        iterations,
        salt,
        nonce,
    };
    Ok((header, HEADER_LEN))
}

/// SHA-256 over the header fields except the nonce; stable across saves of one vault.
pub fn header_fingerprint(hdr: &SealedHeader) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HEADER_MAGIC);
    hasher.update(hdr.version.to_le_bytes());
    hasher.update([hdr.kdf_id]);
    hasher.update([hdr.aead_id]);
    hasher.update(hdr.iterations.to_le_bytes());
    hasher.update(hdr.salt);
    hex::encode(hasher.finalize())
}

/// Layout of an existing blob, as `open` would interpret it.
pub fn detect_format(blob: &[u8]) -> VaultFormat {
    match parse_header(blob) {
        Ok(_) => VaultFormat::Sealed,
        Err(_) => VaultFormat::LegacyCbc,
    }
}

// Copies the key into a stack array that is locked while `f` runs and zeroized afterwards.
fn with_key_bytes<T>(
    key: &DerivedKey,
    f: impl FnOnce(&[u8; KEY_LEN]) -> Result<T, CryptoError>,
) -> Result<T, CryptoError> {
    let mut key_arr = *key.as_aes256()?;
    let _ = lock_slice(&mut key_arr);
    let out = f(&key_arr);
    let _ = unlock_slice(&mut key_arr);
    key_arr.zeroize();
    out
}

// ===== Legacy layout: IV || AES-256-CBC (PKCS#7) =====

pub fn encrypt_cbc(plain: &[u8], key: &DerivedKey, rng: &dyn Rng) -> Result<Vec<u8>, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv)?;
    let ciphertext = with_key_bytes(key, |k| {
        Ok(Aes256CbcEnc::new(&(*k).into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plain))
    })?;
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Fails with `DecryptionFailed` on short or misaligned input and on bad padding.
/// Without a MAC a wrong key passes the padding check now and then and yields garbage.
pub fn decrypt_cbc(blob: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < IV_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (iv, ciphertext) = blob.split_at(IV_LEN);
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptionFailed);
    }
    let mut iv_arr = [0u8; IV_LEN];
    iv_arr.copy_from_slice(iv);
    with_key_bytes(key, |k| {
        Aes256CbcDec::new(&(*k).into(), &iv_arr.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    })
}

// ===== Sealed layout: header || AES-256-GCM(plain) =====

pub fn encrypt_sealed(
    plain: &[u8],
    key: &DerivedKey,
    iterations: u32,
    salt: &[u8; SALT_LEN],
    rng: &dyn Rng,
) -> Result<Vec<u8>, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)?;
    let header = build_header(iterations, salt, &nonce_bytes);
    let sealed = with_key_bytes(key, |k| {
        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, k)
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let sealing_key = aead::LessSafeKey::new(unbound);
        let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);
        let mut in_out = plain.to_vec();
        in_out.reserve(aead::AES_256_GCM.tag_len());
        sealing_key
            .seal_in_place_append_tag(nonce, aead::Aad::from(&header), &mut in_out)
            .map_err(|_| CryptoError::EncryptionFailed)?;
        Ok(in_out)
    })?;
    let mut out = header;
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Authenticated decrypt; any wrong key or modified byte yields `DecryptionFailed`.
pub fn decrypt_sealed(blob: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CryptoError> {
    let (hdr, ct_offset) = parse_header(blob).map_err(|_| CryptoError::DecryptionFailed)?;
    with_key_bytes(key, |k| {
        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, k)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let opening_key = aead::LessSafeKey::new(unbound);
        let nonce = aead::Nonce::assume_unique_for_key(hdr.nonce);
        let aad = aead::Aad::from(&blob[..ct_offset]);
        let mut in_out = blob[ct_offset..].to_vec();
        let pt = opening_key
            .open_in_place(nonce, aad, &mut in_out)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(pt.to_vec())
    })
}

// ===== Passphrase-level entry points =====

/// Parameters for writing a sealed vault.
#[derive(Debug, Clone, Copy)]
pub struct SealParams {
    pub iterations: u32,
    /// Salt of the vault being rewritten; `None` creates a fresh one.
    pub salt: Option<[u8; SALT_LEN]>,
}

/// Encrypt `plain` under `passphrase` in the requested layout. The key lives only for this call.
pub fn seal(
    plain: &[u8],
    passphrase: &str,
    format: VaultFormat,
    params: SealParams,
    rng: &dyn Rng,
) -> Result<Vec<u8>, CryptoError> {
    match format {
        VaultFormat::LegacyCbc => {
            let key = derive_legacy_key(passphrase)?;
            encrypt_cbc(plain, &key, rng)
        }
        VaultFormat::Sealed => {
            let salt = match params.salt {
                Some(salt) => salt,
                None => {
                    let mut salt = [0u8; SALT_LEN];
                    rng.fill(&mut salt)?;
                    salt
                }
            };
            let key = derive_vault_key(passphrase, &salt, params.iterations)?;
            encrypt_sealed(plain, &key, params.iterations, &salt, rng)
        }
    }
}

/// Decrypt a blob written by `seal`, detecting its layout.
pub fn open(blob: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    match parse_header(blob) {
        Ok((hdr, _)) => {
            let key = derive_vault_key(passphrase, &hdr.salt, hdr.iterations)?;
            decrypt_sealed(blob, &key)
        }
        Err(_) => {
            let key = derive_legacy_key(passphrase)?;
            decrypt_cbc(blob, &key)
        }
    }
}
