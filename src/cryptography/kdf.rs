use ring::pbkdf2;
use secrecy::{ExposeSecret, SecretBox};
use std::num::NonZeroU32;

use super::CryptoError;

pub const KEY_LEN: usize = 32; // 256-bit key
pub const SALT_LEN: usize = 16;

/// Iteration count of the legacy layout. Sealed vaults record their own count in the header.
pub const LEGACY_ITERATIONS: u32 = 100_000;
pub const DEFAULT_ITERATIONS: u32 = LEGACY_ITERATIONS;

/// Fixed salt shared by every legacy vault file. Two legacy vaults with the same
/// passphrase therefore derive the same key; sealed vaults use a random salt instead.
pub const LEGACY_SALT: &[u8; SALT_LEN] = b"HafciumSalt2025!";

/// Upper bound accepted from a vault header, so a crafted file cannot stall the unlock.
pub const MAX_ITERATIONS: u32 = 10_000_000;

pub struct DerivedKey {
    key: SecretBox<Vec<u8>>, // zeroized on drop
}

impl DerivedKey {
    pub fn len(&self) -> usize {
        self.key.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the key as an AES-256 key.
    pub fn as_aes256(&self) -> Result<&[u8; KEY_LEN], CryptoError> {
        let bytes = self.key.expose_secret();
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))
    }
}

impl ExposeSecret<Vec<u8>> for DerivedKey {
    fn expose_secret(&self) -> &Vec<u8> {
        self.key.expose_secret()
    }
}

impl core::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"<REDACTED>")
            .finish()
    }
}

/// PBKDF2-HMAC-SHA256 over `passphrase` and `salt`.
pub fn derive_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<DerivedKey, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::InvalidKeyDerivationInput("empty passphrase"));
    }
    let iterations = NonZeroU32::new(iterations).ok_or(
        CryptoError::InvalidKeyDerivationInput("iteration count must be positive"),
    )?;
    if output_len == 0 {
        return Err(CryptoError::InvalidKeyDerivationInput(
            "output length must be positive",
        ));
    }
    let mut out = vec![0u8; output_len];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase.as_bytes(),
        &mut out,
    );
    Ok(DerivedKey {
        key: SecretBox::new(Box::new(out)),
    })
}

pub fn derive_vault_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<DerivedKey, CryptoError> {
    derive_key(passphrase, salt, iterations, KEY_LEN)
}

/// Key for the legacy IV || AES-256-CBC layout.
pub fn derive_legacy_key(passphrase: &str) -> Result<DerivedKey, CryptoError> {
    derive_vault_key(passphrase, LEGACY_SALT, LEGACY_ITERATIONS)
}
