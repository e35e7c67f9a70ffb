pub mod cipher;
pub mod generator;
pub mod kdf;
pub mod memlock;
pub mod random;
pub mod types;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Wrong passphrase or corrupted ciphertext; the legacy layout cannot tell them apart.
    #[error("decryption failed (wrong passphrase or corrupt file)")]
    DecryptionFailed,
    #[error("invalid key derivation input: {0}")]
    InvalidKeyDerivationInput(&'static str),
    #[error("derived key has {0} bytes, expected 32")]
    InvalidKeyLength(usize),
    #[error("failed to obtain system randomness")]
    Randomness,
    #[error("cannot sample an index below {0}")]
    InvalidRange(usize),
    #[error("encryption failed")]
    EncryptionFailed,
}
