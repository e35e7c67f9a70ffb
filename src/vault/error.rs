use thiserror::Error;

use crate::cryptography::CryptoError;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("decryption failed (wrong passphrase or corrupt file)")]
    DecryptionFailed,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid key derivation input: {0}")]
    InvalidKeyDerivationInput(&'static str),

    #[error("vault file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("vault records could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cryptographic failure: {0}")]
    Crypto(CryptoError),
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::DecryptionFailed => VaultError::DecryptionFailed,
            CryptoError::InvalidKeyDerivationInput(why) => {
                VaultError::InvalidKeyDerivationInput(why)
            }
            other => VaultError::Crypto(other),
        }
    }
}
