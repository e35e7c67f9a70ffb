use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::cryptography::cipher::{self, parse_header, SealParams, VaultFormat};
use crate::cryptography::kdf::DEFAULT_ITERATIONS;
use crate::cryptography::random::{Rng, SystemRng};
use crate::filesystem::secure::write_with_backups_n;
use crate::vault::codec::JsonCodec;
use crate::vault::error::{VaultError, VaultResult};
use crate::vault::models::AccountEntry;
use crate::vault::ports::{ByteStore, RecordCodec, VaultStorage};

pub const DEFAULT_BACKUPS: usize = 2;

pub struct FileByteStore {
    path: PathBuf,
    backups: usize,
}

impl FileByteStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            backups: DEFAULT_BACKUPS,
        }
    }

    pub fn new_with_backups(path: PathBuf, backups: usize) -> Self {
        Self { path, backups }
    }
}

impl ByteStore for FileByteStore {
    fn read(&self) -> VaultResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> VaultResult<()> {
        Ok(write_with_backups_n(&self.path, bytes, self.backups)?)
    }
}

/// Encrypted vault persistence: records are encoded, sealed under the master
/// passphrase and written as one blob. Keys are re-derived for every load and save.
pub struct EncryptedFileStorage {
    store: Arc<dyn ByteStore>,
    codec: Arc<dyn RecordCodec>,
    passphrase: SecretString,
    format: VaultFormat,
    iterations: u32,
    rng: Arc<dyn Rng>,
    // Layout of the bytes last read or written; `None` until a load succeeds.
    current_format: Mutex<Option<VaultFormat>>,
}

impl EncryptedFileStorage {
    pub fn new(
        store: Arc<dyn ByteStore>,
        codec: Arc<dyn RecordCodec>,
        passphrase: SecretString,
    ) -> Self {
        Self {
            store,
            codec,
            passphrase,
            format: VaultFormat::default(),
            iterations: DEFAULT_ITERATIONS,
            rng: Arc::new(SystemRng),
            current_format: Mutex::new(None),
        }
    }

    /// JSON records in a file at `path`, default backups.
    pub fn for_path(path: PathBuf, passphrase: SecretString) -> Self {
        Self::new(
            Arc::new(FileByteStore::new(path)),
            Arc::new(JsonCodec),
            passphrase,
        )
    }

    /// Layout used for writes. Reads always accept both layouts.
    pub fn with_format(mut self, format: VaultFormat) -> Self {
        self.format = format;
        self
    }

    /// PBKDF2 iterations for sealed writes; ignored by the legacy layout.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_rng(mut self, rng: Arc<dyn Rng>) -> Self {
        self.rng = rng;
        self
    }

    pub fn format(&self) -> VaultFormat {
        self.format
    }

    /// Layout of the vault as last decrypted or written by this storage.
    pub fn current_format(&self) -> Option<VaultFormat> {
        self.current_format.lock().map(|f| *f).unwrap_or(None)
    }

    fn set_current_format(&self, format: VaultFormat) {
        if let Ok(mut f) = self.current_format.lock() {
            *f = Some(format);
        }
    }
}

impl VaultStorage for EncryptedFileStorage {
    fn load(&self) -> VaultResult<Option<Vec<AccountEntry>>> {
        let Some(bytes) = self.store.read()? else {
            return Ok(None);
        };
        let format = cipher::detect_format(&bytes);
        let mut plain = cipher::open(&bytes, self.passphrase.expose_secret())?;
        let decoded = self.codec.decode(&plain);
        plain.zeroize();
        match decoded {
            Ok(entries) => {
                debug!(entries = entries.len(), %format, "vault decrypted");
                self.set_current_format(format);
                Ok(Some(entries))
            }
            // A wrong key can slip past CBC padding and produce garbage.
            Err(VaultError::Serialization(_)) if format == VaultFormat::LegacyCbc => {
                Err(VaultError::DecryptionFailed)
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, entries: &[AccountEntry]) -> VaultResult<()> {
        let existing = self.store.read()?;
        let previous_header = existing.as_deref().and_then(|b| parse_header(b).ok());
        if self.current_format() == Some(VaultFormat::LegacyCbc)
            && self.format == VaultFormat::Sealed
        {
            info!("rewriting legacy vault in the sealed format");
        }

        let params = SealParams {
            iterations: self.iterations,
            salt: previous_header.map(|(hdr, _)| hdr.salt),
        };
        let mut plain = self.codec.encode(entries)?;
        let sealed = cipher::seal(
            &plain,
            self.passphrase.expose_secret(),
            self.format,
            params,
            &*self.rng,
        );
        plain.zeroize();
        let blob = sealed?;
        self.store.write(&blob)?;
        self.set_current_format(self.format);
        debug!(entries = entries.len(), bytes = blob.len(), format = %self.format, "vault persisted");
        Ok(())
    }
}
