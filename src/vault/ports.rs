use super::error::VaultResult;
use super::models::AccountEntry;

/// Turns the account list into plaintext bytes and back.
pub trait RecordCodec: Send + Sync {
    fn encode(&self, entries: &[AccountEntry]) -> VaultResult<Vec<u8>>;
    fn decode(&self, data: &[u8]) -> VaultResult<Vec<AccountEntry>>;
}

/// Raw persisted bytes. `read` yields `None` when nothing has been written yet.
pub trait ByteStore: Send + Sync {
    fn read(&self) -> VaultResult<Option<Vec<u8>>>;
    fn write(&self, bytes: &[u8]) -> VaultResult<()>;
}

/// Where a vault lives. `load` yields `None` for a vault that does not exist yet.
pub trait VaultStorage: Send + Sync {
    fn load(&self) -> VaultResult<Option<Vec<AccountEntry>>>;
    fn save(&self, entries: &[AccountEntry]) -> VaultResult<()>;
}
