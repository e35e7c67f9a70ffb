use super::error::VaultResult;
use super::models::AccountEntry;
use super::ports::RecordCodec;

/// Compact JSON array in insertion order, no schema version.
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, entries: &[AccountEntry]) -> VaultResult<Vec<u8>> {
        Ok(serde_json::to_vec(entries)?)
    }

    fn decode(&self, data: &[u8]) -> VaultResult<Vec<AccountEntry>> {
        // A literal `null` is an empty vault.
        let vault: Option<Vec<AccountEntry>> = serde_json::from_slice(data)?;
        Ok(vault.unwrap_or_default())
    }
}
