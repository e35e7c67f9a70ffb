use secrecy::SecretString;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::filesystem::store::EncryptedFileStorage;

use super::error::{VaultError, VaultResult};
use super::models::{AccountEntry, EntryId};
use super::ports::VaultStorage;

/// What to do when an existing vault cannot be decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Start with an empty vault and report `LoadOutcome::Unreadable`.
    #[default]
    FallbackToEmpty,
    /// Return `DecryptionFailed` so the caller can ask for the passphrase again.
    Strict,
}

/// How the resident vault came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was persisted yet.
    NewVault,
    Opened { entries: usize },
    /// The persisted vault could not be decrypted; the session started empty.
    /// The next save replaces the file (the old bytes go to the first backup).
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn() + Send + Sync>;

/// Owns the in-memory account list for one session and keeps it in step with storage.
///
/// Constructing a manager loads the vault; there is no unloaded manager. Every
/// mutation is persisted in full before it is observable, and listeners are called
/// on the caller's thread after the write succeeds.
pub struct VaultManager {
    entries: Vec<AccountEntry>,
    storage: Box<dyn VaultStorage>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    outcome: LoadOutcome,
}

impl VaultManager {
    /// Load the vault at `path` with default storage settings, falling back to an
    /// empty vault when it cannot be decrypted.
    pub fn open(path: impl Into<PathBuf>, passphrase: SecretString) -> VaultResult<Self> {
        let storage = EncryptedFileStorage::for_path(path.into(), passphrase);
        Self::load(Box::new(storage), LoadPolicy::default())
    }

    pub fn load(storage: Box<dyn VaultStorage>, policy: LoadPolicy) -> VaultResult<Self> {
        let (entries, outcome) = match storage.load() {
            Ok(None) => (Vec::new(), LoadOutcome::NewVault),
            Ok(Some(entries)) => {
                let entries = dedup_ids(entries);
                let n = entries.len();
                (entries, LoadOutcome::Opened { entries: n })
            }
            Err(VaultError::DecryptionFailed) if policy == LoadPolicy::FallbackToEmpty => {
                warn!("vault could not be decrypted (wrong passphrase or corrupt file); starting empty");
                (Vec::new(), LoadOutcome::Unreadable)
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            entries,
            storage,
            listeners: Vec::new(),
            next_subscription: 0,
            outcome,
        })
    }

    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    /// Independent copy of all entries in insertion order.
    pub fn get_all(&self) -> Vec<AccountEntry> {
        self.entries.clone()
    }

    pub fn get(&self, id: &EntryId) -> Option<AccountEntry> {
        self.entries.iter().find(|e| e.id() == id).cloned()
    }

    /// Entries whose service name contains `query`, ignoring case. A blank query matches all.
    /// Surrounding whitespace in a non-blank query is part of the match.
    pub fn search(&self, query: &str) -> Vec<AccountEntry> {
        if query.trim().is_empty() {
            return self.get_all();
        }
        self.entries
            .iter()
            .filter(|e| e.matches_service(query))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn add(&mut self, entry: AccountEntry) -> VaultResult<()> {
        entry.validate()?;
        if self.entries.iter().any(|e| e.id() == entry.id()) {
            return Err(VaultError::Validation(format!(
                "an entry with id {} already exists",
                entry.id()
            )));
        }
        self.entries.push(entry);
        if let Err(e) = self.storage.save(&self.entries) {
            self.entries.pop();
            return Err(e);
        }
        self.notify();
        Ok(())
    }

    /// Remove the entry with `id`. Returns false when there is none.
    pub fn remove(&mut self, id: &EntryId) -> VaultResult<bool> {
        let Some(index) = self.entries.iter().position(|e| e.id() == id) else {
            return Ok(false);
        };
        let removed = self.entries.remove(index);
        if let Err(e) = self.storage.save(&self.entries) {
            self.entries.insert(index, removed);
            return Err(e);
        }
        self.notify();
        Ok(true)
    }

    /// Register a change listener. It receives no payload; re-query after it fires.
    pub fn subscribe(&mut self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        debug!(listeners = self.listeners.len(), entries = self.entries.len(), "vault changed");
        for (_, listener) in &self.listeners {
            listener();
        }
    }
}

// Ids are unique within a vault; a file that repeats one keeps the first record.
fn dedup_ids(entries: Vec<AccountEntry>) -> Vec<AccountEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    let total = entries.len();
    let unique: Vec<AccountEntry> = entries
        .into_iter()
        .filter(|e| seen.insert(e.id().clone()))
        .collect();
    if unique.len() != total {
        warn!(
            dropped = total - unique.len(),
            "vault holds duplicate entry ids; keeping the first of each"
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::store::testing::MemoryByteStore;
    use crate::vault::codec::JsonCodec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn storage(store: &Arc<MemoryByteStore>, pw: &str) -> Box<dyn VaultStorage> {
        Box::new(
            EncryptedFileStorage::new(
                store.clone(),
                Arc::new(JsonCodec),
                SecretString::from(pw.to_string()),
            )
            .with_iterations(1_000),
        )
    }

    fn entry(service: &str, login: &str) -> AccountEntry {
        AccountEntry::new(service, login, SecretString::from("x".to_string()), "")
    }

    #[test]
    fn fresh_store_is_a_new_vault() {
        let store = Arc::new(MemoryByteStore::default());
        let m = VaultManager::load(storage(&store, "pw"), LoadPolicy::Strict).unwrap();
        assert_eq!(m.outcome(), LoadOutcome::NewVault);
        assert_eq!(m.count(), 0);
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }

    #[test]
    fn failed_write_rolls_back_add_and_remove() {
        let store = Arc::new(MemoryByteStore::default());
        let mut m = VaultManager::load(storage(&store, "pw"), LoadPolicy::Strict).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        m.subscribe(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        let keep = entry("Gmail", "a@b.com");
        let keep_id = keep.id().clone();
        m.add(keep).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        *store.fail_writes.lock().unwrap() = true;
        assert!(matches!(m.add(entry("Other", "me")), Err(VaultError::Io(_))));
        assert_eq!(m.count(), 1);
        assert!(matches!(m.remove(&keep_id), Err(VaultError::Io(_))));
        assert_eq!(m.count(), 1);
        assert_eq!(m.get_all()[0].id(), &keep_id);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = Arc::new(MemoryByteStore::default());
        let mut m = VaultManager::load(storage(&store, "pw"), LoadPolicy::Strict).unwrap();
        let e = entry("Gmail", "a@b.com");
        m.add(e.clone()).unwrap();
        assert!(matches!(m.add(e), Err(VaultError::Validation(_))));
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Arc::new(MemoryByteStore::default());
        let mut m = VaultManager::load(storage(&store, "pw"), LoadPolicy::Strict).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let sub = m.subscribe(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        m.add(entry("a", "b")).unwrap();
        assert!(m.unsubscribe(sub));
        assert!(!m.unsubscribe(sub));
        m.add(entry("c", "d")).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_unknown_id_is_not_an_error_and_does_not_write() {
        let store = Arc::new(MemoryByteStore::default());
        let mut m = VaultManager::load(storage(&store, "pw"), LoadPolicy::Strict).unwrap();
        m.add(entry("a", "b")).unwrap();
        let writes = *store.writes.lock().unwrap();
        assert!(!m.remove(&EntryId::from("missing")).unwrap());
        assert_eq!(*store.writes.lock().unwrap(), writes);
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn fallback_and_strict_policies() {
        let store = Arc::new(MemoryByteStore::default());
        let mut m = VaultManager::load(storage(&store, "right"), LoadPolicy::Strict).unwrap();
        m.add(entry("a", "b")).unwrap();

        let fallback = VaultManager::load(storage(&store, "wrong"), LoadPolicy::FallbackToEmpty)
            .unwrap();
        assert_eq!(fallback.outcome(), LoadOutcome::Unreadable);
        assert_eq!(fallback.count(), 0);

        assert!(matches!(
            VaultManager::load(storage(&store, "wrong"), LoadPolicy::Strict),
            Err(VaultError::DecryptionFailed)
        ));

        let reopened = VaultManager::load(storage(&store, "right"), LoadPolicy::Strict).unwrap();
        assert_eq!(reopened.outcome(), LoadOutcome::Opened { entries: 1 });
    }
}
