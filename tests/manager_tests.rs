use lockbox::cryptography::cipher::{seal, SealParams, VaultFormat};
use lockbox::cryptography::random::SystemRng;
use lockbox::filesystem::store::{EncryptedFileStorage, FileByteStore};
use lockbox::vault::codec::JsonCodec;
use lockbox::vault::error::VaultError;
use lockbox::vault::manager::{LoadOutcome, LoadPolicy, VaultManager};
use lockbox::vault::models::{AccountEntry, EntryId};
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn open(path: &Path, pw: &str, policy: LoadPolicy) -> Result<VaultManager, VaultError> {
    let storage = EncryptedFileStorage::new(
        Arc::new(FileByteStore::new(path.to_path_buf())),
        Arc::new(JsonCodec),
        SecretString::from(pw.to_string()),
    )
    .with_iterations(1_000);
    VaultManager::load(Box::new(storage), policy)
}

fn account(service: &str, login: &str, secret: &str) -> AccountEntry {
    AccountEntry::new(service, login, SecretString::from(secret.to_string()), "")
}

#[test]
fn add_then_reload_reproduces_the_entry() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");

    let mut m = open(&path, "pw", LoadPolicy::Strict).unwrap();
    assert_eq!(m.outcome(), LoadOutcome::NewVault);
    assert_eq!(m.count(), 0);
    assert!(!path.exists(), "loading must not create the file");

    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    assert_eq!(m.count(), 1);
    assert!(path.exists());

    let reloaded = open(&path, "pw", LoadPolicy::Strict).unwrap();
    assert_eq!(reloaded.outcome(), LoadOutcome::Opened { entries: 1 });
    let all = reloaded.get_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].service_name, "Gmail");
    assert_eq!(all[0].login, "a@b.com");
    assert_eq!(all[0].secret.expose_secret(), "x");
}

#[test]
fn order_and_fields_survive_reload() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let mut m = open(&path, "pw", LoadPolicy::Strict).unwrap();
    let mut with_note = account("Bank", "me", "p@ss");
    with_note.note = "pin in the drawer".into();
    let originals = vec![account("Zeta", "z", "1"), with_note, account("Alpha", "a", "2")];
    for e in &originals {
        m.add(e.clone()).unwrap();
    }

    let back = open(&path, "pw", LoadPolicy::Strict).unwrap().get_all();
    assert_eq!(back.len(), originals.len());
    for (a, b) in originals.iter().zip(&back) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.service_name, b.service_name);
        assert_eq!(a.login, b.login);
        assert_eq!(a.secret.expose_secret(), b.secret.expose_secret());
        assert_eq!(a.note, b.note);
        assert_eq!(a.created_at(), b.created_at());
    }
}

#[test]
fn search_is_case_insensitive_and_blank_returns_everything() {
    let td = tempdir().unwrap();
    let mut m = open(&td.path().join("vault.dat"), "pw", LoadPolicy::Strict).unwrap();
    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    m.add(account("Outlook", "a@b.com", "y")).unwrap();
    m.add(account("Google Drive", "a@b.com", "z")).unwrap();

    let all: Vec<_> = m.search("").iter().map(|e| e.service_name.clone()).collect();
    assert_eq!(all, ["Gmail", "Outlook", "Google Drive"]);
    assert_eq!(m.search("   ").len(), 3);

    let hits = m.search("GMAIL");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].service_name, "Gmail");

    assert_eq!(m.search("g").len(), 2);
    assert!(m.search("dropbox").is_empty());
}

#[test]
fn remove_persists_and_unknown_ids_are_ignored() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let mut m = open(&path, "pw", LoadPolicy::Strict).unwrap();
    let gmail = account("Gmail", "a@b.com", "x");
    let gmail_id = gmail.id().clone();
    m.add(gmail).unwrap();
    m.add(account("Outlook", "a@b.com", "y")).unwrap();

    let before = fs::read(&path).unwrap();
    assert!(!m.remove(&EntryId::from("no-such-id")).unwrap());
    assert_eq!(m.count(), 2);
    assert_eq!(fs::read(&path).unwrap(), before);

    assert!(m.remove(&gmail_id).unwrap());
    assert_eq!(m.count(), 1);
    assert!(m.get(&gmail_id).is_none());

    let reloaded = open(&path, "pw", LoadPolicy::Strict).unwrap();
    assert_eq!(reloaded.count(), 1);
    assert_eq!(reloaded.get_all()[0].service_name, "Outlook");
}

#[test]
fn validation_failure_leaves_state_and_file_untouched() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let mut m = open(&path, "pw", LoadPolicy::Strict).unwrap();

    assert!(matches!(
        m.add(account("", "a@b.com", "x")),
        Err(VaultError::Validation(_))
    ));
    assert_eq!(m.count(), 0);
    assert!(!path.exists());

    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    let before = fs::read(&path).unwrap();
    assert!(matches!(
        m.add(account("Outlook", "", "x")),
        Err(VaultError::Validation(_))
    ));
    assert_eq!(m.count(), 1);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn listeners_fire_once_per_successful_change() {
    let td = tempdir().unwrap();
    let mut m = open(&td.path().join("vault.dat"), "pw", LoadPolicy::Strict).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    m.subscribe(move || {
        f.fetch_add(1, Ordering::SeqCst);
    });

    let e = account("Gmail", "a@b.com", "x");
    let id = e.id().clone();
    m.add(e).unwrap();
    let _ = m.add(account("", "x", "y"));
    m.remove(&EntryId::from("missing")).unwrap();
    m.remove(&id).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn wrong_passphrase_falls_back_to_empty_or_fails_strictly() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let mut m = open(&path, "correct horse", LoadPolicy::Strict).unwrap();
    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    let original = fs::read(&path).unwrap();

    let fallback = open(&path, "battery staple", LoadPolicy::FallbackToEmpty).unwrap();
    assert_eq!(fallback.outcome(), LoadOutcome::Unreadable);
    assert_eq!(fallback.count(), 0);
    // Loading never rewrites the file.
    assert_eq!(fs::read(&path).unwrap(), original);

    assert!(matches!(
        open(&path, "battery staple", LoadPolicy::Strict),
        Err(VaultError::DecryptionFailed)
    ));
}

#[test]
fn saving_over_an_unreadable_vault_keeps_it_as_a_backup() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let mut m = open(&path, "first", LoadPolicy::Strict).unwrap();
    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    let original = fs::read(&path).unwrap();

    let mut fresh = open(&path, "second", LoadPolicy::FallbackToEmpty).unwrap();
    fresh.add(account("Outlook", "me", "y")).unwrap();

    let backup = td.path().join("vault.dat.1");
    assert_eq!(fs::read(&backup).unwrap(), original);
    let recovered = open(&backup, "first", LoadPolicy::Strict).unwrap();
    assert_eq!(recovered.get_all()[0].service_name, "Gmail");
}

#[test]
fn open_uses_default_storage() {
    let td = tempdir().unwrap();
    let path = td.path().join("nested").join("vault.dat");
    let mut m = VaultManager::open(&path, SecretString::from("pw".to_string())).unwrap();
    assert_eq!(m.outcome(), LoadOutcome::NewVault);
    m.add(account("Gmail", "a@b.com", "x")).unwrap();
    let reopened = VaultManager::open(&path, SecretString::from("pw".to_string())).unwrap();
    assert_eq!(reopened.count(), 1);
}

#[test]
fn whitespace_around_a_query_is_matched_literally() {
    let td = tempdir().unwrap();
    let mut m = open(&td.path().join("vault.dat"), "pw", LoadPolicy::Strict).unwrap();
    m.add(account("Google", "a@b.com", "x")).unwrap();
    m.add(account("Google Drive", "a@b.com", "y")).unwrap();

    let hits: Vec<_> = m.search("Google ").iter().map(|e| e.service_name.clone()).collect();
    assert_eq!(hits, ["Google Drive"]);
    assert_eq!(m.search(" drive").len(), 1);
    assert!(m.search(" Google").is_empty());
}

#[test]
fn duplicate_ids_on_disk_keep_the_first_record() {
    let td = tempdir().unwrap();
    let path = td.path().join("vault.dat");
    let doc = r#"[
        {"id":"same","serviceName":"A","login":"a","password":"1","note":"","createdAt":"2025-01-01T00:00:00Z"},
        {"id":"other","serviceName":"O","login":"o","password":"2","note":"","createdAt":"2025-01-01T00:00:00Z"},
        {"id":"same","serviceName":"B","login":"b","password":"3","note":"","createdAt":"2025-01-01T00:00:00Z"}
    ]"#;
    let params = SealParams {
        iterations: 1_000,
        salt: None,
    };
    let blob = seal(doc.as_bytes(), "pw", VaultFormat::Sealed, params, &SystemRng).unwrap();
    fs::write(&path, blob).unwrap();

    let mut m = open(&path, "pw", LoadPolicy::Strict).unwrap();
    assert_eq!(m.outcome(), LoadOutcome::Opened { entries: 2 });
    let same = EntryId::from("same");
    assert_eq!(m.get(&same).unwrap().service_name, "A");

    assert!(m.remove(&same).unwrap());
    assert!(m.get(&same).is_none());
    assert_eq!(m.count(), 1);

    let reloaded = open(&path, "pw", LoadPolicy::Strict).unwrap();
    assert_eq!(reloaded.count(), 1);
    assert!(reloaded.get(&same).is_none());
}
