use anyhow::{anyhow, bail, Context, Result};
use inquire::{Confirm, Password};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::env;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::cli::cli::CharsetArgs;
use crate::config::app_config::Config;
use crate::cryptography::cipher::{
    detect_format, header_fingerprint, parse_header, VaultFormat, IV_LEN,
};
use crate::cryptography::generator::{
    estimate_bits, strength_label, CharsetGenerator, GeneratorConfig, PasswordGenerator,
};
use crate::cryptography::random::SystemRng;
use crate::filesystem::store::{EncryptedFileStorage, FileByteStore};
use crate::vault::codec::JsonCodec;
use crate::vault::manager::{LoadOutcome, VaultManager};
use crate::vault::models::{AccountEntry, EntryId};

pub struct AddOptions {
    pub service: String,
    pub login: String,
    pub note: String,
    pub generate: bool,
    pub length: Option<u16>,
    pub charset: CharsetArgs,
}

pub struct Vault<'a> {
    config: &'a Config,
}

impl<'a> Vault<'a> {
    pub fn create(config: &'a Config) -> Self {
        Vault { config }
    }

    fn generator_config(&self, charset: CharsetArgs) -> GeneratorConfig {
        let base = self.config.generator_config();
        GeneratorConfig {
            lowercase: base.lowercase && !charset.no_lower,
            uppercase: base.uppercase && !charset.no_upper,
            digits: base.digits && !charset.no_digits,
            special: base.special && !charset.no_special,
            avoid_ambiguous: base.avoid_ambiguous || charset.avoid_ambiguous,
        }
    }

    pub async fn handle_add(&self, opts: AddOptions) -> Result<()> {
        let secret = if opts.generate {
            let length = opts.length.unwrap_or(self.config.generator_length) as usize;
            let generator =
                CharsetGenerator::new(Arc::new(SystemRng), self.generator_config(opts.charset));
            SecretString::from(generator.generate(length)?)
        } else {
            let s = Password::new("Secret")
                .without_confirmation()
                .prompt()?;
            SecretString::from(s)
        };
        let entry = AccountEntry::new(opts.service, opts.login, secret, opts.note);
        let id = entry.id().clone();

        let config = self.config.clone();
        spawn_blocking(move || -> Result<()> {
            let mut manager = open_manager(&config)?;
            guard_unreadable(&manager, &config)?;
            manager.add(entry)?;
            Ok(())
        })
        .await
        .map_err(|_| anyhow!("task join error"))??;

        println!("Added {id}");
        Ok(())
    }

    pub async fn handle_list(&self, query: Option<String>, json: bool, reveal: bool) -> Result<()> {
        let config = self.config.clone();
        let entries = spawn_blocking(move || -> Result<Vec<AccountEntry>> {
            let manager = open_manager(&config)?;
            Ok(manager.search(query.as_deref().unwrap_or("")))
        })
        .await
        .map_err(|_| anyhow!("task join error"))??;

        if json {
            let arr: Vec<_> = entries
                .iter()
                .map(|e| {
                    let mut obj = json!({
                        "id": e.id().as_str(),
                        "serviceName": e.service_name,
                        "login": e.login,
                        "note": e.note,
                        "createdAt": e.created_at().to_rfc3339(),
                    });
                    if reveal {
                        obj["password"] = json!(e.secret.expose_secret());
                    }
                    obj
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&arr)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No entries.");
            return Ok(());
        }
        for e in &entries {
            let secret = if reveal {
                e.secret.expose_secret().to_string()
            } else {
                AccountEntry::constant_mask()
            };
            println!(
                "{}  {:<20} {:<28} {:<12} {}",
                e.id(),
                e.service_name,
                e.login,
                secret,
                e.created_at().format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }

    pub async fn handle_rm(&self, id: &str, yes: bool) -> Result<()> {
        let config = self.config.clone();
        let id = EntryId::from(id);
        let removed = spawn_blocking(move || -> Result<Option<String>> {
            let mut manager = open_manager(&config)?;
            let Some(entry) = manager.get(&id) else {
                return Ok(None);
            };
            if !yes {
                let confirmed = Confirm::new(&format!("Remove {} ({})?", entry.service_name, entry.login))
                    .with_default(false)
                    .prompt()?;
                if !confirmed {
                    bail!("aborted");
                }
            }
            manager.remove(&id)?;
            Ok(Some(entry.service_name))
        })
        .await
        .map_err(|_| anyhow!("task join error"))??;

        match removed {
            Some(service) => {
                println!("Removed {service}");
                Ok(())
            }
            None => bail!("no entry with that id"),
        }
    }

    pub async fn handle_count(&self) -> Result<()> {
        let config = self.config.clone();
        let n = spawn_blocking(move || -> Result<usize> { Ok(open_manager(&config)?.count()) })
            .await
            .map_err(|_| anyhow!("task join error"))??;
        println!("{n}");
        Ok(())
    }

    pub async fn handle_generate(&self, length: Option<u16>, charset: CharsetArgs) -> Result<()> {
        let length = length.unwrap_or(self.config.generator_length) as usize;
        let gen_config = self.generator_config(charset);
        let generator = CharsetGenerator::new(Arc::new(SystemRng), gen_config);
        let password = generator.generate(length)?;
        let bits = estimate_bits(generator.config(), length);
        println!("{password}");
        eprintln!("strength: {} (~{bits:.0} bits)", strength_label(bits));
        Ok(())
    }

    pub async fn handle_info(&self) -> Result<()> {
        let path = self.config.vault_path.clone();
        let read_path = path.clone();
        let bytes = spawn_blocking(move || std::fs::read(&read_path))
            .await
            .map_err(|_| anyhow!("task join error"))?
            .with_context(|| format!("failed to read {}", path.display()))?;

        println!("vault: {}", path.display());
        println!("  size: {} bytes", bytes.len());
        match detect_format(&bytes) {
            VaultFormat::Sealed => {
                let (hdr, _) = parse_header(&bytes).map_err(|e| anyhow!("invalid header: {e}"))?;
                println!("  layout: {}", VaultFormat::Sealed);
                println!("  version: {}", hdr.version);
                println!("  kdf: PBKDF2-HMAC-SHA256 ({} iterations)", hdr.iterations);
                println!("  aead: AES-256-GCM");
                println!("  salt: {}", hex::encode(hdr.salt));
                println!("  fingerprint: {}", header_fingerprint(&hdr));
            }
            VaultFormat::LegacyCbc => {
                println!("  layout: {} (no integrity check, shared salt)", VaultFormat::LegacyCbc);
                if bytes.len() >= IV_LEN {
                    println!("  iv: {}", hex::encode(&bytes[..IV_LEN]));
                }
            }
        }
        Ok(())
    }
}

/// Master passphrase from LOCKBOX_PASSWORD or an interactive prompt.
fn resolve_passphrase() -> Result<SecretString> {
    let pw = match env::var("LOCKBOX_PASSWORD") {
        Ok(pw) => pw,
        Err(_) => Password::new("Master passphrase")
            .without_confirmation()
            .prompt()?,
    };
    if pw.trim().is_empty() {
        bail!("master passphrase must not be empty");
    }
    Ok(SecretString::from(pw))
}

fn open_manager(config: &Config) -> Result<VaultManager> {
    let passphrase = resolve_passphrase()?;
    let store = Arc::new(FileByteStore::new_with_backups(
        config.vault_path.clone(),
        config.backups,
    ));
    let storage = EncryptedFileStorage::new(store, Arc::new(JsonCodec), passphrase)
        .with_format(config.format)
        .with_iterations(config.kdf_iterations);
    let mut manager = VaultManager::load(Box::new(storage), config.load_policy())
        .with_context(|| format!("failed to open vault {}", config.vault_path.display()))?;

    match manager.outcome() {
        LoadOutcome::Unreadable => eprintln!(
            "⚠️  Could not decrypt {} (wrong passphrase or corrupt file); showing an empty vault.",
            config.vault_path.display()
        ),
        LoadOutcome::NewVault => debug!(path = %config.vault_path.display(), "no vault yet"),
        LoadOutcome::Opened { entries } => debug!(entries, "vault opened"),
    }
    manager.subscribe(|| debug!("vault change persisted"));
    Ok(manager)
}

// With no backups a save would destroy the undecryptable file outright.
fn guard_unreadable(manager: &VaultManager, config: &Config) -> Result<()> {
    if manager.outcome() == LoadOutcome::Unreadable && config.backups == 0 {
        bail!(
            "refusing to overwrite {} without a backup; enable backups or move the file away",
            config.vault_path.display()
        );
    }
    Ok(())
}
