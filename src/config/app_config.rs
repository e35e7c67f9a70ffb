use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cryptography::cipher::VaultFormat;
use crate::cryptography::generator::GeneratorConfig;
use crate::cryptography::kdf::{DEFAULT_ITERATIONS, MAX_ITERATIONS};
use crate::filesystem::store::DEFAULT_BACKUPS;
use crate::vault::manager::LoadPolicy;

pub const DEFAULT_GENERATOR_LENGTH: u16 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`; every key is optional.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub vault_path: Option<String>,
    pub backups: Option<usize>,
    pub format: Option<VaultFormat>,
    pub kdf_iterations: Option<u32>,
    pub strict_load: Option<bool>,
    pub generator_length: Option<u16>,
    pub avoid_ambiguous: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub vault_path: PathBuf,
    pub backups: usize,
    pub format: VaultFormat,
    pub kdf_iterations: u32,
    pub strict_load: bool,
    pub generator_length: u16,
    pub avoid_ambiguous: bool,
}

impl Config {
    /// Resolve settings with precedence: explicit path > environment > config file > defaults.
    pub fn create(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let (_, file_cfg) = load_file_config_with_path()?;
        Self::resolve(path, file_cfg)
    }

    fn resolve(path: Option<PathBuf>, file_cfg: FileConfig) -> Result<Self, ConfigError> {
        let vault_path = path
            .or_else(|| env::var("LOCKBOX_VAULT_PATH").ok().map(PathBuf::from))
            .or_else(|| file_cfg.vault_path.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_vault_path);

        let backups = env_parsed::<usize>("LOCKBOX_BACKUPS")?
            .or(file_cfg.backups)
            .unwrap_or(DEFAULT_BACKUPS);

        let format = match env::var("LOCKBOX_FORMAT") {
            Ok(s) => s
                .parse::<VaultFormat>()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: "LOCKBOX_FORMAT",
                    reason,
                })?,
            Err(_) => file_cfg.format.unwrap_or_default(),
        };

        let kdf_iterations = env_parsed::<u32>("LOCKBOX_KDF_ITERATIONS")?
            .or(file_cfg.kdf_iterations)
            .unwrap_or(DEFAULT_ITERATIONS);
        if kdf_iterations == 0 || kdf_iterations > MAX_ITERATIONS {
            return Err(ConfigError::InvalidValue {
                key: "kdf_iterations",
                reason: format!("must be between 1 and {MAX_ITERATIONS}"),
            });
        }

        let strict_load = env_parsed::<bool>("LOCKBOX_STRICT_LOAD")?
            .or(file_cfg.strict_load)
            .unwrap_or(false);

        let generator_length = env_parsed::<u16>("LOCKBOX_GEN_LENGTH")?
            .or(file_cfg.generator_length)
            .unwrap_or(DEFAULT_GENERATOR_LENGTH);

        let avoid_ambiguous = env_parsed::<bool>("LOCKBOX_AVOID_AMBIGUOUS")?
            .or(file_cfg.avoid_ambiguous)
            .unwrap_or(false);

        Ok(Config {
            vault_path,
            backups,
            format,
            kdf_iterations,
            strict_load,
            generator_length,
            avoid_ambiguous,
        })
    }

    pub fn load_policy(&self) -> LoadPolicy {
        if self.strict_load {
            LoadPolicy::Strict
        } else {
            LoadPolicy::FallbackToEmpty
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            avoid_ambiguous: self.avoid_ambiguous,
            ..GeneratorConfig::default()
        }
    }
}

fn env_parsed<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

pub fn config_file_path() -> PathBuf {
    // LOCKBOX_CONFIG_DIR isolates tests and portable installs from the platform default.
    let cfg_dir = if let Ok(p) = env::var("LOCKBOX_CONFIG_DIR") {
        PathBuf::from(p)
    } else {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    };
    cfg_dir.join("lockbox").join("config.toml")
}

/// A missing file is an empty config; an unreadable or malformed one is an error.
pub fn load_file_config_with_path() -> Result<(PathBuf, FileConfig), ConfigError> {
    let path = config_file_path();
    let cfg = read_file_config(&path)?;
    Ok((path, cfg))
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str::<FileConfig>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_file_config(path: &Path, cfg: &FileConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = toml::to_string_pretty(cfg).map_err(std::io::Error::other)?;
    std::fs::write(path, s)
}

fn default_vault_path() -> PathBuf {
    // Prefer platform data_dir, allow override via LOCKBOX_DATA_DIR, fallback to ~/.lockbox/vault.dat
    if let Ok(base) = env::var("LOCKBOX_DATA_DIR") {
        return PathBuf::from(base).join("lockbox").join("vault.dat");
    }
    if let Some(mut p) = dirs::data_dir() {
        p.push("lockbox");
        p.push("vault.dat");
        return p;
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(&home).join(".lockbox").join("vault.dat")
}
