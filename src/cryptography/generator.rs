use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use super::random::Rng;
use super::CryptoError;

pub const MIN_LENGTH: usize = 4;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{}|;:,.<>?";
const AMBIGUOUS: &[u8] = b"O0Il|1"; // Avoid common ambiguities

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("password length {0} is below the minimum of 4")]
    InvalidLength(usize),
    #[error("no character category selected")]
    NoCategorySelected,
    #[error(transparent)]
    Random(#[from] CryptoError),
}

/// Which character categories a generated password draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub lowercase: bool,
    pub uppercase: bool,
    pub digits: bool,
    pub special: bool,
    pub avoid_ambiguous: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            uppercase: true,
            digits: true,
            special: true,
            avoid_ambiguous: false,
        }
    }
}

impl GeneratorConfig {
    /// Alphabets of the enabled categories, in lowercase/uppercase/digits/special order.
    pub fn alphabets(&self) -> Vec<Vec<u8>> {
        let mut classes: Vec<Vec<u8>> = Vec::new();
        if self.lowercase {
            classes.push(LOWER.to_vec());
        }
        if self.uppercase {
            classes.push(UPPER.to_vec());
        }
        if self.digits {
            classes.push(DIGITS.to_vec());
        }
        if self.special {
            classes.push(SPECIAL.to_vec());
        }
        if self.avoid_ambiguous {
            for cls in &mut classes {
                cls.retain(|c| !AMBIGUOUS.contains(c));
            }
        }
        classes
    }
}

pub trait PasswordGenerator: Send + Sync {
    fn generate(&self, length: usize) -> Result<String, GeneratorError>;
}

pub struct CharsetGenerator {
    rng: Arc<dyn Rng>,
    config: GeneratorConfig,
}

impl CharsetGenerator {
    pub fn new(rng: Arc<dyn Rng>, config: GeneratorConfig) -> Self {
        Self { rng, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl PasswordGenerator for CharsetGenerator {
    fn generate(&self, length: usize) -> Result<String, GeneratorError> {
        generate_chars(&*self.rng, &self.config, length)
    }
}

fn generate_chars(
    rng: &dyn Rng,
    config: &GeneratorConfig,
    length: usize,
) -> Result<String, GeneratorError> {
    if length < MIN_LENGTH {
        return Err(GeneratorError::InvalidLength(length));
    }
    let classes = config.alphabets();
    if classes.is_empty() {
        return Err(GeneratorError::NoCategorySelected);
    }

    // One mandatory character per enabled category.
    let mut mandatory: Vec<u8> = Vec::with_capacity(classes.len());
    for cls in &classes {
        mandatory.push(cls[rng.index_below(cls.len())?]);
    }

    // Each lands on a uniformly chosen free position; taken positions are redrawn.
    let mut out = vec![0u8; length];
    let mut used: HashSet<usize> = HashSet::with_capacity(mandatory.len());
    for c in mandatory {
        let pos = loop {
            let pos = rng.index_below(length)?;
            if used.insert(pos) {
                break pos;
            }
        };
        out[pos] = c;
    }

    let pool: Vec<u8> = classes.concat();
    for (i, slot) in out.iter_mut().enumerate() {
        if !used.contains(&i) {
            *slot = pool[rng.index_below(pool.len())?];
        }
    }

    // Every alphabet is ASCII.
    Ok(out.into_iter().map(char::from).collect())
}

// ===== Basic strength estimator (UI hint) =====

pub fn estimate_bits(config: &GeneratorConfig, length: usize) -> f64 {
    let pool: usize = config.alphabets().iter().map(Vec::len).sum();
    if pool == 0 {
        return 0.0;
    }
    (pool as f64).log2() * (length as f64)
}

pub fn strength_label(bits: f64) -> &'static str {
    if bits < 28.0 {
        "very weak"
    } else if bits < 36.0 {
        "weak"
    } else if bits < 60.0 {
        "fair"
    } else if bits < 128.0 {
        "strong"
    } else {
        "excellent"
    }
}
