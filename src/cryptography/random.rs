use ring::rand::{SecureRandom, SystemRandom};

use super::CryptoError;

/// Randomness provider; swapped for a deterministic one in tests.
pub trait Rng: Send + Sync {
    fn fill(&self, bytes: &mut [u8]) -> Result<(), CryptoError>;

    /// Uniform index in `[0, n)`.
    ///
    /// Draws are rejection-sampled on the `u32` space: values at or above the largest
    /// multiple of `n` are discarded, so no index is favoured by the modulo reduction.
    fn index_below(&self, n: usize) -> Result<usize, CryptoError> {
        if n == 0 || n > u32::MAX as usize {
            return Err(CryptoError::InvalidRange(n));
        }
        let n = n as u32;
        let zone = (u32::MAX / n) * n;
        loop {
            let mut b = [0u8; 4];
            self.fill(&mut b)?;
            let x = u32::from_le_bytes(b);
            if x < zone {
                return Ok((x % n) as usize);
            }
        }
    }
}

pub struct SystemRng;

impl Rng for SystemRng {
    fn fill(&self, bytes: &mut [u8]) -> Result<(), CryptoError> {
        SystemRandom::new()
            .fill(bytes)
            .map_err(|_| CryptoError::Randomness)
    }
}
