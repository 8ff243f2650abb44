use rand::Rng;

use super::IndexError;

/// Short-code alphabet. `0`, `o`, `1` and `l` are left out so codes survive
/// being read aloud or retyped.
pub const CODE_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

pub const DEFAULT_CODE_LENGTH: usize = 4;

/// Upper bound on draws before giving up on finding a free code.
const MAX_DRAWS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenerator {
    length: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// Draw codes until one is not `taken`.
    pub fn generate_unique<R, F>(&self, rng: &mut R, taken: F) -> Result<String, IndexError>
    where
        R: Rng + ?Sized,
        F: Fn(&str) -> bool,
    {
        for _ in 0..MAX_DRAWS {
            let code = self.generate(rng);
            if !taken(&code) {
                return Ok(code);
            }
        }
        Err(IndexError::CodeSpaceExhausted {
            length: self.length,
        })
    }

    pub fn is_valid(&self, code: &str) -> bool {
        code.len() == self.length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
    }
}
