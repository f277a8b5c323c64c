//! Equation cache key computation.

use sha2::{Digest, Sha256};

/// Parameters that determine the rendered markup of one equation.
///
/// The inline flag is part of the key: the same expression renders
/// differently in running text and as a display block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquationKey<'a> {
    /// TeX source of the expression.
    pub source: &'a str,
    /// Whether the expression sits in running text.
    pub inline: bool,
}

impl EquationKey<'_> {
    /// Mode label used in the hash input.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        if self.inline { "inline" } else { "display" }
    }

    /// Compute a content hash for this key.
    ///
    /// # Hash Format
    ///
    /// SHA-256 of `"{mode}:{source}"`, hex-encoded.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!("{}:{}", self.mode(), self.source);
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}
