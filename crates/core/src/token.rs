//! Lifetime tokens.
//!
//! A token identifies one logical item's presence in one stream. Tokens are
//! opaque: they carry no ordering and no meaning across stream boundaries.
//! Two streams may assign different tokens to what a caller considers "the
//! same item"; operators that bridge streams mint fresh tokens for their
//! output.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// An opaque lifetime identity.
///
/// Minted from a process-wide counter, so tokens minted by independent
/// streams are always distinct.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// Mints a fresh token, distinct from every previously minted one.
    #[inline]
    pub fn mint() -> Self {
        Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity, for diagnostics only.
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_distinct() {
        let a = Token::mint();
        let b = Token::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_copy_preserves_identity() {
        let a = Token::mint();
        let b = a;
        assert_eq!(a, b);
        assert_eq!(a.raw(), b.raw());
    }
}
