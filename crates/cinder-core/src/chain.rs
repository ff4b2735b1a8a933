//! Symmetric hash chain for forward-secure key derivation
//!
//! Both ratchets in this crate (the double ratchet's per-direction
//! chains and the group session's one-way ratchet) drive the same
//! primitive: an HMAC-SHA256 chain whose state advances one-way and
//! whose per-index message keys are derived with a distinct label.
//!
//! # Security Properties
//!
//! - Forward Secrecy: advancing overwrites the previous chain key
//! - Key Uniqueness: each index yields a distinct message key
//! - Determinism: the same seed always produces the same key sequence

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// A chain reached its final index and cannot advance.
///
/// Indices are 32-bit; wrapping would restart the key sequence and
/// break the guarantee that an index never decreases, so the chain
/// refuses instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("key chain exhausted at index {index}")]
pub struct ChainIndexOverflow {
    /// The final index the chain is stuck at.
    pub index: u32,
}

/// Label for deriving a message key from the current chain key.
const MESSAGE_KEY_SEED: &[u8] = &[0x01];

/// Label for deriving the next chain key.
const CHAIN_ADVANCEMENT_SEED: &[u8] = &[0x02];

/// Length of a chain or message key in bytes.
pub const CHAIN_KEY_LENGTH: usize = 32;

/// HMAC-SHA256 keyed by `key` over `label`, truncated to 32 bytes.
fn hmac_label(key: &[u8; CHAIN_KEY_LENGTH], label: &[u8]) -> [u8; CHAIN_KEY_LENGTH] {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(label);
    let result = mac.finalize().into_bytes();

    let mut out = [0u8; CHAIN_KEY_LENGTH];
    out.copy_from_slice(&result);
    out
}

/// A one-time key derived from a chain at a specific index.
///
/// Keys exactly one encryption or decryption, then is discarded.
#[derive(Clone)]
pub struct MessageKey {
    key: [u8; CHAIN_KEY_LENGTH],
    index: u32,
}

impl MessageKey {
    pub(crate) fn from_parts(key: [u8; CHAIN_KEY_LENGTH], index: u32) -> Self {
        Self { key, index }
    }

    /// The 32-byte symmetric key handed to the cipher suite.
    pub fn key(&self) -> &[u8; CHAIN_KEY_LENGTH] {
        &self.key
    }

    /// The chain index this key was derived at.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageKey(index: {})", self.index)
    }
}

/// A symmetric chain key with its position in the chain.
///
/// The index never decreases. Advancing derives the successor through a
/// one-way function and overwrites the current key.
#[derive(Clone)]
pub struct ChainKey {
    key: [u8; CHAIN_KEY_LENGTH],
    index: u32,
}

impl ChainKey {
    /// Start a chain at index 0 from a 32-byte seed.
    pub fn new(seed: [u8; CHAIN_KEY_LENGTH]) -> Self {
        Self { key: seed, index: 0 }
    }

    /// Restore a chain from pickled state.
    pub(crate) fn from_parts(key: [u8; CHAIN_KEY_LENGTH], index: u32) -> Self {
        Self { key, index }
    }

    /// The current chain index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn key_bytes(&self) -> &[u8; CHAIN_KEY_LENGTH] {
        &self.key
    }

    /// Derive the message key for the current index.
    ///
    /// Does not advance the chain; callers advance exactly once after
    /// deriving, so every index keys at most one message.
    pub fn message_key(&self) -> MessageKey {
        MessageKey { key: hmac_label(&self.key, MESSAGE_KEY_SEED), index: self.index }
    }

    /// Advance the chain one step, overwriting the current key.
    ///
    /// # Errors
    ///
    /// [`ChainIndexOverflow`] when the chain is at [`u32::MAX`]; the
    /// state is left untouched.
    pub fn advance(&mut self) -> Result<(), ChainIndexOverflow> {
        if self.index == u32::MAX {
            return Err(ChainIndexOverflow { index: self.index });
        }

        let next = hmac_label(&self.key, CHAIN_ADVANCEMENT_SEED);
        self.key.zeroize();
        self.key = next;
        self.index += 1;
        Ok(())
    }
}

impl Drop for ChainKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainKey(index: {})", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seed() -> [u8; 32] {
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = i as u8;
        }
        seed
    }

    #[test]
    fn new_chain_starts_at_index_zero() {
        let chain = ChainKey::new(test_seed());
        assert_eq!(chain.index(), 0);
        assert_eq!(chain.message_key().index(), 0);
    }

    #[test]
    fn advance_increments_index() {
        let mut chain = ChainKey::new(test_seed());
        chain.advance().unwrap();
        assert_eq!(chain.index(), 1);
        chain.advance().unwrap();
        assert_eq!(chain.index(), 2);
    }

    #[test]
    fn each_index_produces_a_unique_key() {
        let mut chain = ChainKey::new(test_seed());

        let key0 = chain.message_key();
        chain.advance().unwrap();
        let key1 = chain.message_key();
        chain.advance().unwrap();
        let key2 = chain.message_key();

        assert_ne!(key0.key(), key1.key(), "keys must be unique");
        assert_ne!(key1.key(), key2.key(), "keys must be unique");
        assert_ne!(key0.key(), key2.key(), "keys must be unique");
    }

    #[test]
    fn message_key_differs_from_chain_key() {
        let chain = ChainKey::new(test_seed());
        assert_ne!(chain.message_key().key(), chain.key_bytes());
    }

    #[test]
    fn chain_is_deterministic() {
        let mut a = ChainKey::new(test_seed());
        let mut b = ChainKey::new(test_seed());

        for _ in 0..10 {
            assert_eq!(a.message_key().key(), b.message_key().key());
            a.advance().unwrap();
            b.advance().unwrap();
        }
    }

    #[test]
    fn advance_refuses_to_pass_the_final_index() {
        let mut chain = ChainKey::from_parts(test_seed(), u32::MAX);
        let key_before = *chain.key_bytes();

        assert_eq!(chain.advance(), Err(ChainIndexOverflow { index: u32::MAX }));

        // The chain is left exactly where it was
        assert_eq!(chain.index(), u32::MAX);
        assert_eq!(chain.key_bytes(), &key_before);
    }

    #[test]
    fn message_key_does_not_advance_the_chain() {
        let chain = ChainKey::new(test_seed());
        let first = chain.message_key();
        let second = chain.message_key();
        assert_eq!(first.key(), second.key());
        assert_eq!(chain.index(), 0);
    }
}
