//! The bounded one-time key pool
//!
//! One-time keys are offered to peers so they can start sessions with
//! us. The pool is an explicit bounded FIFO: ids are assigned
//! monotonically, and when a batch would push the pool past capacity the
//! oldest entries are evicted first. Eviction is observable (the evicted
//! keys simply stop resolving), never implicit reallocation.

use std::collections::VecDeque;

use cinder_crypto::{Curve25519Keypair, Curve25519PublicKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::randomness::seed;

/// Maximum number of one-time keys the pool retains.
pub const MAX_ONE_TIME_KEYS: usize = 100;

/// A single one-time key offered to peers.
#[derive(Debug, Clone)]
pub struct OneTimeKey {
    /// Monotonically assigned id, unique within the account.
    pub key_id: u32,
    /// Whether the key was already handed to the key server.
    pub published: bool,
    /// The key-agreement keypair.
    pub keypair: Curve25519Keypair,
}

/// The account's pool of one-time keys, FIFO by id.
#[derive(Debug, Clone, Default)]
pub(crate) struct OneTimeKeys {
    next_key_id: u32,
    keys: VecDeque<OneTimeKey>,
}

impl OneTimeKeys {
    /// Append `count` freshly generated keys, evicting the oldest
    /// entries if the pool would exceed capacity.
    ///
    /// `randomness` must hold at least `count * 32` bytes, validated by
    /// the caller.
    pub(crate) fn generate(&mut self, count: usize, randomness: &[u8]) {
        for i in 0..count {
            let keypair = Curve25519Keypair::from_random(seed(randomness, i));
            self.keys.push_back(OneTimeKey {
                key_id: self.next_key_id,
                published: false,
                keypair,
            });
            self.next_key_id = self.next_key_id.wrapping_add(1);
        }

        while self.keys.len() > MAX_ONE_TIME_KEYS {
            if let Some(evicted) = self.keys.pop_front() {
                debug!(key_id = evicted.key_id, "evicted one-time key from full pool");
            }
        }
    }

    /// Mark every unpublished key as published; returns the count
    /// flipped.
    pub(crate) fn mark_as_published(&mut self) -> usize {
        let mut marked = 0;
        for key in &mut self.keys {
            if !key.published {
                key.published = true;
                marked += 1;
            }
        }
        marked
    }

    /// Find a key by its public half.
    pub(crate) fn lookup(&self, public_key: &Curve25519PublicKey) -> Option<&OneTimeKey> {
        self.keys.iter().find(|key| key.keypair.public_key() == *public_key)
    }

    /// Remove a key by its public half, returning it if present.
    pub(crate) fn remove(&mut self, public_key: &Curve25519PublicKey) -> Option<OneTimeKey> {
        let position = self.keys.iter().position(|key| key.keypair.public_key() == *public_key)?;
        self.keys.remove(position)
    }

    /// The unpublished keys, in id order.
    pub(crate) fn unpublished(&self) -> Vec<(u32, Curve25519PublicKey)> {
        self.keys
            .iter()
            .filter(|key| !key.published)
            .map(|key| (key.key_id, key.keypair.public_key()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn to_pickle(&self) -> OneTimeKeysPickle {
        OneTimeKeysPickle {
            next_key_id: self.next_key_id,
            keys: self
                .keys
                .iter()
                .map(|key| OneTimeKeyPickle {
                    key_id: key.key_id,
                    published: key.published,
                    secret_key: key.keypair.secret_key().to_bytes(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_pickle(pickle: OneTimeKeysPickle) -> Self {
        Self {
            next_key_id: pickle.next_key_id,
            keys: pickle
                .keys
                .into_iter()
                .map(|key| OneTimeKey {
                    key_id: key.key_id,
                    published: key.published,
                    keypair: Curve25519Keypair::from_secret_bytes(key.secret_key),
                })
                .collect(),
        }
    }
}

/// Pickled form of one one-time key.
#[derive(Serialize, Deserialize)]
pub(crate) struct OneTimeKeyPickle {
    key_id: u32,
    published: bool,
    secret_key: [u8; 32],
}

/// Pickled form of the pool.
#[derive(Serialize, Deserialize)]
pub(crate) struct OneTimeKeysPickle {
    next_key_id: u32,
    keys: Vec<OneTimeKeyPickle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn randomness(count: usize) -> Vec<u8> {
        (0..count * 32).map(|i| i as u8).collect()
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let mut pool = OneTimeKeys::default();
        pool.generate(3, &randomness(3));

        let ids: Vec<u32> = pool.unpublished().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn eviction_is_fifo_by_id() {
        let mut pool = OneTimeKeys::default();
        pool.generate(MAX_ONE_TIME_KEYS, &randomness(MAX_ONE_TIME_KEYS));
        pool.generate(5, &randomness(5));

        assert_eq!(pool.len(), MAX_ONE_TIME_KEYS);
        let ids: Vec<u32> = pool.unpublished().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids[0], 5, "the five oldest keys must be gone");
        assert_eq!(*ids.last().unwrap(), MAX_ONE_TIME_KEYS as u32 + 4);
    }

    #[test]
    fn mark_as_published_counts_once() {
        let mut pool = OneTimeKeys::default();
        pool.generate(4, &randomness(4));

        assert_eq!(pool.mark_as_published(), 4);
        assert_eq!(pool.mark_as_published(), 0);
        assert!(pool.unpublished().is_empty());
    }

    #[test]
    fn removed_keys_stop_resolving() {
        let mut pool = OneTimeKeys::default();
        pool.generate(2, &randomness(2));

        let (_, public_key) = pool.unpublished()[0];
        assert!(pool.lookup(&public_key).is_some());

        let removed = pool.remove(&public_key).unwrap();
        assert_eq!(removed.keypair.public_key(), public_key);

        assert!(pool.lookup(&public_key).is_none());
        assert!(pool.remove(&public_key).is_none());
    }

    #[test]
    fn pickle_round_trip_preserves_pool() {
        let mut pool = OneTimeKeys::default();
        pool.generate(3, &randomness(3));
        pool.mark_as_published();
        pool.generate(1, &randomness(1));

        let restored = OneTimeKeys::from_pickle(pool.to_pickle());

        assert_eq!(restored.len(), pool.len());
        assert_eq!(restored.unpublished().len(), 1);
        assert_eq!(restored.next_key_id, pool.next_key_id);
    }
}
