//! Fallback keys
//!
//! A fallback key is the last-resort key peers use once the one-time
//! key pool is exhausted. Unlike one-time keys it may be used by any
//! number of peers, so the account keeps the previous one alive across
//! a rotation until the application decides in-flight handshakes have
//! drained and forgets it.

use cinder_crypto::{Curve25519Keypair, Curve25519PublicKey, Curve25519SecretKey};
use serde::{Deserialize, Serialize};

/// A single fallback key.
#[derive(Debug, Clone)]
struct FallbackKey {
    published: bool,
    keypair: Curve25519Keypair,
}

/// The current and previous fallback keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct FallbackKeys {
    current: Option<FallbackKey>,
    previous: Option<FallbackKey>,
}

impl FallbackKeys {
    /// Rotate: demote `current` to `previous` (overwriting whatever it
    /// held) and install a fresh key.
    pub(crate) fn generate(&mut self, seed: [u8; 32]) {
        self.previous = self.current.take();
        self.current =
            Some(FallbackKey { published: false, keypair: Curve25519Keypair::from_random(seed) });
    }

    /// Discard the previous key. Returns whether one was held.
    pub(crate) fn forget_previous(&mut self) -> bool {
        self.previous.take().is_some()
    }

    /// The current key's public half, if it exists and is unpublished.
    pub(crate) fn unpublished_public_key(&self) -> Option<Curve25519PublicKey> {
        self.current
            .as_ref()
            .filter(|key| !key.published)
            .map(|key| key.keypair.public_key())
    }

    /// Mark the current key as published; returns the count flipped
    /// (0 or 1).
    pub(crate) fn mark_as_published(&mut self) -> usize {
        match self.current.as_mut() {
            Some(key) if !key.published => {
                key.published = true;
                1
            }
            _ => 0,
        }
    }

    /// Find the secret half matching a public key, checking the current
    /// slot before the previous one.
    pub(crate) fn secret_for(
        &self,
        public_key: &Curve25519PublicKey,
    ) -> Option<&Curve25519SecretKey> {
        [self.current.as_ref(), self.previous.as_ref()]
            .into_iter()
            .flatten()
            .find(|key| key.keypair.public_key() == *public_key)
            .map(|key| key.keypair.secret_key())
    }

    pub(crate) fn to_pickle(&self) -> FallbackKeysPickle {
        let pickle = |key: &FallbackKey| FallbackKeyPickle {
            published: key.published,
            secret_key: key.keypair.secret_key().to_bytes(),
        };
        FallbackKeysPickle {
            current: self.current.as_ref().map(pickle),
            previous: self.previous.as_ref().map(pickle),
        }
    }

    pub(crate) fn from_pickle(pickle: FallbackKeysPickle) -> Self {
        let unpickle = |key: FallbackKeyPickle| FallbackKey {
            published: key.published,
            keypair: Curve25519Keypair::from_secret_bytes(key.secret_key),
        };
        Self {
            current: pickle.current.map(unpickle),
            previous: pickle.previous.map(unpickle),
        }
    }
}

/// Pickled form of one fallback key.
#[derive(Serialize, Deserialize)]
pub(crate) struct FallbackKeyPickle {
    published: bool,
    secret_key: [u8; 32],
}

/// Pickled form of both fallback slots.
#[derive(Serialize, Deserialize)]
pub(crate) struct FallbackKeysPickle {
    current: Option<FallbackKeyPickle>,
    previous: Option<FallbackKeyPickle>,
}
