//! The account: long-lived identity and the key material offered to
//! peers
//!
//! An [`Account`] owns one Ed25519 signing keypair and one Curve25519
//! key-agreement keypair (together its immutable identity), a bounded
//! FIFO pool of one-time keys, and up to two fallback keys. It is the
//! factory for every session type: pairwise sessions bootstrap from its
//! identity and one-time keys, and group sessions bind their initial
//! ratchet state to its private identity key.
//!
//! All entropy is caller-supplied; the required lengths are published as
//! constants and functions on [`Account`].

mod fallback;
mod one_time_keys;

pub use one_time_keys::{MAX_ONE_TIME_KEYS, OneTimeKey};

use cinder_crypto::{
    CipherSuite, Curve25519Keypair, Curve25519PublicKey, Curve25519SecretKey, Ed25519Keypair,
    Ed25519PublicKey, Ed25519Signature, PICKLE_KEY_LENGTH,
};
use cinder_proto::PreKeyMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{CreationError, PickleError, SessionCreationError},
    group::GroupSession,
    randomness::{SEED_LENGTH, seed},
    session::Session,
};
use fallback::{FallbackKeys, FallbackKeysPickle};
use one_time_keys::{OneTimeKeys, OneTimeKeysPickle};

/// The public halves of an account's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityKeys {
    /// The Ed25519 signing key, the account's stable fingerprint.
    pub ed25519: Ed25519PublicKey,
    /// The Curve25519 key-agreement key used in handshakes.
    pub curve25519: Curve25519PublicKey,
}

/// A single protocol participant.
pub struct Account {
    signing_keypair: Ed25519Keypair,
    diffie_hellman_keypair: Curve25519Keypair,
    one_time_keys: OneTimeKeys,
    fallback_keys: FallbackKeys,
}

impl Account {
    /// Random bytes required by [`Account::create`]: one seed per
    /// identity keypair.
    pub const CREATION_RANDOM_LENGTH: usize = 2 * SEED_LENGTH;

    /// Random bytes required by [`Account::generate_fallback_key`].
    pub const FALLBACK_KEY_RANDOM_LENGTH: usize = SEED_LENGTH;

    /// Random bytes required by [`Account::create_outbound_session`]:
    /// one seed for the base key, one for the first ratchet key.
    pub const OUTBOUND_SESSION_RANDOM_LENGTH: usize = 2 * SEED_LENGTH;

    /// Random bytes required by [`Account::create_group_session`]: one
    /// seed of ratchet entropy, one for the signing keypair.
    pub const GROUP_SESSION_RANDOM_LENGTH: usize = 2 * SEED_LENGTH;

    /// Random bytes required to generate `count` one-time keys.
    pub fn one_time_keys_random_length(count: usize) -> usize {
        count * SEED_LENGTH
    }

    /// Create a fresh account from caller-supplied randomness.
    ///
    /// # Errors
    ///
    /// [`CreationError::InsufficientRandomness`] when fewer than
    /// [`Self::CREATION_RANDOM_LENGTH`] bytes are supplied.
    pub fn create(randomness: &[u8]) -> Result<Self, CreationError> {
        if randomness.len() < Self::CREATION_RANDOM_LENGTH {
            return Err(CreationError::InsufficientRandomness {
                required: Self::CREATION_RANDOM_LENGTH,
                provided: randomness.len(),
            });
        }

        let account = Self {
            signing_keypair: Ed25519Keypair::from_random(seed(randomness, 0)),
            diffie_hellman_keypair: Curve25519Keypair::from_random(seed(randomness, 1)),
            one_time_keys: OneTimeKeys::default(),
            fallback_keys: FallbackKeys::default(),
        };

        debug!(identity = %account.identity_keys().curve25519, "created account");
        Ok(account)
    }

    /// The public halves of the identity keys.
    pub fn identity_keys(&self) -> IdentityKeys {
        IdentityKeys {
            ed25519: self.signing_keypair.public_key(),
            curve25519: self.diffie_hellman_keypair.public_key(),
        }
    }

    /// Sign a message under the identity signing key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.signing_keypair.sign(message)
    }

    /// The capacity of the one-time key pool.
    pub fn max_number_of_one_time_keys(&self) -> usize {
        MAX_ONE_TIME_KEYS
    }

    /// Generate `count` one-time keys with sequential ids, evicting the
    /// oldest entries if the pool would exceed capacity.
    ///
    /// # Errors
    ///
    /// [`CreationError::InsufficientRandomness`] when fewer than
    /// [`Self::one_time_keys_random_length`]`(count)` bytes are
    /// supplied. Nothing is generated in that case.
    pub fn generate_one_time_keys(
        &mut self,
        count: usize,
        randomness: &[u8],
    ) -> Result<(), CreationError> {
        let required = Self::one_time_keys_random_length(count);
        if randomness.len() < required {
            return Err(CreationError::InsufficientRandomness {
                required,
                provided: randomness.len(),
            });
        }

        self.one_time_keys.generate(count, randomness);
        Ok(())
    }

    /// The unpublished one-time keys, as (id, public key) pairs in id
    /// order.
    pub fn one_time_keys(&self) -> Vec<(u32, Curve25519PublicKey)> {
        self.one_time_keys.unpublished()
    }

    /// Rotate the fallback key: the current key becomes the previous
    /// one, and a fresh key is installed.
    ///
    /// # Errors
    ///
    /// [`CreationError::InsufficientRandomness`] when fewer than
    /// [`Self::FALLBACK_KEY_RANDOM_LENGTH`] bytes are supplied.
    pub fn generate_fallback_key(&mut self, randomness: &[u8]) -> Result<(), CreationError> {
        if randomness.len() < Self::FALLBACK_KEY_RANDOM_LENGTH {
            return Err(CreationError::InsufficientRandomness {
                required: Self::FALLBACK_KEY_RANDOM_LENGTH,
                provided: randomness.len(),
            });
        }

        self.fallback_keys.generate(seed(randomness, 0));
        Ok(())
    }

    /// The current fallback key's public half, if one exists and has
    /// not been published yet.
    pub fn fallback_key(&self) -> Option<Curve25519PublicKey> {
        self.fallback_keys.unpublished_public_key()
    }

    /// Discard the previous fallback key once in-flight handshakes have
    /// drained. Returns whether one was held.
    pub fn forget_fallback_key(&mut self) -> bool {
        self.fallback_keys.forget_previous()
    }

    /// Mark all unpublished one-time keys and the current fallback key
    /// as published. Returns the number of keys marked.
    pub fn mark_keys_as_published(&mut self) -> usize {
        self.one_time_keys.mark_as_published() + self.fallback_keys.mark_as_published()
    }

    /// Find a one-time key by its public half.
    ///
    /// `None` is a normal outcome: the key was already used, evicted, or
    /// never issued.
    pub fn lookup_key(&self, public_key: &Curve25519PublicKey) -> Option<&OneTimeKey> {
        self.one_time_keys.lookup(public_key)
    }

    /// Remove a one-time key once a peer is known to have consumed it.
    ///
    /// `None` is a normal outcome, as with [`Self::lookup_key`].
    pub fn remove_key(&mut self, public_key: &Curve25519PublicKey) -> Option<OneTimeKey> {
        self.one_time_keys.remove(public_key)
    }

    /// Start an outbound session to a peer, from their published
    /// identity key and a one-time key of theirs we chose.
    ///
    /// # Errors
    ///
    /// [`SessionCreationError::InsufficientRandomness`] when fewer than
    /// [`Self::OUTBOUND_SESSION_RANDOM_LENGTH`] bytes are supplied.
    pub fn create_outbound_session<C: CipherSuite>(
        &self,
        their_identity_key: Curve25519PublicKey,
        their_one_time_key: Curve25519PublicKey,
        randomness: &[u8],
    ) -> Result<Session<C>, SessionCreationError> {
        Session::new_outbound(self, their_identity_key, their_one_time_key, randomness)
    }

    /// Establish the inbound side of a session from a received pre-key
    /// message.
    ///
    /// The referenced one-time key is *not* removed from the pool;
    /// call [`Self::remove_key`] once the session is confirmed, so a
    /// retrying peer can still be answered.
    ///
    /// # Errors
    ///
    /// - [`SessionCreationError::MismatchedIdentityKey`] when the
    ///   payload's identity key differs from `their_identity_key`
    /// - [`SessionCreationError::UnknownOneTimeKey`] when the referenced
    ///   key is not in the pool or the fallback slots
    pub fn create_inbound_session<C: CipherSuite>(
        &self,
        their_identity_key: Curve25519PublicKey,
        message: &PreKeyMessage,
    ) -> Result<Session<C>, SessionCreationError> {
        if message.identity_key != their_identity_key {
            return Err(SessionCreationError::MismatchedIdentityKey);
        }

        let one_time_secret = self
            .one_time_keys
            .lookup(&message.one_time_key)
            .map(|key| key.keypair.secret_key())
            .or_else(|| self.fallback_keys.secret_for(&message.one_time_key))
            .ok_or(SessionCreationError::UnknownOneTimeKey(message.one_time_key))?;

        Ok(Session::new_inbound(self, one_time_secret, message))
    }

    /// Establish the inbound side of a session from pre-key wire bytes,
    /// decoding before delegating to
    /// [`Self::create_inbound_session`].
    ///
    /// # Errors
    ///
    /// [`SessionCreationError::BadMessageFormat`] when the bytes do not
    /// decode as a pre-key message, plus everything
    /// [`Self::create_inbound_session`] reports.
    pub fn create_inbound_session_from_bytes<C: CipherSuite>(
        &self,
        their_identity_key: Curve25519PublicKey,
        bytes: &[u8],
    ) -> Result<Session<C>, SessionCreationError> {
        let message = PreKeyMessage::decode(bytes)?;
        self.create_inbound_session(their_identity_key, &message)
    }

    /// Create an outbound group session whose initial ratchet state is
    /// bound to this account's private identity key.
    ///
    /// # Errors
    ///
    /// [`CreationError::InsufficientRandomness`] when fewer than
    /// [`Self::GROUP_SESSION_RANDOM_LENGTH`] bytes are supplied.
    pub fn create_group_session<C: CipherSuite>(
        &self,
        randomness: &[u8],
    ) -> Result<GroupSession<C>, CreationError> {
        GroupSession::new(self, randomness)
    }

    pub(crate) fn diffie_hellman_secret(&self) -> &Curve25519SecretKey {
        self.diffie_hellman_keypair.secret_key()
    }

    /// Encode the account into an encrypted pickle under `key`.
    pub fn pickle(&self, key: &[u8; PICKLE_KEY_LENGTH]) -> Vec<u8> {
        cinder_crypto::seal(key, &AccountPickle::from(self))
    }

    /// Restore an account from an encrypted pickle.
    pub fn from_pickle(
        pickle: &[u8],
        key: &[u8; PICKLE_KEY_LENGTH],
    ) -> Result<Self, PickleError> {
        let pickle: AccountPickle = cinder_crypto::open(key, pickle)?;
        Ok(Self::from(pickle))
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("identity", &self.identity_keys())
            .field("one_time_keys", &self.one_time_keys.len())
            .finish_non_exhaustive()
    }
}

/// Pickled form of an [`Account`].
#[derive(Serialize, Deserialize)]
pub(crate) struct AccountPickle {
    signing_key: [u8; 32],
    diffie_hellman_key: [u8; 32],
    one_time_keys: OneTimeKeysPickle,
    fallback_keys: FallbackKeysPickle,
}

impl From<&Account> for AccountPickle {
    fn from(account: &Account) -> Self {
        Self {
            signing_key: account.signing_keypair.to_secret_bytes(),
            diffie_hellman_key: account.diffie_hellman_keypair.secret_key().to_bytes(),
            one_time_keys: account.one_time_keys.to_pickle(),
            fallback_keys: account.fallback_keys.to_pickle(),
        }
    }
}

impl From<AccountPickle> for Account {
    fn from(pickle: AccountPickle) -> Self {
        Self {
            signing_keypair: Ed25519Keypair::from_secret_bytes(pickle.signing_key),
            diffie_hellman_keypair: Curve25519Keypair::from_secret_bytes(
                pickle.diffie_hellman_key,
            ),
            one_time_keys: OneTimeKeys::from_pickle(pickle.one_time_keys),
            fallback_keys: FallbackKeys::from_pickle(pickle.fallback_keys),
        }
    }
}
