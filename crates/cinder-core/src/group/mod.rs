//! One-way group ratchet for encrypted fan-out
//!
//! A [`GroupSession`] encrypts one stream of messages to many
//! recipients: a single hash chain advances once per message, and every
//! frame is signed by a per-session Ed25519 key so authenticity
//! survives relaying through untrusted infrastructure.
//!
//! Recipients join by importing a signed [`SessionKey`] export taken at
//! the current counter. The chain is one-way, so an export grants
//! decryption from that counter onward and nothing before it.

use cinder_crypto::{
    CipherSuite, Ed25519Keypair, Ed25519Signature, PICKLE_KEY_LENGTH, StandardCipher, hkdf_sha256,
    pickle,
};
use cinder_proto::{GROUP_RATCHET_LENGTH, GroupMessage, SessionKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use tracing::debug;
use zeroize::Zeroize;

use crate::{
    account::Account,
    chain::ChainKey,
    error::{CreationError, EncryptionError, PickleError},
    randomness::{SEED_LENGTH, seed},
};

mod inbound;

pub use inbound::InboundGroupSession;

/// HKDF info label for deriving the group chain seed.
const GROUP_SEED_INFO: &[u8] = b"cinderGroupSeedV1";

/// Domain label for group session id hashing.
const GROUP_SESSION_ID_LABEL: &[u8] = b"cinderGroupSessionIdV1";

/// A stable identifier for one group session, derived from its public
/// signing key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupSessionId([u8; 32]);

impl GroupSessionId {
    pub(crate) fn from_signing_key(signing_key: &cinder_crypto::Ed25519PublicKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(GROUP_SESSION_ID_LABEL);
        hasher.update(signing_key.as_bytes());

        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        Self(id)
    }

    /// The raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for GroupSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for GroupSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupSessionId({self})")
    }
}

/// The sending side of a group session.
///
/// Encryption and export are deterministic; all randomness is consumed
/// at creation time.
pub struct GroupSession<C: CipherSuite = StandardCipher> {
    chain: ChainKey,
    signing_keypair: Ed25519Keypair,
    session_id: GroupSessionId,
    cipher: PhantomData<C>,
}

impl<C: CipherSuite> GroupSession<C> {
    /// Random bytes consumed by creation: one seed mixed into the chain,
    /// one for the signing keypair.
    pub const CREATION_RANDOM_LENGTH: usize = 2 * SEED_LENGTH;

    pub(crate) fn new(account: &Account, randomness: &[u8]) -> Result<Self, CreationError> {
        if randomness.len() < Self::CREATION_RANDOM_LENGTH {
            return Err(CreationError::InsufficientRandomness {
                required: Self::CREATION_RANDOM_LENGTH,
                provided: randomness.len(),
            });
        }

        // Bind the initial ratchet to the account's private identity key
        // alongside the caller's randomness
        let mut ikm = [0u8; 64];
        ikm[..32].copy_from_slice(&account.diffie_hellman_secret().to_bytes());
        ikm[32..].copy_from_slice(&seed(randomness, 0));

        let mut chain_seed = [0u8; GROUP_RATCHET_LENGTH];
        let Ok(()) = hkdf_sha256(None, &ikm, GROUP_SEED_INFO, &mut chain_seed) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };
        ikm.zeroize();

        let signing_keypair = Ed25519Keypair::from_random(seed(randomness, 1));
        let session_id = GroupSessionId::from_signing_key(&signing_keypair.public_key());

        debug!(%session_id, "created group session");
        Ok(Self { chain: ChainKey::new(chain_seed), signing_keypair, session_id, cipher: PhantomData })
    }

    /// The stable identifier recipients derive from imports and use to
    /// route messages.
    pub fn session_id(&self) -> GroupSessionId {
        self.session_id
    }

    /// The counter the next message will be encrypted at.
    pub fn message_index(&self) -> u32 {
        self.chain.index()
    }

    /// Encrypt one message and advance the chain.
    ///
    /// Deterministic: the chain supplies the key and the session's
    /// signing key authenticates the frame, so no randomness is needed.
    ///
    /// # Errors
    ///
    /// [`EncryptionError::KeyChainExhausted`] when the chain reached
    /// its final index; the session must be replaced.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<GroupMessage, EncryptionError> {
        let message_key = self.chain.message_key();

        let mut message = GroupMessage {
            counter: message_key.index(),
            ciphertext: Vec::new(),
            signature: Ed25519Signature::from_bytes([0; 64]),
        };
        let associated_data = message.associated_data(self.session_id.as_bytes());
        message.ciphertext = C::encrypt(message_key.key(), plaintext, &associated_data);
        message.signature = self.signing_keypair.sign(&message.to_signature_bytes());

        // Never hand out a frame whose index cannot be retired
        self.chain.advance()?;
        Ok(message)
    }

    /// Export the ratchet at the current counter as a signed
    /// [`SessionKey`].
    ///
    /// The export admits a recipient from this counter onward; messages
    /// encrypted earlier stay out of reach.
    pub fn session_key(&self) -> SessionKey {
        let mut export = SessionKey {
            counter: self.chain.index(),
            ratchet_key: *self.chain.key_bytes(),
            signing_key: self.signing_keypair.public_key(),
            signature: Ed25519Signature::from_bytes([0; 64]),
        };
        export.signature = self.signing_keypair.sign(&export.to_signature_bytes());
        export
    }

    /// Encode the session into an encrypted pickle under `key`.
    pub fn pickle(&self, key: &[u8; PICKLE_KEY_LENGTH]) -> Vec<u8> {
        let pickle = GroupSessionPickle {
            chain_key: *self.chain.key_bytes(),
            chain_index: self.chain.index(),
            signing_key: self.signing_keypair.to_secret_bytes(),
        };
        pickle::seal(key, &pickle)
    }

    /// Restore a session from an encrypted pickle.
    ///
    /// # Errors
    ///
    /// [`PickleError`] when the pickle is malformed, the version is
    /// unknown, or `key` is not the sealing key.
    pub fn from_pickle(bytes: &[u8], key: &[u8; PICKLE_KEY_LENGTH]) -> Result<Self, PickleError> {
        let pickle: GroupSessionPickle = pickle::open(key, bytes)?;

        let signing_keypair = Ed25519Keypair::from_secret_bytes(pickle.signing_key);
        let session_id = GroupSessionId::from_signing_key(&signing_keypair.public_key());

        Ok(Self {
            chain: ChainKey::from_parts(pickle.chain_key, pickle.chain_index),
            signing_keypair,
            session_id,
            cipher: PhantomData,
        })
    }
}

impl<C: CipherSuite> std::fmt::Debug for GroupSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSession")
            .field("session_id", &self.session_id)
            .field("message_index", &self.chain.index())
            .finish_non_exhaustive()
    }
}

/// Serialized form of a group session, sealed by
/// [`GroupSession::pickle`].
#[derive(Serialize, Deserialize)]
struct GroupSessionPickle {
    chain_key: [u8; GROUP_RATCHET_LENGTH],
    chain_index: u32,
    signing_key: [u8; 32],
}
