//! Pairwise encrypted sessions
//!
//! A [`Session`] pairs the handshake key material with a double-ratchet
//! state machine. The outbound side is created against a peer's
//! published identity and one-time keys; the inbound side is created by
//! an [`Account`](crate::Account) from a received pre-key message.
//!
//! Until the initiator has decrypted a reply, every message it encrypts
//! is wrapped as a pre-key message repeating the handshake keys, so the
//! responder can establish (or re-establish) its side from any of them.

use std::marker::PhantomData;

use cinder_crypto::{
    CipherSuite, Curve25519Keypair, Curve25519PublicKey, Curve25519SecretKey, PICKLE_KEY_LENGTH,
    StandardCipher, pickle,
};
use cinder_proto::{PreKeyMessage, SessionMessage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    account::Account,
    double_ratchet::{DoubleRatchet, DoubleRatchetPickle},
    error::{DecryptionError, EncryptionError, PickleError, SessionCreationError},
    randomness::{SEED_LENGTH, seed},
};

pub(crate) mod key_exchange;

pub use key_exchange::{SessionId, SessionKeys};
use key_exchange::SharedSecret3Dh;

/// An established pairwise session.
///
/// Generic over the cipher suite so the framing and ratchet logic stay
/// independent of the AEAD; [`StandardCipher`] is the default.
pub struct Session<C: CipherSuite = StandardCipher> {
    session_keys: SessionKeys,
    session_id: SessionId,
    received_message: bool,
    ratchet: DoubleRatchet,
    cipher: PhantomData<C>,
}

impl<C: CipherSuite> Session<C> {
    /// Random bytes consumed by outbound session creation: one seed for
    /// the ephemeral base key, one for the first ratchet key.
    pub const CREATION_RANDOM_LENGTH: usize = 2 * SEED_LENGTH;

    pub(crate) fn new_outbound(
        account: &Account,
        their_identity_key: Curve25519PublicKey,
        their_one_time_key: Curve25519PublicKey,
        randomness: &[u8],
    ) -> Result<Self, SessionCreationError> {
        if randomness.len() < Self::CREATION_RANDOM_LENGTH {
            return Err(SessionCreationError::InsufficientRandomness {
                required: Self::CREATION_RANDOM_LENGTH,
                provided: randomness.len(),
            });
        }

        let base_key = Curve25519Keypair::from_random(seed(randomness, 0));
        let shared_secret = SharedSecret3Dh::new_outbound(
            account.diffie_hellman_secret(),
            &base_key,
            &their_identity_key,
            &their_one_time_key,
        );

        let session_keys = SessionKeys {
            identity_key: account.identity_keys().curve25519,
            base_key: base_key.public_key(),
            one_time_key: their_one_time_key,
        };
        let session_id = session_keys.session_id();
        let ratchet = DoubleRatchet::new_outbound(&shared_secret, seed(randomness, 1));

        debug!(%session_id, "created outbound session");
        Ok(Self { session_keys, session_id, received_message: false, ratchet, cipher: PhantomData })
    }

    pub(crate) fn new_inbound(
        account: &Account,
        one_time_secret: &Curve25519SecretKey,
        message: &PreKeyMessage,
    ) -> Self {
        let shared_secret = SharedSecret3Dh::new_inbound(
            account.diffie_hellman_secret(),
            one_time_secret,
            &message.identity_key,
            &message.base_key,
        );

        let session_keys = SessionKeys {
            identity_key: message.identity_key,
            base_key: message.base_key,
            one_time_key: message.one_time_key,
        };
        let session_id = session_keys.session_id();
        let ratchet = DoubleRatchet::new_inbound(&shared_secret, message.message.ratchet_key);

        debug!(%session_id, "created inbound session");
        Self { session_keys, session_id, received_message: true, ratchet, cipher: PhantomData }
    }

    /// The stable identifier both peers compute for this session.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The handshake key triple this session was established with.
    pub fn session_keys(&self) -> &SessionKeys {
        &self.session_keys
    }

    /// Whether a message from the peer has ever been decrypted.
    ///
    /// While false, encrypted messages are wrapped as pre-key messages
    /// carrying the handshake keys.
    pub fn has_received_message(&self) -> bool {
        self.received_message
    }

    /// Whether `message` would establish this exact session.
    ///
    /// Lets a responder deduplicate repeated pre-key messages without
    /// creating a second session. Performs no state mutation.
    pub fn matches_inbound_session(&self, message: &PreKeyMessage) -> bool {
        let keys = SessionKeys {
            identity_key: message.identity_key,
            base_key: message.base_key,
            one_time_key: message.one_time_key,
        };
        keys.session_id() == self.session_id
    }

    /// Encrypt a message to the peer.
    ///
    /// Randomness is consumed only when a DH ratchet step is due, which
    /// happens on the first encryption after decrypting a message under
    /// a new ratchet key; pass an empty slice otherwise if desired.
    ///
    /// # Errors
    ///
    /// [`EncryptionError::InsufficientRandomness`] when a ratchet step
    /// is due and fewer than [`crate::SEED_LENGTH`] bytes are supplied.
    /// No state is mutated on error.
    pub fn encrypt(
        &mut self,
        plaintext: &[u8],
        randomness: &[u8],
    ) -> Result<SessionMessage, EncryptionError> {
        let message = self.ratchet.encrypt::<C>(&self.session_id, plaintext, randomness)?;

        if self.received_message {
            Ok(SessionMessage::Normal(message))
        } else {
            Ok(SessionMessage::PreKey(PreKeyMessage {
                one_time_key: self.session_keys.one_time_key,
                base_key: self.session_keys.base_key,
                identity_key: self.session_keys.identity_key,
                message,
            }))
        }
    }

    /// Decrypt a message from the peer.
    ///
    /// State advances only after the ciphertext authenticates; any
    /// error leaves the session exactly as it was.
    ///
    /// # Errors
    ///
    /// See [`DecryptionError`]; [`DecryptionError::is_permanent`]
    /// distinguishes the failures worth retrying.
    pub fn decrypt(&mut self, message: &SessionMessage) -> Result<Vec<u8>, DecryptionError> {
        let inner = match message {
            SessionMessage::PreKey(prekey) => &prekey.message,
            SessionMessage::Normal(normal) => normal,
        };

        let plaintext = self.ratchet.decrypt::<C>(&self.session_id, inner)?;
        self.received_message = true;
        Ok(plaintext)
    }

    /// Encode the session into an encrypted pickle under `key`.
    pub fn pickle(&self, key: &[u8; PICKLE_KEY_LENGTH]) -> Vec<u8> {
        let pickle = SessionPickle {
            session_keys: self.session_keys,
            received_message: self.received_message,
            ratchet: self.ratchet.to_pickle(),
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
        let pickle: SessionPickle = pickle::open(key, bytes)?;

        Ok(Self {
            session_id: pickle.session_keys.session_id(),
            session_keys: pickle.session_keys,
            received_message: pickle.received_message,
            ratchet: DoubleRatchet::from_pickle(pickle.ratchet),
            cipher: PhantomData,
        })
    }
}

impl<C: CipherSuite> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("received_message", &self.received_message)
            .finish_non_exhaustive()
    }
}

/// Serialized form of a session, sealed by [`Session::pickle`].
#[derive(Serialize, Deserialize)]
struct SessionPickle {
    session_keys: SessionKeys,
    received_message: bool,
    ratchet: DoubleRatchetPickle,
}
