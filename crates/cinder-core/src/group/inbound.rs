//! The receiving side of a group session

use std::marker::PhantomData;

use cinder_crypto::{CipherSuite, Ed25519PublicKey, PICKLE_KEY_LENGTH, StandardCipher, pickle};
use cinder_proto::{GROUP_RATCHET_LENGTH, GroupMessage, SessionKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    chain::ChainKey,
    error::{DecryptionError, PickleError, SessionKeyImportError},
    group::GroupSessionId,
};

/// A group session imported from a signed [`SessionKey`] export.
///
/// Holds the exported chain immutably so messages may arrive in any
/// order at or after the export counter, plus a rolling copy at the
/// highest counter decrypted so far to keep sequential decryption
/// cheap. Replay detection is the caller's responsibility; decrypting
/// the same counter twice yields the same plaintext.
pub struct InboundGroupSession<C: CipherSuite = StandardCipher> {
    initial_chain: ChainKey,
    latest_chain: ChainKey,
    signing_key: Ed25519PublicKey,
    session_id: GroupSessionId,
    cipher: PhantomData<C>,
}

impl<C: CipherSuite> InboundGroupSession<C> {
    /// Import a session from a decoded export.
    ///
    /// # Errors
    ///
    /// [`SessionKeyImportError::BadSignature`] when the export's
    /// self-signature does not verify under its embedded signing key.
    pub fn new(session_key: &SessionKey) -> Result<Self, SessionKeyImportError> {
        if !session_key
            .signing_key
            .verify(&session_key.to_signature_bytes(), &session_key.signature)
        {
            return Err(SessionKeyImportError::BadSignature);
        }

        let chain = ChainKey::from_parts(session_key.ratchet_key, session_key.counter);
        let session_id = GroupSessionId::from_signing_key(&session_key.signing_key);

        debug!(%session_id, counter = session_key.counter, "imported group session");
        Ok(Self {
            initial_chain: chain.clone(),
            latest_chain: chain,
            signing_key: session_key.signing_key,
            session_id,
            cipher: PhantomData,
        })
    }

    /// Decode and import a session from export wire bytes.
    ///
    /// # Errors
    ///
    /// [`SessionKeyImportError::BadMessageFormat`] when the bytes do not
    /// decode, [`SessionKeyImportError::BadSignature`] when the
    /// signature does not verify.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionKeyImportError> {
        let session_key = SessionKey::decode(bytes)?;
        Self::new(&session_key)
    }

    /// The identifier shared with the sending side.
    pub fn session_id(&self) -> GroupSessionId {
        self.session_id
    }

    /// The lowest counter this session can decrypt.
    pub fn first_known_index(&self) -> u32 {
        self.initial_chain.index()
    }

    /// Decrypt one group message.
    ///
    /// The signature is checked before any chain work; state advances
    /// only after the ciphertext authenticates.
    ///
    /// # Errors
    ///
    /// - [`DecryptionError::BadSignature`] when the frame signature does
    ///   not verify under this session's signing key
    /// - [`DecryptionError::UnknownMessageIndex`] when the counter
    ///   precedes the imported ratchet state
    /// - [`DecryptionError::BadMessageMac`] when the ciphertext fails
    ///   authentication
    pub fn decrypt(&mut self, message: &GroupMessage) -> Result<Vec<u8>, DecryptionError> {
        if !self.signing_key.verify(&message.to_signature_bytes(), &message.signature) {
            return Err(DecryptionError::BadSignature);
        }

        if message.counter < self.initial_chain.index() {
            return Err(DecryptionError::UnknownMessageIndex { index: message.counter });
        }

        let mut chain = if self.latest_chain.index() <= message.counter {
            self.latest_chain.clone()
        } else {
            self.initial_chain.clone()
        };
        while chain.index() < message.counter {
            chain.advance()?;
        }

        let message_key = chain.message_key();
        let associated_data = message.associated_data(self.session_id.as_bytes());
        let plaintext = C::decrypt(message_key.key(), &message.ciphertext, &associated_data)
            .map_err(|_| DecryptionError::BadMessageMac)?;

        if chain.index() > self.latest_chain.index() {
            self.latest_chain = chain;
        }

        Ok(plaintext)
    }

    /// Encode the session into an encrypted pickle under `key`.
    pub fn pickle(&self, key: &[u8; PICKLE_KEY_LENGTH]) -> Vec<u8> {
        let pickle = InboundGroupSessionPickle {
            initial_chain_key: *self.initial_chain.key_bytes(),
            initial_chain_index: self.initial_chain.index(),
            latest_chain_key: *self.latest_chain.key_bytes(),
            latest_chain_index: self.latest_chain.index(),
            signing_key: self.signing_key.to_bytes(),
        };
        pickle::seal(key, &pickle)
    }

    /// Restore a session from an encrypted pickle.
    ///
    /// # Errors
    ///
    /// [`PickleError`] when the pickle is malformed, the version is
    /// unknown, the embedded signing key is invalid, or `key` is not
    /// the sealing key.
    pub fn from_pickle(bytes: &[u8], key: &[u8; PICKLE_KEY_LENGTH]) -> Result<Self, PickleError> {
        let pickle: InboundGroupSessionPickle = pickle::open(key, bytes)?;

        let signing_key = Ed25519PublicKey::from_bytes(pickle.signing_key)
            .map_err(|_| PickleError::InvalidEncoding)?;
        let session_id = GroupSessionId::from_signing_key(&signing_key);

        Ok(Self {
            initial_chain: ChainKey::from_parts(
                pickle.initial_chain_key,
                pickle.initial_chain_index,
            ),
            latest_chain: ChainKey::from_parts(pickle.latest_chain_key, pickle.latest_chain_index),
            signing_key,
            session_id,
            cipher: PhantomData,
        })
    }
}

impl<C: CipherSuite> std::fmt::Debug for InboundGroupSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundGroupSession")
            .field("session_id", &self.session_id)
            .field("first_known_index", &self.initial_chain.index())
            .finish_non_exhaustive()
    }
}

/// Serialized form of an inbound group session, sealed by
/// [`InboundGroupSession::pickle`].
#[derive(Serialize, Deserialize)]
struct InboundGroupSessionPickle {
    initial_chain_key: [u8; GROUP_RATCHET_LENGTH],
    initial_chain_index: u32,
    latest_chain_key: [u8; GROUP_RATCHET_LENGTH],
    latest_chain_index: u32,
    signing_key: [u8; 32],
}
