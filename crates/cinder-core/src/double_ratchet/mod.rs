//! The double-ratchet state machine
//!
//! Combines an occasional X25519 ratchet step (advancing the root key
//! whenever the peer shows a new ratchet key) with per-direction
//! HMAC hash chains (advancing once per message). Together they give
//! every message a fresh key, with forward secrecy and recovery from
//! state compromise once a round trip completes.
//!
//! # State
//!
//! - a root key
//! - at most one sender chain (our current ratchet keypair + chain)
//! - a small ordered set of receiver chains, newest first, one per peer
//!   ratchet key not yet superseded by our own reply
//! - a bounded FIFO cache of skipped message keys for out-of-order
//!   delivery
//!
//! # Invariants
//!
//! - A sender chain is only ever created while a receiver chain exists:
//!   we must have heard from the peer before ratcheting forward.
//! - Decryption commits no chain state until the ciphertext has
//!   authenticated; a forged message can never advance the ratchet.
//! - Skipped keys are removed when successfully consumed, never on
//!   failure.

use std::collections::VecDeque;

use cinder_crypto::{
    CipherSuite, Curve25519Keypair, Curve25519PublicKey, SharedSecret, hkdf_sha256,
};
use cinder_proto::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::{
    chain::{ChainIndexOverflow, ChainKey, MessageKey},
    error::{DecryptionError, EncryptionError},
    randomness::{SEED_LENGTH, seed},
    session::key_exchange::{SessionId, SharedSecret3Dh},
};

/// Maximum hash iterations a single decrypt may trigger, bounding
/// attacker-induced CPU cost.
pub const MAX_MESSAGE_GAP: u32 = 2000;

/// Receiver chains retained before the oldest is dropped.
const MAX_RECEIVER_CHAINS: usize = 5;

/// Skipped message keys retained before the oldest is evicted.
const MAX_SKIPPED_KEYS: usize = 2000;

/// HKDF info label for the initial root/chain derivation.
const INITIAL_ROOT_INFO: &[u8] = b"cinderRootV1";

/// HKDF info label for ratchet-step derivations.
const RATCHET_STEP_INFO: &[u8] = b"cinderRatchetV1";

/// The root key driving ratchet-step derivations.
#[derive(Clone)]
struct RootKey([u8; 32]);

impl RootKey {
    /// Derive the initial root key and first chain key from the
    /// handshake secret.
    fn initial(shared_secret: &SharedSecret3Dh) -> (Self, ChainKey) {
        let mut okm = [0u8; 64];
        let Ok(()) = hkdf_sha256(None, shared_secret.as_bytes(), INITIAL_ROOT_INFO, &mut okm)
        else {
            unreachable!("64 bytes is a valid HKDF-SHA256 output length");
        };
        Self::split(&mut okm)
    }

    /// Perform one ratchet-step derivation keyed by this root key.
    fn advance(&self, shared_secret: &SharedSecret) -> (Self, ChainKey) {
        let mut okm = [0u8; 64];
        let Ok(()) =
            hkdf_sha256(Some(&self.0), shared_secret.as_bytes(), RATCHET_STEP_INFO, &mut okm)
        else {
            unreachable!("64 bytes is a valid HKDF-SHA256 output length");
        };
        Self::split(&mut okm)
    }

    fn split(okm: &mut [u8; 64]) -> (Self, ChainKey) {
        let mut root = [0u8; 32];
        let mut chain = [0u8; 32];
        root.copy_from_slice(&okm[..32]);
        chain.copy_from_slice(&okm[32..]);
        okm.zeroize();

        (Self(root), ChainKey::new(chain))
    }
}

impl Drop for RootKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Our active sending chain.
struct SenderChain {
    ratchet_key: Curve25519Keypair,
    chain_key: ChainKey,
}

/// A receiving chain for one peer ratchet key.
struct ReceiverChain {
    ratchet_key: Curve25519PublicKey,
    chain_key: ChainKey,
}

/// A message key cached for out-of-order delivery.
struct SkippedMessageKey {
    ratchet_key: Curve25519PublicKey,
    message_key: MessageKey,
}

/// Advance a chain copy to `target`, collecting every intermediate key.
///
/// Returns the chain positioned past `target`, the key at `target`, and
/// the keys for the indices that were jumped over.
fn derive_until(
    mut chain_key: ChainKey,
    target: u32,
) -> Result<(ChainKey, MessageKey, Vec<MessageKey>), ChainIndexOverflow> {
    let mut jumped = Vec::with_capacity((target - chain_key.index()) as usize);
    while chain_key.index() < target {
        jumped.push(chain_key.message_key());
        chain_key.advance()?;
    }

    let message_key = chain_key.message_key();
    chain_key.advance()?;

    Ok((chain_key, message_key, jumped))
}

/// The double-ratchet state machine for one session.
pub(crate) struct DoubleRatchet {
    root_key: RootKey,
    sender_chain: Option<SenderChain>,
    receiver_chains: Vec<ReceiverChain>,
    skipped_keys: VecDeque<SkippedMessageKey>,
}

impl DoubleRatchet {
    /// Initiator construction: the handshake secret seeds the root key
    /// and a sender chain under a fresh ratchet keypair, at index 0. No
    /// ratchet step has happened yet.
    pub(crate) fn new_outbound(
        shared_secret: &SharedSecret3Dh,
        ratchet_seed: [u8; SEED_LENGTH],
    ) -> Self {
        let (root_key, chain_key) = RootKey::initial(shared_secret);

        Self {
            root_key,
            sender_chain: Some(SenderChain {
                ratchet_key: Curve25519Keypair::from_random(ratchet_seed),
                chain_key,
            }),
            receiver_chains: Vec::new(),
            skipped_keys: VecDeque::new(),
        }
    }

    /// Responder construction: the same derivation lands in a receiver
    /// chain under the initiator's first ratchet key.
    pub(crate) fn new_inbound(
        shared_secret: &SharedSecret3Dh,
        their_ratchet_key: Curve25519PublicKey,
    ) -> Self {
        let (root_key, chain_key) = RootKey::initial(shared_secret);

        Self {
            root_key,
            sender_chain: None,
            receiver_chains: vec![ReceiverChain { ratchet_key: their_ratchet_key, chain_key }],
            skipped_keys: VecDeque::new(),
        }
    }

    /// Encrypt one message, ratcheting forward if our previous sender
    /// chain was retired by a peer ratchet step.
    ///
    /// Randomness is consumed only when a ratchet step is required;
    /// continuing an existing chain never blocks on it.
    pub(crate) fn encrypt<C: CipherSuite>(
        &mut self,
        session_id: &SessionId,
        plaintext: &[u8],
        randomness: &[u8],
    ) -> Result<Message, EncryptionError> {
        if self.sender_chain.is_none() {
            if randomness.len() < SEED_LENGTH {
                return Err(EncryptionError::InsufficientRandomness {
                    required: SEED_LENGTH,
                    provided: randomness.len(),
                });
            }

            let Some(receiver) = self.receiver_chains.first() else {
                unreachable!("a sender chain is only absent while a receiver chain exists");
            };
            let their_key = receiver.ratchet_key;

            let ratchet_key = Curve25519Keypair::from_random(seed(randomness, 0));
            let shared_secret = ratchet_key.shared_secret(&their_key);
            let (root_key, chain_key) = self.root_key.advance(&shared_secret);

            debug!(ratchet_key = %ratchet_key.public_key(), "performed ratchet step");
            self.root_key = root_key;
            self.sender_chain = Some(SenderChain { ratchet_key, chain_key });
        }

        let Some(chain) = self.sender_chain.as_mut() else {
            unreachable!("sender chain was installed above");
        };

        let message_key = chain.chain_key.message_key();
        chain.chain_key.advance()?;

        let mut message = Message {
            ratchet_key: chain.ratchet_key.public_key(),
            counter: message_key.index(),
            ciphertext: Vec::new(),
        };
        let associated_data = message.associated_data(session_id.as_bytes());
        message.ciphertext = C::encrypt(message_key.key(), plaintext, &associated_data);

        trace!(counter = message.counter, "encrypted message");
        Ok(message)
    }

    /// Decrypt one message, tolerating reordering up to
    /// [`MAX_MESSAGE_GAP`] through the skipped-key cache.
    pub(crate) fn decrypt<C: CipherSuite>(
        &mut self,
        session_id: &SessionId,
        message: &Message,
    ) -> Result<Vec<u8>, DecryptionError> {
        let associated_data = message.associated_data(session_id.as_bytes());

        let position = self
            .receiver_chains
            .iter()
            .position(|chain| chain.ratchet_key == message.ratchet_key);

        // Work on copies; nothing commits until authentication succeeds
        let (pending_root, chain_key) = match position {
            Some(index) => {
                let chain = &self.receiver_chains[index];
                if message.counter < chain.chain_key.index() {
                    return self.decrypt_skipped::<C>(message, &associated_data);
                }
                (None, chain.chain_key.clone())
            }
            None => {
                // A ratchet key we have never seen: a peer ratchet step,
                // valid only once we have replied at least once
                let sender =
                    self.sender_chain.as_ref().ok_or(DecryptionError::InvalidRatchetStep)?;
                let shared_secret = sender.ratchet_key.shared_secret(&message.ratchet_key);
                let (root_key, chain_key) = self.root_key.advance(&shared_secret);
                (Some(root_key), chain_key)
            }
        };

        let gap = message.counter - chain_key.index();
        if gap > MAX_MESSAGE_GAP {
            return Err(DecryptionError::MessageGapTooLarge { gap, max: MAX_MESSAGE_GAP });
        }

        let (advanced, message_key, jumped) = derive_until(chain_key, message.counter)?;

        let plaintext = C::decrypt(message_key.key(), &message.ciphertext, &associated_data)
            .map_err(|_| DecryptionError::BadMessageMac)?;

        // Authenticated: commit the advancement
        match position {
            Some(index) => self.receiver_chains[index].chain_key = advanced,
            None => {
                let Some(root_key) = pending_root else {
                    unreachable!("a new chain always carries a pending root key");
                };
                debug!(ratchet_key = %message.ratchet_key, "accepted peer ratchet step");
                self.root_key = root_key;
                self.receiver_chains.insert(
                    0,
                    ReceiverChain { ratchet_key: message.ratchet_key, chain_key: advanced },
                );
                self.receiver_chains.truncate(MAX_RECEIVER_CHAINS);
                // Retired; a fresh one is generated lazily on next encrypt
                self.sender_chain = None;
            }
        }

        if !jumped.is_empty() {
            trace!(count = jumped.len(), "cached skipped message keys");
        }
        for message_key in jumped {
            self.skipped_keys
                .push_back(SkippedMessageKey { ratchet_key: message.ratchet_key, message_key });
        }
        while self.skipped_keys.len() > MAX_SKIPPED_KEYS {
            self.skipped_keys.pop_front();
        }

        Ok(plaintext)
    }

    /// Decrypt a message whose chain already advanced past it.
    fn decrypt_skipped<C: CipherSuite>(
        &mut self,
        message: &Message,
        associated_data: &[u8],
    ) -> Result<Vec<u8>, DecryptionError> {
        let position = self
            .skipped_keys
            .iter()
            .position(|skipped| {
                skipped.ratchet_key == message.ratchet_key
                    && skipped.message_key.index() == message.counter
            })
            .ok_or(DecryptionError::UnknownMessageIndex { index: message.counter })?;

        let plaintext = C::decrypt(
            self.skipped_keys[position].message_key.key(),
            &message.ciphertext,
            associated_data,
        )
        .map_err(|_| DecryptionError::BadMessageMac)?;

        // Consumed successfully; a failed attempt leaves the key cached
        self.skipped_keys.remove(position);
        Ok(plaintext)
    }

    pub(crate) fn to_pickle(&self) -> DoubleRatchetPickle {
        DoubleRatchetPickle {
            root_key: self.root_key.0,
            sender_chain: self.sender_chain.as_ref().map(|chain| SenderChainPickle {
                ratchet_key: chain.ratchet_key.secret_key().to_bytes(),
                chain_key: *chain.chain_key.key_bytes(),
                chain_index: chain.chain_key.index(),
            }),
            receiver_chains: self
                .receiver_chains
                .iter()
                .map(|chain| ReceiverChainPickle {
                    ratchet_key: chain.ratchet_key.to_bytes(),
                    chain_key: *chain.chain_key.key_bytes(),
                    chain_index: chain.chain_key.index(),
                })
                .collect(),
            skipped_keys: self
                .skipped_keys
                .iter()
                .map(|skipped| SkippedMessageKeyPickle {
                    ratchet_key: skipped.ratchet_key.to_bytes(),
                    message_key: *skipped.message_key.key(),
                    index: skipped.message_key.index(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_pickle(pickle: DoubleRatchetPickle) -> Self {
        Self {
            root_key: RootKey(pickle.root_key),
            sender_chain: pickle.sender_chain.map(|chain| SenderChain {
                ratchet_key: Curve25519Keypair::from_secret_bytes(chain.ratchet_key),
                chain_key: ChainKey::from_parts(chain.chain_key, chain.chain_index),
            }),
            receiver_chains: pickle
                .receiver_chains
                .into_iter()
                .map(|chain| ReceiverChain {
                    ratchet_key: Curve25519PublicKey::from_bytes(chain.ratchet_key),
                    chain_key: ChainKey::from_parts(chain.chain_key, chain.chain_index),
                })
                .collect(),
            skipped_keys: pickle
                .skipped_keys
                .into_iter()
                .map(|skipped| SkippedMessageKey {
                    ratchet_key: Curve25519PublicKey::from_bytes(skipped.ratchet_key),
                    message_key: MessageKey::from_parts(skipped.message_key, skipped.index),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for DoubleRatchet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleRatchet")
            .field("sender_chain", &self.sender_chain.is_some())
            .field("receiver_chains", &self.receiver_chains.len())
            .field("skipped_keys", &self.skipped_keys.len())
            .finish_non_exhaustive()
    }
}

/// Pickled form of a sender chain (holds the ratchet secret key).
#[derive(Serialize, Deserialize)]
pub(crate) struct SenderChainPickle {
    ratchet_key: [u8; 32],
    chain_key: [u8; 32],
    chain_index: u32,
}

/// Pickled form of a receiver chain.
#[derive(Serialize, Deserialize)]
pub(crate) struct ReceiverChainPickle {
    ratchet_key: [u8; 32],
    chain_key: [u8; 32],
    chain_index: u32,
}

/// Pickled form of a cached skipped key.
#[derive(Serialize, Deserialize)]
pub(crate) struct SkippedMessageKeyPickle {
    ratchet_key: [u8; 32],
    message_key: [u8; 32],
    index: u32,
}

/// Pickled form of the full ratchet state.
#[derive(Serialize, Deserialize)]
pub(crate) struct DoubleRatchetPickle {
    root_key: [u8; 32],
    sender_chain: Option<SenderChainPickle>,
    receiver_chains: Vec<ReceiverChainPickle>,
    skipped_keys: Vec<SkippedMessageKeyPickle>,
}
