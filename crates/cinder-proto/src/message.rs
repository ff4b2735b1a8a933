//! Pairwise session message codecs
//!
//! Two frame types flow through a pairwise session:
//!
//! - [`Message`]: a normal double-ratchet message carrying the sender's
//!   current ratchet key, the chain index, and the ciphertext.
//! - [`PreKeyMessage`]: a handshake-carrying wrapper sent by the
//!   initiator until the responder has demonstrably replied. It embeds
//!   the full key material the responder needs to establish its side of
//!   the session, plus a complete inner [`Message`].
//!
//! All multi-byte integers are big-endian. Decoding validates lengths
//! exactly: truncated frames and frames whose declared ciphertext length
//! disagrees with the bytes present are rejected without being
//! interpreted further.

use bytes::BufMut;
use cinder_crypto::{CURVE25519_KEY_LENGTH, Curve25519PublicKey};

use crate::errors::CodecError;

/// Wire protocol version for all pairwise frames.
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed header length of a normal message:
/// version (1) + counter (4) + ratchet key (32) + ciphertext length (4).
const MESSAGE_HEADER_LENGTH: usize = 1 + 4 + CURVE25519_KEY_LENGTH + 4;

/// Fixed prefix length of a pre-key message:
/// version (1) + one-time key (32) + base key (32) + identity key (32).
const PREKEY_PREFIX_LENGTH: usize = 1 + 3 * CURVE25519_KEY_LENGTH;

/// Wire tag for a pre-key message inside [`SessionMessage`].
const PREKEY_TAG: u8 = 0x00;

/// Wire tag for a normal message inside [`SessionMessage`].
const NORMAL_TAG: u8 = 0x01;

/// Read a fixed-size key out of `input` at `offset`.
fn read_key(input: &[u8], offset: usize) -> [u8; CURVE25519_KEY_LENGTH] {
    let mut key = [0u8; CURVE25519_KEY_LENGTH];
    key.copy_from_slice(&input[offset..offset + CURVE25519_KEY_LENGTH]);
    key
}

/// A normal double-ratchet message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The sender's current ratchet public key.
    pub ratchet_key: Curve25519PublicKey,
    /// Index of the message key within the sender's current chain.
    pub counter: u32,
    /// Ciphertext, including the cipher suite's authentication tag.
    pub ciphertext: Vec<u8>,
}

impl Message {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MESSAGE_HEADER_LENGTH + self.ciphertext.len());
        out.put_u8(PROTOCOL_VERSION);
        out.put_u32(self.counter);
        out.put_slice(self.ratchet_key.as_bytes());
        out.put_u32(self.ciphertext.len() as u32);
        out.put_slice(&self.ciphertext);
        out
    }

    /// Decode from wire bytes.
    ///
    /// The frame must be exactly one message: trailing bytes are a
    /// [`CodecError::LengthMismatch`].
    pub fn decode(input: &[u8]) -> Result<Self, CodecError> {
        if input.len() < MESSAGE_HEADER_LENGTH {
            return Err(CodecError::Truncated {
                expected: MESSAGE_HEADER_LENGTH,
                actual: input.len(),
            });
        }

        let version = input[0];
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let counter = u32::from_be_bytes([input[1], input[2], input[3], input[4]]);
        let ratchet_key = Curve25519PublicKey::from_bytes(read_key(input, 5));

        let declared = u32::from_be_bytes([input[37], input[38], input[39], input[40]]) as usize;
        let actual = input.len() - MESSAGE_HEADER_LENGTH;
        if declared != actual {
            return Err(CodecError::LengthMismatch { declared, actual });
        }

        Ok(Self { ratchet_key, counter, ciphertext: input[MESSAGE_HEADER_LENGTH..].to_vec() })
    }

    /// The associated data authenticating this message's header and
    /// binding it to one session.
    pub fn associated_data(&self, session_id: &[u8]) -> Vec<u8> {
        let mut ad =
            Vec::with_capacity(1 + 4 + CURVE25519_KEY_LENGTH + session_id.len());
        ad.put_u8(PROTOCOL_VERSION);
        ad.put_u32(self.counter);
        ad.put_slice(self.ratchet_key.as_bytes());
        ad.put_slice(session_id);
        ad
    }
}

/// A handshake-carrying pre-key message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeyMessage {
    /// The responder's one-time key chosen by the initiator.
    pub one_time_key: Curve25519PublicKey,
    /// The initiator's ephemeral base key.
    pub base_key: Curve25519PublicKey,
    /// The initiator's long-term identity key.
    pub identity_key: Curve25519PublicKey,
    /// The embedded first ratchet message.
    pub message: Message,
}

impl PreKeyMessage {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let inner = self.message.encode();
        let mut out = Vec::with_capacity(PREKEY_PREFIX_LENGTH + inner.len());
        out.put_u8(PROTOCOL_VERSION);
        out.put_slice(self.one_time_key.as_bytes());
        out.put_slice(self.base_key.as_bytes());
        out.put_slice(self.identity_key.as_bytes());
        out.put_slice(&inner);
        out
    }

    /// Decode from wire bytes.
    pub fn decode(input: &[u8]) -> Result<Self, CodecError> {
        if input.len() < PREKEY_PREFIX_LENGTH {
            return Err(CodecError::Truncated {
                expected: PREKEY_PREFIX_LENGTH,
                actual: input.len(),
            });
        }

        let version = input[0];
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let one_time_key = Curve25519PublicKey::from_bytes(read_key(input, 1));
        let base_key = Curve25519PublicKey::from_bytes(read_key(input, 33));
        let identity_key = Curve25519PublicKey::from_bytes(read_key(input, 65));
        let message = Message::decode(&input[PREKEY_PREFIX_LENGTH..])?;

        Ok(Self { one_time_key, base_key, identity_key, message })
    }
}

/// Either frame type a pairwise session can emit or accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    /// A handshake-carrying pre-key message.
    PreKey(PreKeyMessage),
    /// A normal ratchet message.
    Normal(Message),
}

impl SessionMessage {
    /// Encode to transport bytes, prefixed with a one-byte type tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::PreKey(message) => {
                let mut out = vec![PREKEY_TAG];
                out.extend_from_slice(&message.encode());
                out
            }
            Self::Normal(message) => {
                let mut out = vec![NORMAL_TAG];
                out.extend_from_slice(&message.encode());
                out
            }
        }
    }

    /// Decode from transport bytes.
    pub fn from_bytes(input: &[u8]) -> Result<Self, CodecError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(CodecError::Truncated { expected: 1, actual: 0 })?;

        match tag {
            PREKEY_TAG => Ok(Self::PreKey(PreKeyMessage::decode(rest)?)),
            NORMAL_TAG => Ok(Self::Normal(Message::decode(rest)?)),
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}
