//! Group fan-out message codecs
//!
//! A group sender emits [`GroupMessage`] frames, each signed by the
//! session's Ed25519 key so authenticity survives relaying through an
//! untrusted party. New members are admitted with a [`SessionKey`]
//! export: a signed snapshot of the ratchet at the current counter,
//! which grants decryption of subsequent messages but not earlier ones.

use bytes::BufMut;
use cinder_crypto::{ED25519_SIGNATURE_LENGTH, Ed25519PublicKey, Ed25519Signature};

use crate::{errors::CodecError, message::PROTOCOL_VERSION};

/// Length of the group ratchet state carried in a session key export.
pub const GROUP_RATCHET_LENGTH: usize = 32;

/// Fixed prefix length of a group message:
/// version (1) + counter (4) + ciphertext length (4).
const GROUP_PREFIX_LENGTH: usize = 1 + 4 + 4;

/// Exact wire length of a session key export.
const SESSION_KEY_LENGTH: usize = 1 + 4 + GROUP_RATCHET_LENGTH + 32 + ED25519_SIGNATURE_LENGTH;

/// Offset of the signature within a session key export.
const SESSION_KEY_SIGNED_LENGTH: usize = SESSION_KEY_LENGTH - ED25519_SIGNATURE_LENGTH;

/// A signed group fan-out message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    /// The ratchet counter this message was encrypted at.
    pub counter: u32,
    /// Ciphertext, including the cipher suite's authentication tag.
    pub ciphertext: Vec<u8>,
    /// Ed25519 signature over the whole frame prefix.
    pub signature: Ed25519Signature,
}

impl GroupMessage {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.to_signature_bytes();
        out.put_slice(self.signature.as_bytes());
        out
    }

    /// The frame prefix covered by the signature.
    pub fn to_signature_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(GROUP_PREFIX_LENGTH + self.ciphertext.len());
        out.put_u8(PROTOCOL_VERSION);
        out.put_u32(self.counter);
        out.put_u32(self.ciphertext.len() as u32);
        out.put_slice(&self.ciphertext);
        out
    }

    /// Decode from wire bytes.
    pub fn decode(input: &[u8]) -> Result<Self, CodecError> {
        let minimum = GROUP_PREFIX_LENGTH + ED25519_SIGNATURE_LENGTH;
        if input.len() < minimum {
            return Err(CodecError::Truncated { expected: minimum, actual: input.len() });
        }

        let version = input[0];
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let counter = u32::from_be_bytes([input[1], input[2], input[3], input[4]]);
        let declared = u32::from_be_bytes([input[5], input[6], input[7], input[8]]) as usize;
        let actual = input.len() - minimum;
        if declared != actual {
            return Err(CodecError::LengthMismatch { declared, actual });
        }

        let ciphertext = input[GROUP_PREFIX_LENGTH..GROUP_PREFIX_LENGTH + declared].to_vec();

        let mut signature = [0u8; ED25519_SIGNATURE_LENGTH];
        signature.copy_from_slice(&input[GROUP_PREFIX_LENGTH + declared..]);

        Ok(Self { counter, ciphertext, signature: Ed25519Signature::from_bytes(signature) })
    }

    /// The associated data binding this message's header to one group
    /// session.
    pub fn associated_data(&self, session_id: &[u8]) -> Vec<u8> {
        let mut ad = Vec::with_capacity(1 + 4 + session_id.len());
        ad.put_u8(PROTOCOL_VERSION);
        ad.put_u32(self.counter);
        ad.put_slice(session_id);
        ad
    }
}

/// A signed export of a group session's ratchet at one counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    /// The counter the ratchet state was exported at.
    pub counter: u32,
    /// The ratchet state at that counter.
    pub ratchet_key: [u8; GROUP_RATCHET_LENGTH],
    /// The session's public signing key.
    pub signing_key: Ed25519PublicKey,
    /// Self-signature over the preceding fields, under `signing_key`.
    pub signature: Ed25519Signature,
}

impl SessionKey {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.to_signature_bytes();
        out.put_slice(self.signature.as_bytes());
        out
    }

    /// The prefix covered by the self-signature.
    pub fn to_signature_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SESSION_KEY_LENGTH);
        out.put_u8(PROTOCOL_VERSION);
        out.put_u32(self.counter);
        out.put_slice(&self.ratchet_key);
        out.put_slice(self.signing_key.as_bytes());
        out
    }

    /// Decode from wire bytes. The frame length is exact.
    pub fn decode(input: &[u8]) -> Result<Self, CodecError> {
        if input.len() != SESSION_KEY_LENGTH {
            return Err(CodecError::Truncated {
                expected: SESSION_KEY_LENGTH,
                actual: input.len(),
            });
        }

        let version = input[0];
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let counter = u32::from_be_bytes([input[1], input[2], input[3], input[4]]);

        let mut ratchet_key = [0u8; GROUP_RATCHET_LENGTH];
        ratchet_key.copy_from_slice(&input[5..37]);

        let mut signing_key = [0u8; 32];
        signing_key.copy_from_slice(&input[37..69]);
        let signing_key =
            Ed25519PublicKey::from_bytes(signing_key).map_err(|_| CodecError::InvalidSigningKey)?;

        let mut signature = [0u8; ED25519_SIGNATURE_LENGTH];
        signature.copy_from_slice(&input[SESSION_KEY_SIGNED_LENGTH..]);

        Ok(Self { counter, ratchet_key, signing_key, signature: Ed25519Signature::from_bytes(signature) })
    }
}

#[cfg(test)]
mod tests {
    use cinder_crypto::Ed25519Keypair;

    use super::*;

    fn group_message() -> GroupMessage {
        GroupMessage {
            counter: 3,
            ciphertext: vec![0xBB; 24],
            signature: Ed25519Signature::from_bytes([0xCC; 64]),
        }
    }

    #[test]
    fn group_message_round_trip() {
        let encoded = group_message().encode();
        assert_eq!(GroupMessage::decode(&encoded).unwrap(), group_message());
    }

    #[test]
    fn group_message_rejects_truncation() {
        let encoded = group_message().encode();
        let result = GroupMessage::decode(&encoded[..20]);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn group_message_rejects_trailing_bytes() {
        let mut encoded = group_message().encode();
        encoded.push(0);
        assert!(matches!(GroupMessage::decode(&encoded), Err(CodecError::LengthMismatch { .. })));
    }

    #[test]
    fn signature_bytes_exclude_signature() {
        let message = group_message();
        let signed = message.to_signature_bytes();
        let full = message.encode();
        assert_eq!(&full[..signed.len()], &signed[..]);
        assert_eq!(full.len(), signed.len() + ED25519_SIGNATURE_LENGTH);
    }

    #[test]
    fn session_key_round_trip() {
        let keypair = Ed25519Keypair::from_random([1; 32]);
        let session_key = SessionKey {
            counter: 12,
            ratchet_key: [0xDD; GROUP_RATCHET_LENGTH],
            signing_key: keypair.public_key(),
            signature: Ed25519Signature::from_bytes([0xEE; 64]),
        };

        let encoded = session_key.encode();
        assert_eq!(SessionKey::decode(&encoded).unwrap(), session_key);
    }

    #[test]
    fn session_key_rejects_wrong_length() {
        let result = SessionKey::decode(&[0u8; 10]);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn session_key_rejects_invalid_signing_key_bytes() {
        let keypair = Ed25519Keypair::from_random([1; 32]);
        let session_key = SessionKey {
            counter: 0,
            ratchet_key: [0; GROUP_RATCHET_LENGTH],
            signing_key: keypair.public_key(),
            signature: Ed25519Signature::from_bytes([0; 64]),
        };

        // Find a fill pattern that does not decompress to a curve point
        let invalid = (0u8..=255)
            .map(|fill| [fill; 32])
            .find(|bytes| Ed25519PublicKey::from_bytes(*bytes).is_err())
            .unwrap();

        let mut encoded = session_key.encode();
        encoded[37..69].copy_from_slice(&invalid);

        assert_eq!(SessionKey::decode(&encoded), Err(CodecError::InvalidSigningKey));
    }
}
