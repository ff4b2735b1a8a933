//! Error types for the protocol layer
//!
//! The taxonomy separates resource insufficiency (detectable before any
//! state mutation), message validity (the peer sent something we cannot
//! or will not process), and serialization validity (pickle decoding,
//! re-exported from `cinder-crypto`). Nothing here conflates "the peer
//! sent garbage" with "we ran out of a local resource".

use cinder_crypto::Curve25519PublicKey;
use cinder_proto::CodecError;
use thiserror::Error;

use crate::chain::ChainIndexOverflow;

pub use cinder_crypto::PickleError;

/// Errors from creating accounts, keys, or group sessions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreationError {
    /// The caller supplied fewer random bytes than the operation
    /// requires. Reported before any state mutation.
    #[error("insufficient randomness: need {required} bytes, got {provided}")]
    InsufficientRandomness {
        /// Bytes the operation requires
        required: usize,
        /// Bytes the caller supplied
        provided: usize,
    },
}

/// Errors from establishing a pairwise session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionCreationError {
    /// The caller supplied fewer random bytes than the handshake
    /// requires.
    #[error("insufficient randomness: need {required} bytes, got {provided}")]
    InsufficientRandomness {
        /// Bytes the operation requires
        required: usize,
        /// Bytes the caller supplied
        provided: usize,
    },

    /// The handshake payload could not be parsed.
    #[error("malformed handshake payload: {0}")]
    BadMessageFormat(#[from] CodecError),

    /// The handshake references a one-time key this account does not
    /// hold. The key was already consumed, evicted, or never issued.
    #[error("unknown one-time key: {0}")]
    UnknownOneTimeKey(Curve25519PublicKey),

    /// The identity key inside the handshake payload does not match the
    /// identity key the caller claims to be talking to.
    #[error("handshake identity key does not match the expected peer")]
    MismatchedIdentityKey,
}

/// Errors from encrypting on an established session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    /// A DH ratchet step was required and the caller supplied fewer
    /// random bytes than it needs. Encryption that continues an existing
    /// chain never consumes randomness.
    #[error("insufficient randomness: need {required} bytes, got {provided}")]
    InsufficientRandomness {
        /// Bytes the ratchet step requires
        required: usize,
        /// Bytes the caller supplied
        provided: usize,
    },

    /// The sending chain reached its final index. The session (or group
    /// session) must be replaced before anything more can be sent.
    #[error("sending chain exhausted: {0}")]
    KeyChainExhausted(#[from] ChainIndexOverflow),
}

/// Errors from decrypting a received message.
///
/// Deliberately coarse on the cryptographic path: a failed MAC never
/// reveals which sub-check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptionError {
    /// The message could not be parsed.
    #[error("malformed message: {0}")]
    BadMessageFormat(#[from] CodecError),

    /// The ciphertext failed authentication. No ratchet state was
    /// advanced.
    #[error("message authentication failed")]
    BadMessageMac,

    /// The message index was already consumed, or lies before the start
    /// of every chain we hold. The message is permanently
    /// undecryptable.
    #[error("no message key for index {index}")]
    UnknownMessageIndex {
        /// The index the message claimed
        index: u32,
    },

    /// Decrypting would require advancing a chain further than the
    /// permitted gap, which bounds attacker-induced CPU cost.
    #[error("message gap too large: {gap} exceeds the maximum of {max}")]
    MessageGapTooLarge {
        /// The gap the message would require
        gap: u32,
        /// The configured maximum
        max: u32,
    },

    /// The message carries a new ratchet key, but we have never sent a
    /// reply on this session. A conforming peer cannot produce this.
    #[error("ratchet step received before any reply was sent")]
    InvalidRatchetStep,

    /// A group message's signature did not verify.
    #[error("message signature verification failed")]
    BadSignature,

    /// Reaching the message's index would advance a chain past its
    /// final index.
    #[error("receiving chain exhausted: {0}")]
    KeyChainExhausted(#[from] ChainIndexOverflow),
}

impl DecryptionError {
    /// Returns true when retrying with the same message can never
    /// succeed.
    ///
    /// Non-permanent failures may resolve once other traffic arrives or
    /// state is resynchronized; permanent ones indicate the message is
    /// forged, replayed, or lost to forward secrecy.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::BadMessageFormat(_)
            | Self::BadMessageMac
            | Self::UnknownMessageIndex { .. }
            | Self::BadSignature
            | Self::KeyChainExhausted(_) => true,

            // A smaller gap may exist after intervening messages arrive;
            // a ratchet step becomes valid once we have replied
            Self::MessageGapTooLarge { .. } | Self::InvalidRatchetStep => false,
        }
    }
}

/// Errors from importing an exported group session key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionKeyImportError {
    /// The export could not be parsed.
    #[error("malformed session key export: {0}")]
    BadMessageFormat(#[from] CodecError),

    /// The export's self-signature did not verify.
    #[error("session key signature verification failed")]
    BadSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_mac_is_permanent() {
        assert!(DecryptionError::BadMessageMac.is_permanent());
    }

    #[test]
    fn exhausted_chain_is_permanent() {
        let err = DecryptionError::KeyChainExhausted(ChainIndexOverflow { index: u32::MAX });
        assert!(err.is_permanent());
    }

    #[test]
    fn gap_too_large_is_not_permanent() {
        assert!(!DecryptionError::MessageGapTooLarge { gap: 5000, max: 2000 }.is_permanent());
    }

    #[test]
    fn insufficient_randomness_display_names_both_lengths() {
        let err = CreationError::InsufficientRandomness { required: 64, provided: 12 };
        assert_eq!(err.to_string(), "insufficient randomness: need 64 bytes, got 12");
    }
}
