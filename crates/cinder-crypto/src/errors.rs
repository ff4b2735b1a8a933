//! Error types for the primitive layer

use thiserror::Error;

/// Errors from HKDF key derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KdfError {
    /// The requested output length exceeds what HKDF-SHA256 can produce.
    #[error("invalid HKDF output length: {requested} bytes")]
    InvalidOutputLength {
        /// The output length that was requested
        requested: usize,
    },
}

/// Errors from Ed25519 key handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The bytes do not encode a valid Ed25519 public key.
    #[error("invalid Ed25519 public key")]
    InvalidPublicKey,
}

/// Errors from the cipher suite.
///
/// Decryption failures are deliberately uninformative: the caller learns
/// that authentication failed, never which sub-check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Authentication of the ciphertext failed.
    #[error("ciphertext authentication failed")]
    MacFailure,
}

/// Errors from the encrypted pickle container.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickleError {
    /// The container is shorter than the minimum valid encoding.
    #[error("pickle too short: {length} bytes")]
    InputTooShort {
        /// Observed input length
        length: usize,
    },

    /// The container's format version is not supported.
    #[error("unknown pickle format version: {0}")]
    UnknownVersion(u8),

    /// The container failed to decrypt, i.e. the supplied key is wrong
    /// or the ciphertext was corrupted.
    #[error("pickle decryption failed: wrong key or corrupted container")]
    BadKey,

    /// The decrypted payload is not a valid encoding of the target type.
    #[error("invalid pickle encoding")]
    InvalidEncoding,

    /// A complete value was decoded but bytes remain after it.
    #[error("trailing data after pickle payload: {remaining} bytes")]
    TrailingData {
        /// Number of unconsumed bytes
        remaining: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickle_error_display() {
        let err = PickleError::TrailingData { remaining: 3 };
        assert_eq!(err.to_string(), "trailing data after pickle payload: 3 bytes");
    }

    #[test]
    fn cipher_error_is_uninformative() {
        assert_eq!(CipherError::MacFailure.to_string(), "ciphertext authentication failed");
    }
}
