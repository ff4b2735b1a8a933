//! Error types for wire decoding

use thiserror::Error;

/// Errors from decoding wire messages.
///
/// Every variant means the input cannot be a well-formed frame; none of
/// them reveals anything about key material or protocol state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before a complete frame was read.
    #[error("truncated message: need at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum bytes required at the failing read
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// The declared ciphertext length disagrees with the frame length.
    #[error("ciphertext length mismatch: header declares {declared}, frame holds {actual}")]
    LengthMismatch {
        /// Length declared in the header
        declared: usize,
        /// Length actually present
        actual: usize,
    },

    /// The frame's protocol version is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The frame's type tag is not a known message type.
    #[error("unknown message type tag: {0}")]
    UnknownMessageType(u8),

    /// An embedded Ed25519 public key does not decode to a curve point.
    #[error("invalid signing key in frame")]
    InvalidSigningKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_display_names_both_lengths() {
        let err = CodecError::Truncated { expected: 41, actual: 7 };
        assert_eq!(err.to_string(), "truncated message: need at least 41 bytes, got 7");
    }
}
