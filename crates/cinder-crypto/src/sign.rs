//! Ed25519 signatures
//!
//! Signing is deterministic per RFC 8032, so no caller randomness is
//! consumed beyond initial key generation.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::errors::SignatureError;

/// Length of an Ed25519 public or secret key in bytes.
pub const ED25519_KEY_LENGTH: usize = 32;

/// Length of an Ed25519 signature in bytes.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// The public half of an Ed25519 keypair.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ed25519PublicKey([u8; ED25519_KEY_LENGTH]);

impl Ed25519PublicKey {
    /// Construct a public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Fails if the bytes do not encode a valid curve point.
    pub fn from_bytes(bytes: [u8; ED25519_KEY_LENGTH]) -> Result<Self, SignatureError> {
        // Validate eagerly so later verification can't fail on key format
        VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; ED25519_KEY_LENGTH] {
        &self.0
    }

    /// The raw key bytes, by value.
    pub fn to_bytes(self) -> [u8; ED25519_KEY_LENGTH] {
        self.0
    }

    /// Verify a signature over a message.
    ///
    /// Returns `true` only when the signature is valid for this key.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            // from_bytes validated the point at construction time
            return false;
        };
        key.verify(message, &ed25519_dalek::Signature::from_bytes(&signature.0)).is_ok()
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({self})")
    }
}

/// A detached Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature([u8; ED25519_SIGNATURE_LENGTH]);

impl Ed25519Signature {
    /// Construct a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; ED25519_SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; ED25519_SIGNATURE_LENGTH] {
        &self.0
    }

    /// The raw signature bytes, by value.
    pub fn to_bytes(self) -> [u8; ED25519_SIGNATURE_LENGTH] {
        self.0
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ed25519Signature(..)")
    }
}

/// An Ed25519 signing keypair.
///
/// The inner `SigningKey` zeroizes its secret scalar on drop.
#[derive(Clone)]
pub struct Ed25519Keypair {
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Construct a keypair from 32 caller-supplied random bytes.
    pub fn from_random(bytes: [u8; ED25519_KEY_LENGTH]) -> Self {
        Self { signing_key: SigningKey::from_bytes(&bytes) }
    }

    /// Restore a keypair from exported secret bytes.
    pub fn from_secret_bytes(bytes: [u8; ED25519_KEY_LENGTH]) -> Self {
        Self { signing_key: SigningKey::from_bytes(&bytes) }
    }

    /// Export the raw secret bytes, for pickling only.
    pub fn to_secret_bytes(&self) -> [u8; ED25519_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// The public half of the keypair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Deterministic per RFC 8032.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Keypair({})", self.public_key())
    }
}
