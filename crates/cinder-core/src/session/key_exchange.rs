//! The asymmetric triple key-agreement bootstrapping a session
//!
//! Each side performs three X25519 agreements against three keys and
//! concatenates the results in a fixed order:
//!
//! - initiator: (identity, their one-time), (base, their identity),
//!   (base, their one-time)
//! - responder: the mirror image, which yields identical bytes
//!
//! The concatenation seeds the double ratchet's root key. The same key
//! triple also determines the session id, an order-sensitive hash that
//! domain-separates every message's authentication.

use cinder_crypto::{Curve25519Keypair, Curve25519PublicKey, Curve25519SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Domain label for session id hashing.
const SESSION_ID_LABEL: &[u8] = b"cinderSessionIdV1";

/// The concatenated output of the three key agreements.
///
/// Zeroized on drop.
pub(crate) struct SharedSecret3Dh([u8; 96]);

impl SharedSecret3Dh {
    /// Compute the initiator's side of the exchange.
    pub(crate) fn new_outbound(
        our_identity: &Curve25519SecretKey,
        our_base: &Curve25519Keypair,
        their_identity: &Curve25519PublicKey,
        their_one_time: &Curve25519PublicKey,
    ) -> Self {
        let first = our_identity.shared_secret(their_one_time);
        let second = our_base.shared_secret(their_identity);
        let third = our_base.shared_secret(their_one_time);

        Self::concatenate(first.as_bytes(), second.as_bytes(), third.as_bytes())
    }

    /// Compute the responder's side of the exchange.
    pub(crate) fn new_inbound(
        our_identity: &Curve25519SecretKey,
        our_one_time: &Curve25519SecretKey,
        their_identity: &Curve25519PublicKey,
        their_base: &Curve25519PublicKey,
    ) -> Self {
        let first = our_one_time.shared_secret(their_identity);
        let second = our_identity.shared_secret(their_base);
        let third = our_one_time.shared_secret(their_base);

        Self::concatenate(first.as_bytes(), second.as_bytes(), third.as_bytes())
    }

    fn concatenate(first: &[u8; 32], second: &[u8; 32], third: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 96];
        bytes[..32].copy_from_slice(first);
        bytes[32..64].copy_from_slice(second);
        bytes[64..].copy_from_slice(third);
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }
}

impl Drop for SharedSecret3Dh {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// The public key triple recorded at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    /// The initiator's long-term identity key.
    pub identity_key: Curve25519PublicKey,
    /// The initiator's ephemeral base key.
    pub base_key: Curve25519PublicKey,
    /// The responder's one-time key chosen by the initiator.
    pub one_time_key: Curve25519PublicKey,
}

impl SessionKeys {
    /// The stable, order-sensitive session id for this key triple.
    ///
    /// Both sides compute the same id; ciphertexts from one session can
    /// never authenticate in another because the id feeds every
    /// message's associated data.
    pub fn session_id(&self) -> SessionId {
        let mut hasher = Sha256::new();
        hasher.update(SESSION_ID_LABEL);
        hasher.update(self.identity_key.as_bytes());
        hasher.update(self.base_key.as_bytes());
        hasher.update(self.one_time_key.as_bytes());

        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        SessionId(id)
    }
}

/// A stable identifier for one pairwise session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId([u8; 32]);

impl SessionId {
    /// The raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({self})")
    }
}
