//! Curve25519 key agreement
//!
//! Thin wrappers around `x25519-dalek` with fixed-size byte conversions
//! and guaranteed zeroing of secret material on drop. All randomness is
//! caller-supplied so key generation stays deterministic under test.

use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;
use zeroize::Zeroize;

/// Length of a Curve25519 public or secret key in bytes.
pub const CURVE25519_KEY_LENGTH: usize = 32;

/// Length of a Curve25519 shared secret in bytes.
pub const CURVE25519_SHARED_SECRET_LENGTH: usize = 32;

/// The public half of a Curve25519 keypair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Curve25519PublicKey([u8; CURVE25519_KEY_LENGTH]);

impl Curve25519PublicKey {
    /// Construct a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; CURVE25519_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CURVE25519_KEY_LENGTH] {
        &self.0
    }

    /// The raw key bytes, by value.
    pub fn to_bytes(self) -> [u8; CURVE25519_KEY_LENGTH] {
        self.0
    }
}

impl std::fmt::Display for Curve25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Curve25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Curve25519PublicKey({self})")
    }
}

/// The secret half of a Curve25519 keypair.
///
/// The inner `StaticSecret` zeroizes its scalar on drop.
#[derive(Clone)]
pub struct Curve25519SecretKey(StaticSecret);

impl Curve25519SecretKey {
    /// Construct a secret key from 32 caller-supplied random bytes.
    ///
    /// The bytes are clamped per the X25519 specification.
    pub fn from_random(bytes: [u8; CURVE25519_KEY_LENGTH]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Restore a secret key from previously exported bytes.
    pub fn from_bytes(bytes: [u8; CURVE25519_KEY_LENGTH]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Export the raw secret bytes, for pickling only.
    pub fn to_bytes(&self) -> [u8; CURVE25519_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// The matching public key.
    pub fn public_key(&self) -> Curve25519PublicKey {
        Curve25519PublicKey(x25519_dalek::PublicKey::from(&self.0).to_bytes())
    }

    /// Perform X25519 key agreement with a peer's public key.
    pub fn shared_secret(&self, their_key: &Curve25519PublicKey) -> SharedSecret {
        let their_key = x25519_dalek::PublicKey::from(their_key.0);
        SharedSecret(self.0.diffie_hellman(&their_key).to_bytes())
    }
}

impl std::fmt::Debug for Curve25519SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Curve25519SecretKey(redacted)")
    }
}

/// A Curve25519 keypair.
#[derive(Clone, Debug)]
pub struct Curve25519Keypair {
    secret_key: Curve25519SecretKey,
    public_key: Curve25519PublicKey,
}

impl Curve25519Keypair {
    /// Construct a keypair from 32 caller-supplied random bytes.
    pub fn from_random(bytes: [u8; CURVE25519_KEY_LENGTH]) -> Self {
        let secret_key = Curve25519SecretKey::from_random(bytes);
        let public_key = secret_key.public_key();
        Self { secret_key, public_key }
    }

    /// Restore a keypair from exported secret bytes.
    pub fn from_secret_bytes(bytes: [u8; CURVE25519_KEY_LENGTH]) -> Self {
        let secret_key = Curve25519SecretKey::from_bytes(bytes);
        let public_key = secret_key.public_key();
        Self { secret_key, public_key }
    }

    /// The public half of the keypair.
    pub fn public_key(&self) -> Curve25519PublicKey {
        self.public_key
    }

    /// The secret half of the keypair.
    pub fn secret_key(&self) -> &Curve25519SecretKey {
        &self.secret_key
    }

    /// Perform X25519 key agreement with a peer's public key.
    pub fn shared_secret(&self, their_key: &Curve25519PublicKey) -> SharedSecret {
        self.secret_key.shared_secret(their_key)
    }
}

/// The output of an X25519 key agreement.
///
/// Zeroized on drop.
pub struct SharedSecret([u8; CURVE25519_SHARED_SECRET_LENGTH]);

impl SharedSecret {
    /// The raw shared-secret bytes.
    pub fn as_bytes(&self) -> &[u8; CURVE25519_SHARED_SECRET_LENGTH] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(redacted)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_bytes(fill: u8) -> [u8; 32] {
        [fill; 32]
    }

    #[test]
    fn keypair_generation_is_deterministic() {
        let a = Curve25519Keypair::from_random(fixed_bytes(1));
        let b = Curve25519Keypair::from_random(fixed_bytes(1));
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn different_randomness_produces_different_keys() {
        let a = Curve25519Keypair::from_random(fixed_bytes(1));
        let b = Curve25519Keypair::from_random(fixed_bytes(2));
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let alice = Curve25519Keypair::from_random(fixed_bytes(3));
        let bob = Curve25519Keypair::from_random(fixed_bytes(4));

        let alice_shared = alice.shared_secret(&bob.public_key());
        let bob_shared = bob.shared_secret(&alice.public_key());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn secret_key_round_trips_through_bytes() {
        let keypair = Curve25519Keypair::from_random(fixed_bytes(5));
        let restored = Curve25519Keypair::from_secret_bytes(keypair.secret_key().to_bytes());
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn public_key_displays_as_hex() {
        let key = Curve25519PublicKey::from_bytes([0xAB; 32]);
        assert_eq!(key.to_string(), "ab".repeat(32));
    }
}
