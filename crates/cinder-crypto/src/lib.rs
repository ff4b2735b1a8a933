//! Cinder Cryptographic Primitives
//!
//! Primitive wrappers and substitutable contracts for the Cinder ratchet
//! protocol. Pure functions with deterministic outputs. Callers provide
//! random bytes for deterministic testing.
//!
//! # Contracts
//!
//! The protocol layer consumes four collaborator contracts, all defined
//! here so a concrete primitive can be swapped without touching any
//! ratchet or session logic:
//!
//! - Key agreement: X25519 ([`Curve25519Keypair`], [`SharedSecret`])
//! - Signatures: Ed25519 ([`Ed25519Keypair`], [`Ed25519Signature`])
//! - KDF: HKDF-SHA256 ([`hkdf_sha256`])
//! - AEAD: the [`CipherSuite`] trait with its standard
//!   XChaCha20-Poly1305 implementation ([`StandardCipher`])
//!
//! # Security
//!
//! - Secret key material (secret keys, shared secrets) is zeroized on
//!   drop and never printed by `Debug` implementations
//! - Message keys are one-time: the standard suite derives both the AEAD
//!   key and nonce from them, so no nonce is ever reused
//! - The pickle container ([`seal`]/[`open`]) authenticates its version
//!   byte and either fully decodes or constructs nothing

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod curve;
pub mod errors;
pub mod kdf;
pub mod pickle;
pub mod sign;

pub use cipher::{CipherSuite, MESSAGE_KEY_LENGTH, StandardCipher};
pub use curve::{
    CURVE25519_KEY_LENGTH, CURVE25519_SHARED_SECRET_LENGTH, Curve25519Keypair,
    Curve25519PublicKey, Curve25519SecretKey, SharedSecret,
};
pub use errors::{CipherError, KdfError, PickleError, SignatureError};
pub use kdf::hkdf_sha256;
pub use pickle::{PICKLE_KEY_LENGTH, open, seal};
pub use sign::{
    ED25519_KEY_LENGTH, ED25519_SIGNATURE_LENGTH, Ed25519Keypair, Ed25519PublicKey,
    Ed25519Signature,
};
