//! Cinder Protocol Core
//!
//! The end-to-end encryption engine: account key lifecycle, pairwise
//! double-ratchet sessions, and one-way group sessions for fan-out.
//!
//! # Architecture
//!
//! An [`Account`] holds a device's long-term identity keys, a bounded
//! pool of one-time keys, and a fallback key. Publishing the public
//! halves lets any peer bootstrap a [`Session`] through a triple
//! key agreement carried in the first message; from then on the
//! session's double ratchet gives every message a fresh key and
//! tolerates reordered delivery. For one-to-many streams a
//! [`GroupSession`] runs a single signed one-way ratchet whose state
//! can be exported to admit recipients mid-stream.
//!
//! # Design Principles
//!
//! - Caller-supplied randomness: no operation reads system entropy; the
//!   required lengths are published as constants and validated before
//!   any state changes
//! - Commit after authentication: decrypting never advances ratchet
//!   state until the ciphertext has verified
//! - Explicit errors: every failure is a typed variant; see
//!   [`DecryptionError::is_permanent`] for retry guidance
//!
//! # Example
//!
//! ```
//! use cinder_core::Account;
//! use cinder_crypto::StandardCipher;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = Account::create(&[1u8; 64])?;
//! let mut bob = Account::create(&[2u8; 64])?;
//! bob.generate_one_time_keys(1, &[3u8; 32])?;
//!
//! let (_, one_time_key) = bob.one_time_keys()[0];
//! let mut alice_session = alice.create_outbound_session::<StandardCipher>(
//!     bob.identity_keys().curve25519,
//!     one_time_key,
//!     &[4u8; 64],
//! )?;
//!
//! let hello = alice_session.encrypt(b"hello", &[])?;
//! let cinder_proto::SessionMessage::PreKey(prekey) = &hello else {
//!     return Err("first message must carry the handshake".into());
//! };
//!
//! let mut bob_session = bob.create_inbound_session::<StandardCipher>(
//!     alice.identity_keys().curve25519,
//!     prekey,
//! )?;
//! assert_eq!(bob_session.decrypt(&hello)?, b"hello");
//! assert_eq!(alice_session.session_id(), bob_session.session_id());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod account;
pub mod chain;
pub mod double_ratchet;
pub mod error;
pub mod group;
pub mod randomness;
pub mod session;

pub use account::{Account, IdentityKeys, MAX_ONE_TIME_KEYS, OneTimeKey};
pub use chain::ChainIndexOverflow;
pub use double_ratchet::MAX_MESSAGE_GAP;
pub use error::{
    CreationError, DecryptionError, EncryptionError, PickleError, SessionCreationError,
    SessionKeyImportError,
};
pub use group::{GroupSession, GroupSessionId, InboundGroupSession};
pub use randomness::SEED_LENGTH;
pub use session::{Session, SessionId, SessionKeys};
