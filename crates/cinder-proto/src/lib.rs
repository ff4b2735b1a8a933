//! Cinder Wire Codecs
//!
//! Byte-level encodings for every frame the Cinder protocol puts on the
//! wire. The protocol layer operates on the decoded structs; nothing in
//! this crate touches key material beyond carrying public keys.
//!
//! # Frame types
//!
//! - [`Message`]: normal double-ratchet message
//! - [`PreKeyMessage`]: handshake-carrying wrapper around a [`Message`]
//! - [`SessionMessage`]: tagged union of the two, for transports that
//!   carry both over one channel
//! - [`GroupMessage`]: signed group fan-out message
//! - [`SessionKey`]: signed group-ratchet export for late joiners
//!
//! # Security
//!
//! Decoders provide structural validity only: exact length accounting,
//! version checks, and curve-point validation for embedded signing keys.
//! Authentication (AEAD tags, signatures) is verified by the protocol
//! layer after decoding.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod group;
pub mod message;

pub use errors::CodecError;
pub use group::{GROUP_RATCHET_LENGTH, GroupMessage, SessionKey};
pub use message::{Message, PROTOCOL_VERSION, PreKeyMessage, SessionMessage};
