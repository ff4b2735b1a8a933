//! Fuzz target for every wire codec
//!
//! Decoders must never panic on arbitrary bytes: truncated frames,
//! oversized declared lengths, unknown versions, and invalid embedded
//! keys all return errors.
//!
//! Decoded values must re-encode to the exact input bytes, so the
//! codecs cannot silently accept ambiguous encodings.

#![no_main]

use cinder_proto::{GroupMessage, Message, PreKeyMessage, SessionKey, SessionMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = Message::decode(data) {
        assert_eq!(message.encode(), data);
    }
    if let Ok(message) = PreKeyMessage::decode(data) {
        assert_eq!(message.encode(), data);
    }
    if let Ok(message) = GroupMessage::decode(data) {
        assert_eq!(message.encode(), data);
    }
    if let Ok(session_key) = SessionKey::decode(data) {
        assert_eq!(session_key.encode(), data);
    }
    if let Ok(message) = SessionMessage::from_bytes(data) {
        assert_eq!(message.to_bytes(), data);
    }
});
