//! Fuzz target for the encrypted pickle container
//!
//! Opening arbitrary bytes as any pickled protocol object must return
//! an error, never panic or construct a partial object. Without the
//! sealing key, forging a pickle that opens successfully amounts to
//! forging an AEAD tag, so virtually every input exercises the error
//! paths.

#![no_main]

use arbitrary::Arbitrary;
use cinder_core::{Account, GroupSession, InboundGroupSession, Session};
use cinder_crypto::{PICKLE_KEY_LENGTH, StandardCipher};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct PickleInput {
    key: [u8; PICKLE_KEY_LENGTH],
    bytes: Vec<u8>,
}

fuzz_target!(|input: PickleInput| {
    let _ = Account::from_pickle(&input.bytes, &input.key);
    let _ = Session::<StandardCipher>::from_pickle(&input.bytes, &input.key);
    let _ = GroupSession::<StandardCipher>::from_pickle(&input.bytes, &input.key);
    let _ = InboundGroupSession::<StandardCipher>::from_pickle(&input.bytes, &input.key);
});
