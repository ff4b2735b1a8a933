//! Fuzz target for the group ratchet
//!
//! One sender, one recipient admitted at an arbitrary counter, then an
//! arbitrary interleaving of encryptions, deliveries, and corruptions.
//!
//! # Invariants
//!
//! - Neither side ever panics
//! - Messages at or after the recipient's join counter decrypt to the
//!   original plaintext, in any order, any number of times
//! - Messages before the join counter always fail
//! - A flipped bit anywhere in the frame fails signature verification

#![no_main]

use arbitrary::Arbitrary;
use cinder_core::{Account, GroupSession, InboundGroupSession};
use cinder_crypto::StandardCipher;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Scenario {
    account_seed: [u8; 64],
    session_seed: [u8; 64],
    /// Messages encrypted before the recipient joins (bounded).
    history: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    Encrypt { plaintext: Vec<u8> },
    Deliver { index: u8 },
    DeliverCorrupted { index: u8, bit: u8 },
}

fuzz_target!(|scenario: Scenario| {
    let Ok(account) = Account::create(&scenario.account_seed) else {
        return;
    };
    let Ok(mut sender) =
        account.create_group_session::<StandardCipher>(&scenario.session_seed)
    else {
        return;
    };

    let mut sent: Vec<(cinder_proto::GroupMessage, Vec<u8>)> = Vec::new();
    for i in 0..scenario.history.min(16) {
        let plaintext = vec![i];
        let Ok(message) = sender.encrypt(&plaintext) else {
            return;
        };
        sent.push((message, plaintext));
    }

    let join_counter = sender.message_index();
    let Ok(mut recipient) =
        InboundGroupSession::<StandardCipher>::new(&sender.session_key())
    else {
        return;
    };

    for operation in &scenario.operations {
        match operation {
            Operation::Encrypt { plaintext } => {
                let Ok(message) = sender.encrypt(plaintext) else {
                    continue;
                };
                sent.push((message, plaintext.clone()));
            }
            Operation::Deliver { index } => {
                let Some((message, plaintext)) = sent.get(*index as usize) else {
                    continue;
                };
                let result = recipient.decrypt(message);
                if message.counter < join_counter {
                    assert!(result.is_err());
                } else {
                    assert_eq!(result.as_deref().ok(), Some(plaintext.as_slice()));
                }
            }
            Operation::DeliverCorrupted { index, bit } => {
                let Some((message, _)) = sent.get(*index as usize) else {
                    continue;
                };
                let mut corrupted = message.clone();
                let encoded_len = corrupted.ciphertext.len().max(1);
                let position = *bit as usize % encoded_len;
                match corrupted.ciphertext.get_mut(position) {
                    Some(byte) => *byte ^= 0x01,
                    None => corrupted.counter ^= 1,
                }
                assert!(recipient.decrypt(&corrupted).is_err());
            }
        }
    }
});
