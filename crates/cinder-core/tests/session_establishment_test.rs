//! End-to-end session establishment between two accounts.

use cinder_core::{Account, Session, SessionCreationError};
use cinder_crypto::{Curve25519Keypair, StandardCipher};
use cinder_proto::SessionMessage;

fn account(fill: u8) -> Account {
    Account::create(&[fill; 64]).unwrap()
}

fn establish(
    alice: &Account,
    bob: &mut Account,
) -> (Session<StandardCipher>, Session<StandardCipher>) {
    bob.generate_one_time_keys(1, &[7; 32]).unwrap();
    let (_, one_time_key) = bob.one_time_keys()[0];

    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            one_time_key,
            &[8; 64],
        )
        .unwrap();

    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("the first message must carry the handshake");
    };

    let mut bob_session = bob
        .create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey)
        .unwrap();
    assert_eq!(bob_session.decrypt(&hello).unwrap(), b"hello");

    (alice_session, bob_session)
}

#[test]
fn both_sides_agree_on_the_session_id() {
    let alice = account(1);
    let mut bob = account(2);

    let (alice_session, bob_session) = establish(&alice, &mut bob);
    assert_eq!(
        alice_session.session_id().as_bytes(),
        bob_session.session_id().as_bytes()
    );
}

#[test]
fn conversation_flows_in_both_directions() {
    let alice = account(1);
    let mut bob = account(2);
    let (mut alice_session, mut bob_session) = establish(&alice, &mut bob);

    let reply = bob_session.encrypt(b"hi alice", &[9; 32]).unwrap();
    assert!(matches!(reply, SessionMessage::Normal(_)));
    assert_eq!(alice_session.decrypt(&reply).unwrap(), b"hi alice");

    // After hearing back, alice drops the handshake wrapper
    let followup = alice_session.encrypt(b"how are you", &[10; 32]).unwrap();
    assert!(matches!(followup, SessionMessage::Normal(_)));
    assert_eq!(bob_session.decrypt(&followup).unwrap(), b"how are you");
}

#[test]
fn inbound_session_builds_from_wire_bytes() {
    let alice = account(1);
    let mut bob = account(2);

    bob.generate_one_time_keys(1, &[7; 32]).unwrap();
    let (_, one_time_key) = bob.one_time_keys()[0];
    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            one_time_key,
            &[8; 64],
        )
        .unwrap();

    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("the first message must carry the handshake");
    };

    let mut bob_session = bob
        .create_inbound_session_from_bytes::<StandardCipher>(
            alice.identity_keys().curve25519,
            &prekey.encode(),
        )
        .unwrap();
    assert_eq!(bob_session.decrypt(&hello).unwrap(), b"hello");
}

#[test]
fn garbage_handshake_bytes_are_rejected() {
    let alice = account(1);
    let bob = account(2);

    let result = bob.create_inbound_session_from_bytes::<StandardCipher>(
        alice.identity_keys().curve25519,
        b"not a handshake",
    );
    assert!(matches!(result, Err(SessionCreationError::BadMessageFormat(_))));
}

#[test]
fn initiator_repeats_the_handshake_until_answered() {
    let alice = account(1);
    let mut bob = account(2);

    bob.generate_one_time_keys(1, &[7; 32]).unwrap();
    let (_, one_time_key) = bob.one_time_keys()[0];
    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            one_time_key,
            &[8; 64],
        )
        .unwrap();

    let first = alice_session.encrypt(b"one", &[]).unwrap();
    let second = alice_session.encrypt(b"two", &[]).unwrap();
    assert!(matches!(first, SessionMessage::PreKey(_)));
    assert!(matches!(second, SessionMessage::PreKey(_)));

    // Bob can establish from either copy of the handshake
    let SessionMessage::PreKey(prekey) = &second else {
        panic!("expected a pre-key message");
    };
    let mut bob_session = bob
        .create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey)
        .unwrap();
    assert_eq!(bob_session.decrypt(&second).unwrap(), b"two");
    assert_eq!(bob_session.decrypt(&first).unwrap(), b"one");
}

#[test]
fn matches_inbound_session_deduplicates_handshakes() {
    let alice = account(1);
    let carol = account(3);
    let mut bob = account(2);

    bob.generate_one_time_keys(2, &[7; 64]).unwrap();
    let keys = bob.one_time_keys();

    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            keys[0].1,
            &[8; 64],
        )
        .unwrap();
    let mut carol_session = carol
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            keys[1].1,
            &[9; 64],
        )
        .unwrap();

    let from_alice = alice_session.encrypt(b"a", &[]).unwrap();
    let from_carol = carol_session.encrypt(b"c", &[]).unwrap();
    let (SessionMessage::PreKey(alice_prekey), SessionMessage::PreKey(carol_prekey)) =
        (&from_alice, &from_carol)
    else {
        panic!("expected pre-key messages");
    };

    let bob_session = bob
        .create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, alice_prekey)
        .unwrap();

    assert!(bob_session.matches_inbound_session(alice_prekey));
    assert!(!bob_session.matches_inbound_session(carol_prekey));
}

#[test]
fn mismatched_identity_key_is_rejected() {
    let alice = account(1);
    let mallory = account(4);
    let mut bob = account(2);

    bob.generate_one_time_keys(1, &[7; 32]).unwrap();
    let (_, one_time_key) = bob.one_time_keys()[0];
    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            one_time_key,
            &[8; 64],
        )
        .unwrap();

    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("expected a pre-key message");
    };

    let result = bob
        .create_inbound_session::<StandardCipher>(mallory.identity_keys().curve25519, prekey);
    assert_eq!(result.err(), Some(SessionCreationError::MismatchedIdentityKey));
}

#[test]
fn unknown_one_time_key_is_rejected() {
    let alice = account(1);
    let mut bob = account(2);

    bob.generate_one_time_keys(1, &[7; 32]).unwrap();
    let (_, one_time_key) = bob.one_time_keys()[0];
    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            one_time_key,
            &[8; 64],
        )
        .unwrap();

    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("expected a pre-key message");
    };

    // The key was discarded before the handshake arrived
    bob.remove_key(&one_time_key).unwrap();

    let result =
        bob.create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey);
    assert_eq!(
        result.err(),
        Some(SessionCreationError::UnknownOneTimeKey(one_time_key))
    );
}

#[test]
fn fallback_key_answers_when_the_pool_is_exhausted() {
    let alice = account(1);
    let mut bob = account(2);

    bob.generate_fallback_key(&[7; 32]).unwrap();
    let fallback_key = bob.fallback_key().unwrap();

    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            fallback_key,
            &[8; 64],
        )
        .unwrap();
    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("expected a pre-key message");
    };

    let mut bob_session = bob
        .create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey)
        .unwrap();
    assert_eq!(bob_session.decrypt(&hello).unwrap(), b"hello");
}

#[test]
fn rotated_fallback_key_still_answers_until_forgotten() {
    let alice = account(1);
    let mut bob = account(2);

    bob.generate_fallback_key(&[7; 32]).unwrap();
    let old_fallback = bob.fallback_key().unwrap();

    let mut alice_session = alice
        .create_outbound_session::<StandardCipher>(
            bob.identity_keys().curve25519,
            old_fallback,
            &[8; 64],
        )
        .unwrap();
    let hello = alice_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("expected a pre-key message");
    };

    // One rotation keeps the old key in the previous slot
    bob.generate_fallback_key(&[9; 32]).unwrap();
    assert!(
        bob.create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey)
            .is_ok()
    );

    // Forgetting the previous slot ends the grace period
    assert!(bob.forget_fallback_key());
    let result =
        bob.create_inbound_session::<StandardCipher>(alice.identity_keys().curve25519, prekey);
    assert_eq!(
        result.err(),
        Some(SessionCreationError::UnknownOneTimeKey(old_fallback))
    );
}

#[test]
fn one_time_key_pool_evicts_oldest_beyond_capacity() {
    let mut bob = account(2);
    let capacity = bob.max_number_of_one_time_keys();

    let randomness = vec![7u8; Account::one_time_keys_random_length(capacity + 10)];
    bob.generate_one_time_keys(capacity + 10, &randomness).unwrap();

    let keys = bob.one_time_keys();
    assert_eq!(keys.len(), capacity);
    // The first ten ids were evicted
    assert_eq!(keys[0].0, 10);
}

#[test]
fn published_keys_are_no_longer_offered() {
    let mut bob = account(2);
    bob.generate_one_time_keys(3, &[7; 96]).unwrap();
    bob.generate_fallback_key(&[8; 32]).unwrap();

    assert_eq!(bob.mark_keys_as_published(), 4);
    assert!(bob.one_time_keys().is_empty());
    assert!(bob.fallback_key().is_none());

    bob.generate_one_time_keys(2, &[9; 64]).unwrap();
    assert_eq!(bob.one_time_keys().len(), 2);
}

#[test]
fn insufficient_randomness_is_reported_before_any_work() {
    let alice = account(1);
    let mut bob = account(2);

    assert!(Account::create(&[0; 10]).is_err());
    assert!(bob.generate_one_time_keys(2, &[0; 32]).is_err());
    assert!(bob.generate_fallback_key(&[0; 16]).is_err());

    let their_key = Curve25519Keypair::from_random([3; 32]).public_key();
    let result = alice.create_outbound_session::<StandardCipher>(
        bob.identity_keys().curve25519,
        their_key,
        &[0; 32],
    );
    assert_eq!(
        result.err(),
        Some(SessionCreationError::InsufficientRandomness { required: 64, provided: 32 })
    );
}

#[test]
fn fixed_randomness_scenario_round_trips_hello() {
    // Deterministic end-to-end walk: every random input is fixed, so
    // this exercises the exact same key material on every run
    let mut receiver = Account::create(&[0x41; 64]).unwrap();
    receiver
        .generate_one_time_keys(8, &vec![0x42; Account::one_time_keys_random_length(8)])
        .unwrap();

    let (key_id, one_time_key) = receiver
        .one_time_keys()
        .into_iter()
        .find(|(id, _)| *id == 7)
        .unwrap();
    assert_eq!(key_id, 7);

    let initiator = Account::create(&[0x43; 64]).unwrap();
    let mut initiator_session = initiator
        .create_outbound_session::<StandardCipher>(
            receiver.identity_keys().curve25519,
            one_time_key,
            &[0x44; 64],
        )
        .unwrap();

    let hello = initiator_session.encrypt(b"hello", &[]).unwrap();
    let SessionMessage::PreKey(prekey) = &hello else {
        panic!("expected a pre-key message");
    };

    let mut receiver_session = receiver
        .create_inbound_session::<StandardCipher>(initiator.identity_keys().curve25519, prekey)
        .unwrap();

    assert_eq!(receiver_session.decrypt(&hello).unwrap(), b"hello");
    assert_eq!(
        initiator_session.session_id().as_bytes(),
        receiver_session.session_id().as_bytes()
    );
}

#[test]
fn plaintexts_round_trip_from_empty_to_64_kib() {
    let alice = account(1);
    let mut bob = account(2);
    let (mut alice_session, mut bob_session) = establish(&alice, &mut bob);

    for length in [0usize, 1, 255, 4096, 64 * 1024] {
        let plaintext = vec![0x5A; length];
        let message = alice_session.encrypt(&plaintext, &[]).unwrap();
        assert_eq!(bob_session.decrypt(&message).unwrap(), plaintext);
    }
}

#[test]
fn signatures_verify_under_the_identity_key() {
    let alice = account(1);
    let signature = alice.sign(b"device keys");
    assert!(alice.identity_keys().ed25519.verify(b"device keys", &signature));
    assert!(!alice.identity_keys().ed25519.verify(b"other message", &signature));
}
