//! Property-based tests for the cipher suite and pickle container
//!
//! Verifies the structural guarantees for ALL inputs, not just specific
//! examples:
//!
//! 1. Round-trip: decrypt(encrypt(p)) == p and open(seal(v)) == v
//! 2. Rejection: any tampering, wrong key, or wrong context fails
//! 3. Robustness: arbitrary bytes never panic the openers

use cinder_crypto::{
    CipherSuite, PICKLE_KEY_LENGTH, PickleError, StandardCipher, hkdf_sha256, open, seal,
};
use proptest::prelude::*;

#[test]
fn prop_cipher_round_trip() {
    proptest!(|(
        key in any::<[u8; 32]>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        context in prop::collection::vec(any::<u8>(), 0..64),
    )| {
        let ciphertext = StandardCipher::encrypt(&key, &plaintext, &context);
        prop_assert_eq!(ciphertext.len(), StandardCipher::ciphertext_length(plaintext.len()));

        let decrypted = StandardCipher::decrypt(&key, &ciphertext, &context).unwrap();
        prop_assert_eq!(decrypted, plaintext);
    });
}

#[test]
fn prop_tampered_ciphertext_never_authenticates() {
    proptest!(|(
        key in any::<[u8; 32]>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        position in any::<prop::sample::Index>(),
    )| {
        let mut ciphertext = StandardCipher::encrypt(&key, &plaintext, b"context");
        let index = position.index(ciphertext.len());
        ciphertext[index] ^= 0x01;

        prop_assert!(StandardCipher::decrypt(&key, &ciphertext, b"context").is_err());
    });
}

#[test]
fn prop_mismatched_context_never_authenticates() {
    proptest!(|(
        key in any::<[u8; 32]>(),
        context_a in prop::collection::vec(any::<u8>(), 0..64),
        context_b in prop::collection::vec(any::<u8>(), 0..64),
    )| {
        prop_assume!(context_a != context_b);

        let ciphertext = StandardCipher::encrypt(&key, b"payload", &context_a);
        prop_assert!(StandardCipher::decrypt(&key, &ciphertext, &context_b).is_err());
    });
}

#[test]
fn prop_pickle_round_trip_is_deterministic() {
    proptest!(|(
        key in any::<[u8; PICKLE_KEY_LENGTH]>(),
        value in prop::collection::vec(any::<u8>(), 0..256),
    )| {
        let pickle = seal(&key, &value);
        prop_assert_eq!(seal(&key, &value), pickle.clone());

        let opened: Vec<u8> = open(&key, &pickle).unwrap();
        prop_assert_eq!(opened, value);
    });
}

#[test]
fn prop_pickle_rejects_the_wrong_key() {
    proptest!(|(
        key in any::<[u8; PICKLE_KEY_LENGTH]>(),
        other in any::<[u8; PICKLE_KEY_LENGTH]>(),
        value in prop::collection::vec(any::<u8>(), 0..64),
    )| {
        prop_assume!(key != other);

        let pickle = seal(&key, &value);
        let result: Result<Vec<u8>, _> = open(&other, &pickle);
        prop_assert_eq!(result, Err(PickleError::BadKey));
    });
}

#[test]
fn prop_arbitrary_pickle_bytes_never_panic() {
    proptest!(|(
        key in any::<[u8; PICKLE_KEY_LENGTH]>(),
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    )| {
        let result: Result<Vec<u8>, _> = open(&key, &bytes);
        prop_assert!(result.is_err());
    });
}

#[test]
fn prop_hkdf_is_deterministic_and_info_separated() {
    proptest!(|(
        ikm in prop::collection::vec(any::<u8>(), 1..64),
        info_a in prop::collection::vec(any::<u8>(), 0..32),
        info_b in prop::collection::vec(any::<u8>(), 0..32),
    )| {
        let mut okm_a = [0u8; 32];
        let mut okm_b = [0u8; 32];
        hkdf_sha256(None, &ikm, &info_a, &mut okm_a).unwrap();
        hkdf_sha256(None, &ikm, &info_a, &mut okm_b).unwrap();
        prop_assert_eq!(okm_a, okm_b);

        if info_a != info_b {
            hkdf_sha256(None, &ikm, &info_b, &mut okm_b).unwrap();
            prop_assert_ne!(okm_a, okm_b);
        }
    });
}
