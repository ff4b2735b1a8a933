//! The substitutable cipher suite
//!
//! The protocol layer never touches a concrete AEAD directly. It is
//! parameterized over [`CipherSuite`], so a different construction can
//! be swapped in without touching any ratchet or session logic.
//!
//! # Security
//!
//! Every key handed to the suite is a one-time message key: it keys
//! exactly one encryption. The standard suite exploits this by deriving
//! both the AEAD key and the nonce from the message key through HKDF,
//! which keeps encryption deterministic (no caller randomness) without
//! ever reusing a (key, nonce) pair.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{errors::CipherError, kdf::hkdf_sha256};

/// Length of a one-time message key in bytes.
pub const MESSAGE_KEY_LENGTH: usize = 32;

/// HKDF info label for expanding a message key into AEAD material.
const MESSAGE_KEYS_INFO: &[u8] = b"cinderMessageKeysV1";

/// Poly1305 tag size (16 bytes)
const POLY1305_TAG_SIZE: usize = 16;

/// An AEAD construction keyed by one-time message keys.
///
/// Implementations are stateless: all methods are associated functions.
/// `context` is the associated data binding a ciphertext to its session;
/// a ciphertext produced under one context never authenticates under
/// another.
pub trait CipherSuite {
    /// Length in bytes of the authentication tag appended to ciphertexts.
    const MAC_LENGTH: usize;

    /// Ciphertext length for a plaintext of the given length.
    fn ciphertext_length(plaintext_length: usize) -> usize;

    /// Encrypt and authenticate `plaintext` under a one-time key.
    fn encrypt(key: &[u8; MESSAGE_KEY_LENGTH], plaintext: &[u8], context: &[u8]) -> Vec<u8>;

    /// Decrypt and authenticate `input` under a one-time key.
    ///
    /// # Errors
    ///
    /// [`CipherError::MacFailure`] when the tag does not verify, the key
    /// is wrong, or the context differs from the one used to encrypt.
    fn decrypt(
        key: &[u8; MESSAGE_KEY_LENGTH],
        input: &[u8],
        context: &[u8],
    ) -> Result<Vec<u8>, CipherError>;
}

/// The standard suite: HKDF-SHA256 expansion into XChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardCipher;

impl StandardCipher {
    /// Expand a one-time message key into an AEAD key and nonce.
    fn expand_key(key: &[u8; MESSAGE_KEY_LENGTH]) -> ([u8; 32], [u8; 24]) {
        let mut okm = [0u8; 56];
        let Ok(()) = hkdf_sha256(None, key, MESSAGE_KEYS_INFO, &mut okm) else {
            unreachable!("56 bytes is a valid HKDF-SHA256 output length");
        };

        let mut aead_key = [0u8; 32];
        let mut nonce = [0u8; 24];
        aead_key.copy_from_slice(&okm[..32]);
        nonce.copy_from_slice(&okm[32..]);

        (aead_key, nonce)
    }
}

impl CipherSuite for StandardCipher {
    const MAC_LENGTH: usize = POLY1305_TAG_SIZE;

    fn ciphertext_length(plaintext_length: usize) -> usize {
        plaintext_length + POLY1305_TAG_SIZE
    }

    fn encrypt(key: &[u8; MESSAGE_KEY_LENGTH], plaintext: &[u8], context: &[u8]) -> Vec<u8> {
        let (aead_key, nonce) = Self::expand_key(key);
        let cipher = XChaCha20Poly1305::new(&aead_key.into());

        let payload = Payload { msg: plaintext, aad: context };
        let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), payload) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        ciphertext
    }

    fn decrypt(
        key: &[u8; MESSAGE_KEY_LENGTH],
        input: &[u8],
        context: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let (aead_key, nonce) = Self::expand_key(key);
        let cipher = XChaCha20Poly1305::new(&aead_key.into());

        let payload = Payload { msg: input, aad: context };
        cipher.decrypt(XNonce::from_slice(&nonce), payload).map_err(|_| CipherError::MacFailure)
    }
}
