//! Encrypted, versioned state container ("pickle")
//!
//! Long-lived protocol objects persist themselves as pickles: a CBOR
//! encoding of their full state, sealed with XChaCha20-Poly1305 under a
//! caller-supplied 32-byte key. The container is opaque to storage; only
//! the version byte is visible in the clear, and it is authenticated as
//! associated data.
//!
//! Opening a pickle either fully succeeds or constructs nothing: the
//! AEAD check runs before any decoding, and decoding rejects both
//! malformed payloads and payloads with trailing bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    cipher::{CipherSuite, StandardCipher},
    errors::PickleError,
    kdf::hkdf_sha256,
};

/// Length of a pickle key in bytes.
pub const PICKLE_KEY_LENGTH: usize = 32;

/// Current pickle format version.
const PICKLE_VERSION: u8 = 1;

/// HKDF info label for expanding a pickle key.
const PICKLE_KEY_INFO: &[u8] = b"cinderPickleV1";

/// Derive the sealing key from the caller's pickle key.
///
/// The derived key is unique to this container format, so a pickle key
/// shared with another subsystem never yields the same AEAD key.
fn sealing_key(key: &[u8; PICKLE_KEY_LENGTH]) -> [u8; 32] {
    let mut sealed = [0u8; 32];
    let Ok(()) = hkdf_sha256(None, key, PICKLE_KEY_INFO, &mut sealed) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
    sealed
}

/// Serialize and encrypt a value into a pickle container.
pub fn seal<T: Serialize>(key: &[u8; PICKLE_KEY_LENGTH], value: &T) -> Vec<u8> {
    let mut payload = Vec::new();
    let Ok(()) = ciborium::ser::into_writer(value, &mut payload) else {
        unreachable!("CBOR serialization into a Vec cannot fail");
    };

    let ciphertext = StandardCipher::encrypt(&sealing_key(key), &payload, &[PICKLE_VERSION]);

    let mut pickle = Vec::with_capacity(1 + ciphertext.len());
    pickle.push(PICKLE_VERSION);
    pickle.extend_from_slice(&ciphertext);
    pickle
}

/// Decrypt and deserialize a pickle container.
///
/// # Errors
///
/// - [`PickleError::InputTooShort`] when the container cannot hold a
///   version byte and an authentication tag
/// - [`PickleError::UnknownVersion`] for an unsupported format version
/// - [`PickleError::BadKey`] when decryption fails (wrong key or
///   corrupted container)
/// - [`PickleError::InvalidEncoding`] when the payload is not valid CBOR
///   for the target type
/// - [`PickleError::TrailingData`] when bytes remain after a complete
///   value
pub fn open<T: DeserializeOwned>(
    key: &[u8; PICKLE_KEY_LENGTH],
    pickle: &[u8],
) -> Result<T, PickleError> {
    if pickle.len() <= StandardCipher::MAC_LENGTH {
        return Err(PickleError::InputTooShort { length: pickle.len() });
    }

    let version = pickle[0];
    if version != PICKLE_VERSION {
        return Err(PickleError::UnknownVersion(version));
    }

    let payload = StandardCipher::decrypt(&sealing_key(key), &pickle[1..], &[version])
        .map_err(|_| PickleError::BadKey)?;

    let mut cursor = std::io::Cursor::new(payload.as_slice());
    let value: T =
        ciborium::de::from_reader(&mut cursor).map_err(|_| PickleError::InvalidEncoding)?;

    let consumed = cursor.position() as usize;
    if consumed != payload.len() {
        return Err(PickleError::TrailingData { remaining: payload.len() - consumed });
    }

    Ok(value)
}
