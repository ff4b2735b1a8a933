//! HKDF-SHA256 key derivation

use hkdf::Hkdf;
use sha2::Sha256;

use crate::errors::KdfError;

/// Expand input key material into `okm.len()` output bytes.
///
/// Deterministic given identical inputs. An absent salt is treated as a
/// string of zeros per RFC 5869.
///
/// # Errors
///
/// Fails with [`KdfError::InvalidOutputLength`] when `okm` exceeds the
/// HKDF-SHA256 maximum of 255 * 32 bytes.
pub fn hkdf_sha256(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    okm: &mut [u8],
) -> Result<(), KdfError> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key_material);
    hkdf.expand(info, okm).map_err(|_| KdfError::InvalidOutputLength { requested: okm.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_is_deterministic() {
        let mut first = [0u8; 64];
        let mut second = [0u8; 64];

        hkdf_sha256(Some(b"salt"), b"ikm", b"info", &mut first).unwrap();
        hkdf_sha256(Some(b"salt"), b"ikm", b"info", &mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn different_info_produces_different_output() {
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];

        hkdf_sha256(None, b"ikm", b"first", &mut first).unwrap();
        hkdf_sha256(None, b"ikm", b"second", &mut second).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn matches_rfc_5869_test_case_1() {
        let ikm = hex::decode("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b").unwrap();
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let mut okm = [0u8; 42];
        hkdf_sha256(Some(&salt), &ikm, &info, &mut okm).unwrap();

        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn oversized_output_is_rejected() {
        let mut okm = vec![0u8; 255 * 32 + 1];
        let result = hkdf_sha256(None, b"ikm", b"info", &mut okm);
        assert!(matches!(result, Err(KdfError::InvalidOutputLength { .. })));
    }
}
