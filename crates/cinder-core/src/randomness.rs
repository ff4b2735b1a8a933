//! Caller-supplied randomness handling
//!
//! No operation in this crate generates entropy. Callers pass an opaque
//! byte buffer; operations validate the length up front (before any
//! state mutation) and then carve fixed-size seeds out of it. Required
//! lengths are published as constants so callers can size buffers in
//! advance.

/// Length of a single key seed in bytes.
pub const SEED_LENGTH: usize = 32;

/// Carve the `index`-th 32-byte seed out of a pre-validated buffer.
///
/// Callers must have checked the buffer length already; a short buffer
/// here is a bug in this crate, not caller error.
pub(crate) fn seed(randomness: &[u8], index: usize) -> [u8; SEED_LENGTH] {
    let offset = index * SEED_LENGTH;
    let Ok(seed) = randomness[offset..offset + SEED_LENGTH].try_into() else {
        unreachable!("randomness length was validated before carving seeds");
    };
    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_carved_sequentially() {
        let mut randomness = [0u8; 64];
        randomness[..32].fill(0xAA);
        randomness[32..].fill(0xBB);

        assert_eq!(seed(&randomness, 0), [0xAA; 32]);
        assert_eq!(seed(&randomness, 1), [0xBB; 32]);
    }
}
