//! Single-byte XOR checksum used by packets and frames.
//!
//! # What an XOR checksum catches (for beginners)
//!
//! XOR-folding every byte of a payload produces one byte in which each bit is
//! the parity of that bit position across the whole payload.  Any single-bit
//! flip in transit changes the result, so a receiver that recomputes the fold
//! and compares it with the transmitted byte notices the corruption.
//!
//! It is **not** an integrity guarantee: two flips in the same bit position
//! cancel out, byte reordering is invisible, and an attacker can trivially
//! forge a matching value.  It exists to reject line noise on a serial link.

/// XOR-folds `bytes` into a single byte.
///
/// An empty slice yields `0`.
///
/// # Examples
///
/// ```rust
/// use wuart_core::protocol::checksum::xor_checksum;
///
/// assert_eq!(xor_checksum(&[]), 0);
/// assert_eq!(xor_checksum(&[0x0F, 0xF0]), 0xFF);
/// ```
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_yields_zero() {
        assert_eq!(xor_checksum(&[]), 0);
    }

    #[test]
    fn test_single_byte_is_its_own_checksum() {
        assert_eq!(xor_checksum(&[0xA5]), 0xA5);
    }

    #[test]
    fn test_known_packet_payload() {
        // Arrange – "key1" serialized with no value
        let payload = b"key1";

        // Act
        let sum = xor_checksum(payload);

        // Assert – 'k' ^ 'e' ^ 'y' ^ '1'
        assert_eq!(sum, 0x6B ^ 0x65 ^ 0x79 ^ 0x31);
    }

    #[test]
    fn test_repeated_byte_pair_cancels_to_zero() {
        // A legitimate payload may fold to zero; the checksum does not reserve it.
        assert_eq!(xor_checksum(b"aa"), 0);
    }

    proptest! {
        #[test]
        fn prop_checksum_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(xor_checksum(&bytes), xor_checksum(&bytes));
        }

        #[test]
        fn prop_checksum_ignores_byte_order(mut bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let before = xor_checksum(&bytes);
            bytes.reverse();
            prop_assert_eq!(xor_checksum(&bytes), before);
        }

        #[test]
        fn prop_appending_checksum_folds_to_zero(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut framed = bytes.clone();
            framed.push(xor_checksum(&bytes));
            prop_assert_eq!(xor_checksum(&framed), 0);
        }
    }
}
