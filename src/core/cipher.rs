//! Position-keyed XOR stream cipher protecting the message text section.

/// Fixed 16-byte key baked into the original engine.
pub const KEY: &[u8; 16] = b"IanLanceTaylorJr";

/// Decrypt `data`, treating its first byte as absolute stream position `offset`.
///
/// Each byte is XORed with `KEY[x % 16]` and with the low byte of `x`, where
/// `x` starts at `offset` and advances by one per byte. The transform is its
/// own inverse.
pub fn decrypt(data: &[u8], offset: usize) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, &b)| {
            let x = offset.wrapping_add(i);
            b ^ KEY[x & 0xf] ^ (x & 0xff) as u8
        })
        .collect()
}

/// Encrypt `data` at stream position `offset`. Same transform as [`decrypt`].
pub fn encrypt(data: &[u8], offset: usize) -> Vec<u8> {
    decrypt(data, offset)
}

/// Fraction of bytes that look like decrypted text (printable ASCII, tab,
/// newline, carriage return or NUL). Returns 0.0 for an empty slice.
pub fn printable_ratio(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let printable = data
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || matches!(b, 0 | 9 | 10 | 13))
        .count();
    printable as f64 / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_byte_uses_key_and_position() {
        // position 0: key 'I' (0x49), position byte 0
        assert_eq!(decrypt(&[0x49], 0), vec![0x00]);
        // position 17: key 'a' (0x61), position byte 0x11
        assert_eq!(decrypt(&[0x00], 17), vec![0x61 ^ 0x11]);
    }

    #[test]
    fn position_wraps_at_256() {
        let a = decrypt(&[0x55], 3);
        let b = decrypt(&[0x55], 3 + 256);
        assert_eq!(a, b);
        let c = decrypt(&[0x55], 3 + 16);
        assert_ne!(a, c);
    }

    #[test]
    fn involution_at_nonzero_offset() {
        let plain = b"You are in an open field west of a big white house.\0";
        let enc = encrypt(plain, 1234);
        assert_ne!(enc.as_slice(), &plain[..]);
        assert_eq!(decrypt(&enc, 1234), plain.to_vec());
    }

    #[test]
    fn split_decrypt_matches_whole() {
        let plain: Vec<u8> = (0u8..=200).collect();
        let enc = encrypt(&plain, 0);
        let mut pieces = decrypt(&enc[..77], 0);
        pieces.extend(decrypt(&enc[77..], 77));
        assert_eq!(pieces, plain);
    }

    #[test]
    fn printable_ratio_counts_text_bytes() {
        assert_eq!(printable_ratio(&[]), 0.0);
        assert_eq!(printable_ratio(b"abc\0"), 1.0);
        assert!((printable_ratio(&[b'a', 0xff]) - 0.5).abs() < f64::EPSILON);
    }
}
