#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Extracts the inclusive bit range `[lo, hi]` of `word`, right-aligned.
///
/// Returns 0 when `hi < lo`, when `lo` is negative or when the field would be wider
/// than 32 bits.
#[must_use]
pub const fn bit_slice(word: u32, hi: i32, lo: i32) -> u32 {
    if lo < 0 || hi > 31 || hi < lo {
        return 0;
    }
    let width = hi - lo + 1;
    let mask = if width == 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    };
    (word >> lo) & mask
}

/// Single-bit flag helper.
#[must_use]
pub const fn bit_set(word: u32, bit: i32) -> bool {
    bit_slice(word, bit, bit) == 1
}

/// Reinterprets a raw little-endian byte blob as a sequence of `f32`.
///
/// A trailing partial word is dropped.
#[must_use]
pub fn floats_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[must_use]
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let b = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[must_use]
pub fn read_u64_le(bytes: &[u8], offset: usize) -> Option<u64> {
    let end = offset.checked_add(8)?;
    let b = bytes.get(offset..end)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(b);
    Some(u64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(word: u32, hi: i32, lo: i32) -> u32 {
        let width = (hi - lo + 1) as u32;
        let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
        (word >> lo) & mask
    }

    #[test]
    fn bit_slice_matches_shift_and_mask_for_all_ranges() {
        for &word in &[0u32, u32::MAX, 0xDEAD_BEEF, 0x0C80_1234, 0x8000_0001] {
            for lo in 0..32 {
                for hi in lo..32 {
                    assert_eq!(bit_slice(word, hi, lo), reference(word, hi, lo));
                }
            }
        }
    }

    #[test]
    fn bit_slice_fails_soft() {
        assert_eq!(bit_slice(u32::MAX, 3, 4), 0);
        assert_eq!(bit_slice(u32::MAX, 40, 0), 0);
        assert_eq!(bit_slice(u32::MAX, 5, -1), 0);
        assert_eq!(bit_slice(u32::MAX, i32::MAX, 0), 0);
        assert_eq!(bit_slice(u32::MAX, 0, i32::MIN), 0);
        assert_eq!(bit_slice(u32::MAX, i32::MIN, i32::MAX), 0);
        assert_eq!(bit_slice(0xFFFF_FFFF, 31, 0), u32::MAX);
    }

    #[test]
    fn bit_set_reads_single_flags() {
        assert!(bit_set(1 << 18, 18));
        assert!(!bit_set(1 << 18, 17));
    }

    #[test]
    fn floats_drop_partial_tail() {
        let mut bytes = 1.5f32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&42.0f32.to_le_bytes());
        bytes.push(0xAA);
        assert_eq!(floats_from_le_bytes(&bytes), vec![1.5, 42.0]);
    }

    #[test]
    fn le_readers_are_bounds_checked() {
        let bytes = [0x00, 0x10, 0x00, 0x00, 0x01];
        assert_eq!(read_u32_le(&bytes, 0), Some(0x1000));
        assert_eq!(read_u32_le(&bytes, 2), None);
        assert_eq!(read_u64_le(&bytes, 0), None);
        assert_eq!(read_u32_le(&bytes, usize::MAX), None);
    }
}
