//! Fixed-point helpers for the calibration math.
//!
//! The IQK result registers hold 10-bit two's-complement fields, and the
//! gain-correction multiplies are carried out in Q1.16 with truncating
//! conversion down to the register widths. All of the downstream calibration
//! math depends on the exact truncation (not rounding) behaviour here.

/// Sign-extend the field of `val` spanning bits `msb..=lsb` into an `i32`.
pub const fn bits_to_s32(val: i32, msb: u32, lsb: u32) -> i32 {
    (val << (31 - msb)) >> (31 - msb + lsb)
}

/// Truncate a Q1.16 product down to Q1.8.
pub const fn q16_to_q8(q16: i32) -> i32 {
    q16 >> 8
}

/// Truncate a Q1.16 product down to Q1.9.
pub const fn q16_to_q9(q16: i32) -> i32 {
    q16 >> 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extend_10_bit() {
        // Positive values below the sign bit are unchanged.
        assert_eq!(bits_to_s32(0x000, 9, 0), 0);
        assert_eq!(bits_to_s32(0x001, 9, 0), 1);
        assert_eq!(bits_to_s32(0x1ff, 9, 0), 511);
        // Bit 8 alone stays positive, only bit 9 carries the sign.
        assert_eq!(bits_to_s32(0x100, 9, 0), 256);
        // Sign bit set: two's complement wrap.
        assert_eq!(bits_to_s32(0x200, 9, 0), -512);
        assert_eq!(bits_to_s32(0x3ff, 9, 0), -1);
    }

    #[test]
    fn sign_extend_full_10_bit_range() {
        for raw in 0..0x400 {
            let ext = bits_to_s32(raw, 9, 0);
            assert!((-512..=511).contains(&ext));
            // Re-packing the low 10 bits must reproduce the raw field.
            assert_eq!(ext & 0x3ff, raw);
        }
    }

    #[test]
    fn sign_extend_sub_field() {
        // Field in bits 9..=4 of a wider word.
        assert_eq!(bits_to_s32(0x3f0, 9, 4), -1);
        assert_eq!(bits_to_s32(0x1f0, 9, 4), 31);
        // Bits below the lsb are discarded.
        assert_eq!(bits_to_s32(0x1ff, 9, 4), 31);
    }

    #[test]
    fn q16_truncates_towards_negative_infinity() {
        assert_eq!(q16_to_q8(0x100), 1);
        assert_eq!(q16_to_q8(0x1ff), 1);
        assert_eq!(q16_to_q8(-0x100), -1);
        // Arithmetic shift, not division: -0x101 >> 8 == -2.
        assert_eq!(q16_to_q8(-0x101), -2);
        assert_eq!(q16_to_q9(0x80), 1);
        assert_eq!(q16_to_q9(0xff), 1);
        assert_eq!(q16_to_q9(-0x81), -2);
    }

    #[test]
    fn q8_q9_relationship() {
        for v in [-0x40000, -0x1234, -1, 0, 1, 0x1234, 0x40000] {
            // q9 keeps one extra fractional bit below the q8 value.
            assert_eq!(q16_to_q9(v) >> 1, q16_to_q8(v));
        }
    }
}
