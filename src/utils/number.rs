use num_traits::PrimInt;

const AUX_CARRY_MASK: u8 = 0b_0000_1111;

#[inline(always)]
pub const fn extend_sign(value: u8) -> u16 {
    value as i8 as i16 as u16
}

#[inline(always)]
pub const fn even_parity(value: u16) -> bool {
    (value as u8).count_ones() & 1 == 0
}

/// Arithmetic that reports the 8086 status bits alongside the wrapped result.
///
/// Every operation returns `(result, overflow, carry)` where `overflow` is signed
/// overflow at the width of `Self` and `carry` is the unsigned carry (or borrow).
pub trait SpecialOps: PrimInt {
    fn oc_add(self, y: Self) -> (Self, bool, bool);
    fn oc_sub(self, y: Self) -> (Self, bool, bool);

    /// Carry out of bit 3.
    fn aux_carry_add(self, y: Self) -> bool;
    /// Borrow into bit 3.
    fn aux_carry_sub(self, y: Self) -> bool;
}

macro_rules! special_uint_impl {
    (
        Self = $SelfT:ty,
        SignedT = $SignedT:ident,
    ) => {
        impl SpecialOps for $SelfT {
            #[inline]
            fn oc_add(self, y: Self) -> (Self, bool, bool) {
                let (res, carry) = self.overflowing_add(y);
                let (_, overflow) = (self as $SignedT).overflowing_add(y as $SignedT);
                (res, overflow, carry)
            }

            #[inline]
            fn oc_sub(self, y: Self) -> (Self, bool, bool) {
                let (res, carry) = self.overflowing_sub(y);
                let (_, overflow) = (self as $SignedT).overflowing_sub(y as $SignedT);
                (res, overflow, carry)
            }

            #[inline]
            fn aux_carry_add(self, y: Self) -> bool {
                (self as u8 & AUX_CARRY_MASK) + (y as u8 & AUX_CARRY_MASK) > AUX_CARRY_MASK
            }

            #[inline]
            fn aux_carry_sub(self, y: Self) -> bool {
                (self as u8 & AUX_CARRY_MASK) < (y as u8 & AUX_CARRY_MASK)
            }
        }
    }
}

special_uint_impl! {
    Self = u8,
    SignedT = i8,
}

special_uint_impl! {
    Self = u16,
    SignedT = i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_add_sets_carry_and_aux_carry() {
        assert_eq!(0xFFu8.oc_add(1), (0, false, true));
        assert!(0xFFu8.aux_carry_add(1));
        assert!(!0x10u8.aux_carry_add(0x10));
    }

    #[test]
    fn signed_overflow_by_width() {
        assert_eq!(0x7Fu8.oc_add(1), (0x80, true, false));
        assert_eq!(0x7Fu16.oc_add(1), (0x80, false, false));
        assert_eq!(0x8000u16.oc_sub(1), (0x7FFF, true, false));
        assert_eq!(0u16.oc_sub(1), (0xFFFF, false, true));
    }

    #[test]
    fn sign_extension() {
        assert_eq!(extend_sign(0xFD), 0xFFFD);
        assert_eq!(extend_sign(0x7F), 0x007F);
    }

    #[test]
    fn parity_looks_at_low_byte_only() {
        assert!(even_parity(0));
        assert!(even_parity(0x0103));
        assert!(!even_parity(0xFF01));
    }
}
