//! Generation-time evaluation of constant operands.
//!
//! Folding is carried out in `u64` with wrapping arithmetic; the generator
//! truncates the result to its storage word.

use crate::{ast::Operator, error::Error};

/// Minimal number of bits needed to represent `value`. Zero takes one bit.
pub fn min_bits(value: u64) -> u64 {
    if value == 0 {
        1
    } else {
        u64::from(u64::BITS - value.leading_zeros())
    }
}

/// All-ones mask of `width` bits.
pub fn mask(width: u64) -> u64 {
    if width >= u64::from(u64::BITS) {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Evaluates a binary operator over two constants.
///
/// # Panics
///
/// Panics for [`Operator::Assign`], [`Operator::Cast`] and [`Operator::Not`],
/// which the generator never folds through here.
pub fn fold_binary(op: Operator, lhs: u64, rhs: u64) -> Result<u64, Error> {
    let value = match op {
        Operator::Mul => lhs.wrapping_mul(rhs),
        Operator::Div => lhs.checked_div(rhs).ok_or(Error::DivisionByZero)?,
        Operator::Mod => lhs.checked_rem(rhs).ok_or(Error::DivisionByZero)?,
        Operator::Add => lhs.wrapping_add(rhs),
        Operator::Sub => lhs.wrapping_sub(rhs),
        Operator::BitAnd => lhs & rhs,
        Operator::BitOr => lhs | rhs,
        Operator::BitXor => lhs ^ rhs,
        Operator::LogicalAnd => u64::from(lhs != 0 && rhs != 0),
        Operator::LogicalOr => u64::from(lhs != 0 || rhs != 0),
        Operator::Assign | Operator::Cast | Operator::Not => {
            unreachable!("{op:?} is not a foldable binary operator")
        }
    };
    Ok(value)
}

/// Evaluates a prefix operator over a constant of `width` bits. Complement
/// stays within that width.
pub fn fold_unary(op: Operator, value: u64, width: u64) -> u64 {
    debug_assert!(op.is_prefix());
    !value & mask(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_bits() {
        assert_eq!(min_bits(0), 1);
        assert_eq!(min_bits(1), 1);
        assert_eq!(min_bits(5), 3);
        assert_eq!(min_bits(255), 8);
        assert_eq!(min_bits(256), 9);
        assert_eq!(min_bits(u64::MAX), 64);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(1), 1);
        assert_eq!(mask(3), 0b111);
        assert_eq!(mask(63), u64::MAX >> 1);
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn test_fold_arithmetic() {
        assert_eq!(fold_binary(Operator::Add, 2, 3), Ok(5));
        assert_eq!(fold_binary(Operator::Mul, 6, 7), Ok(42));
        assert_eq!(fold_binary(Operator::Div, 7, 2), Ok(3));
        assert_eq!(fold_binary(Operator::Mod, 7, 2), Ok(1));
        assert_eq!(fold_binary(Operator::Sub, 2, 3), Ok(u64::MAX));
    }

    #[test]
    fn test_fold_xor_is_exclusive_or() {
        assert_eq!(fold_binary(Operator::BitXor, 0b1100, 0b1010), Ok(0b0110));
        assert_eq!(fold_binary(Operator::BitAnd, 0b1100, 0b1010), Ok(0b1000));
    }

    #[test]
    fn test_fold_logical() {
        assert_eq!(fold_binary(Operator::LogicalAnd, 4, 0), Ok(0));
        assert_eq!(fold_binary(Operator::LogicalAnd, 4, 9), Ok(1));
        assert_eq!(fold_binary(Operator::LogicalOr, 0, 9), Ok(1));
        assert_eq!(fold_binary(Operator::LogicalOr, 0, 0), Ok(0));
    }

    #[test]
    fn test_fold_division_by_zero() {
        assert_eq!(fold_binary(Operator::Div, 1, 0), Err(Error::DivisionByZero));
        assert_eq!(fold_binary(Operator::Mod, 1, 0), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_fold_complement() {
        assert_eq!(fold_unary(Operator::Not, 0b101, min_bits(0b101)), 0b010);
        assert_eq!(fold_unary(Operator::Not, 0, min_bits(0)), 1);
        assert_eq!(fold_unary(Operator::Not, 1, 16), 0xfffe);
    }
}
