//! Overflow-checked `i32` arithmetic
//!
//! Each helper reports the out-of-range result instead of wrapping.

use crate::error::{FlowSimError, Result};

pub fn checked_add(a: i32, b: i32) -> Result<i32> {
    a.checked_add(b)
        .ok_or_else(|| FlowSimError::overflow(i64::from(a) + i64::from(b)))
}

pub fn checked_sub(a: i32, b: i32) -> Result<i32> {
    a.checked_sub(b)
        .ok_or_else(|| FlowSimError::overflow(i64::from(a) - i64::from(b)))
}

pub fn checked_mul(a: i32, b: i32) -> Result<i32> {
    a.checked_mul(b)
        .ok_or_else(|| FlowSimError::overflow(i64::from(a) * i64::from(b)))
}

/// Truncating division; `i32::MIN / -1` is the only overflowing case
pub fn checked_div(a: i32, b: i32) -> Result<i32> {
    if b == 0 {
        return Err(FlowSimError::DivisionByZero);
    }
    a.checked_div(b)
        .ok_or_else(|| FlowSimError::overflow(i64::from(a) / i64::from(b)))
}

/// Convert a float result to `i32`, truncating toward zero
///
/// Anything outside `[i32::MIN, i32::MAX]`, infinities included, is an
/// overflow. NaN is rejected as well since it has no integer value.
pub fn to_i32(value: f64) -> Result<i32> {
    if value.is_nan() {
        return Err(FlowSimError::overflow(value));
    }
    if value > f64::from(i32::MAX) || value < f64::from(i32::MIN) {
        return Err(FlowSimError::overflow(value));
    }
    Ok(value.trunc() as i32)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(checked_add(100, 200).unwrap(), 300);
        assert!(matches!(
            checked_add(i32::MAX, 1),
            Err(FlowSimError::Overflow(_))
        ));
        assert!(checked_add(i32::MIN, -1).is_err());
    }

    #[test]
    fn test_sub() {
        assert_eq!(checked_sub(5, 7).unwrap(), -2);
        assert!(checked_sub(i32::MIN, 1).is_err());
        assert!(checked_sub(0, i32::MIN).is_err());
    }

    #[test]
    fn test_mul() {
        assert_eq!(checked_mul(100, 20).unwrap(), 2000);
        assert!(checked_mul(i32::MAX / 2 + 1, 2).is_err());
        assert_eq!(checked_mul(-3, 4).unwrap(), -12);
    }

    #[test]
    fn test_div() {
        assert_eq!(checked_div(7, 2).unwrap(), 3);
        assert_eq!(checked_div(-7, 2).unwrap(), -3);
        assert!(matches!(checked_div(1, 0), Err(FlowSimError::DivisionByZero)));
        assert!(matches!(
            checked_div(i32::MIN, -1),
            Err(FlowSimError::Overflow(_))
        ));
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(to_i32(1240.7).unwrap(), 1240);
        assert_eq!(to_i32(-1240.7).unwrap(), -1240);
        assert_eq!(to_i32(2147483647.0).unwrap(), i32::MAX);
        assert_eq!(to_i32(-2147483648.0).unwrap(), i32::MIN);
        assert!(to_i32(2147483648.0).is_err());
        assert!(to_i32(-2147483649.0).is_err());
        assert!(to_i32(f64::INFINITY).is_err());
        assert!(to_i32(f64::NAN).is_err());
    }
}
