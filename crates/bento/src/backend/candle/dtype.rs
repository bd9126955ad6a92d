//! Dtype promotion for the candle backend.
//!
//! candle itself refuses binary ops on mismatched dtypes. Comparisons still
//! need a common dtype, so both sides are cast to the result of [`promote`]
//! first. Arithmetic does not promote: a mismatch stays a candle error.

use candle_core::DType;

const ORDER: [DType; 7] = [DType::U8, DType::U32, DType::I64, DType::BF16, DType::F16, DType::F32, DType::F64];

/// Rows and columns follow `ORDER`
const PROMOTION: [[DType; 7]; 7] = {
    use DType::*;
    [
        [U8, U32, I64, BF16, F16, F32, F64],
        [U32, U32, I64, F64, F64, F64, F64],
        [I64, I64, I64, F64, F64, F64, F64],
        [BF16, F64, F64, BF16, F32, F32, F64],
        [F16, F64, F64, F32, F16, F32, F64],
        [F32, F64, F64, F32, F32, F32, F64],
        [F64, F64, F64, F64, F64, F64, F64],
    ]
};

fn slot(dtype: DType) -> Option<usize> {
    ORDER.iter().position(|&d| d == dtype)
}

/// Common dtype of two operands; unknown dtypes meet in `F64`
pub fn promote(lhs: DType, rhs: DType) -> DType {
    match (slot(lhs), slot(rhs)) {
        (Some(l), Some(r)) => PROMOTION[l][r],
        _ if lhs == rhs => lhs,
        _ => DType::F64,
    }
}

pub(crate) fn is_int(dtype: DType) -> bool {
    matches!(dtype, DType::U8 | DType::U32 | DType::I64)
}

/// Dtype used when an operation needs floats
pub(crate) fn float_for(dtype: DType) -> DType {
    if dtype.is_float() { dtype } else { DType::F32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion() {
        for a in ORDER {
            assert_eq!(promote(a, a), a);
            for b in ORDER {
                assert_eq!(promote(a, b), promote(b, a));
            }
        }
        assert_eq!(promote(DType::U8, DType::F32), DType::F32);
        assert_eq!(promote(DType::I64, DType::F32), DType::F64);
        assert_eq!(promote(DType::BF16, DType::F16), DType::F32);
    }

    #[test]
    fn test_float_for() {
        assert_eq!(float_for(DType::U32), DType::F32);
        assert_eq!(float_for(DType::F16), DType::F16);
        assert!(is_int(DType::U8));
        assert!(!is_int(DType::F64));
    }
}
