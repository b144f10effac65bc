//! Type Compatibility Table
//!
//! The static table mapping `(left type, right type, operator)` to a result
//! type. It is a pure function: total over the whole type and operator sets,
//! deterministic, and it answers `ScalarType::Error` for every combination
//! the language does not define instead of failing.
//!
//! Assignment permits exactly one implicit conversion: an integer source may
//! widen into a float target. The narrowing direction is rejected.

use quad_common::{Operator, ScalarType};

/// Result type of applying `op` to operands of type `left` and `right`.
///
/// `ScalarType::Error` marks any undefined combination, including operators
/// that never appear inside expressions (jumps, call linkage, `print`).
pub fn result_type(left: ScalarType, right: ScalarType, op: Operator) -> ScalarType {
    use ScalarType::{Boolean, Float, Integer};

    if op.is_arithmetic() {
        return match (left, right) {
            (Integer, Integer) => Integer,
            (Integer, Float) | (Float, Integer) | (Float, Float) => Float,
            _ => ScalarType::Error,
        };
    }

    if op.is_relational() {
        return match (left, right) {
            (Integer | Float, Integer | Float) => Boolean,
            (Boolean, Boolean) if matches!(op, Operator::Eq | Operator::Ne) => Boolean,
            _ => ScalarType::Error,
        };
    }

    if op.is_boolean() {
        return match (left, right) {
            (Boolean, Boolean) => Boolean,
            _ => ScalarType::Error,
        };
    }

    if op == Operator::Assign {
        // left is the target, right the source; widening only
        return match (left, right) {
            (Integer, Integer) => Integer,
            (Float, Float) | (Float, Integer) => Float,
            (Boolean, Boolean) => Boolean,
            _ => ScalarType::Error,
        };
    }

    ScalarType::Error
}

/// Whether `op` is defined for operands of type `left` and `right`
pub fn is_valid(left: ScalarType, right: ScalarType, op: Operator) -> bool {
    result_type(left, right, op) != ScalarType::Error
}
