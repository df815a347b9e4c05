//! Formula result and interned string id.

use crate::config::EMPTY_STRING_ID;
use crate::error::FormulaErrorKind;

/// Id of a string owned by the model context's string pool, via
/// `get_string`/`add_string`/`append_string`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(pub u32);

impl StringId {
    pub const EMPTY: StringId = StringId(EMPTY_STRING_ID);
}

/// `{value: f64} | {string: interned_id} | {error: ErrorKind}`.
///
/// This is the cached result on a formula cell, produced by result
/// extraction at the end of one interpret.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormulaResult {
    Value(f64),
    String(StringId),
    Error(FormulaErrorKind),
}

impl FormulaResult {
    /// Invariant: in a reset result, `type = value AND value = 0.0`.
    pub const RESET: FormulaResult = FormulaResult::Value(0.0);

    pub const fn is_error(&self) -> bool {
        matches!(self, FormulaResult::Error(_))
    }

    pub fn error_kind(&self) -> Option<FormulaErrorKind> {
        match self {
            FormulaResult::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Numeric coercion used by comparisons and arithmetic when a cached
    /// result (rather than a raw literal) is the operand: empty cells
    /// yield 0.0, formulas yield their cached result.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaResult::Value(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_result_is_zero_value() {
        assert_eq!(FormulaResult::RESET, FormulaResult::Value(0.0));
        assert!(!FormulaResult::RESET.is_error());
    }

    #[test]
    fn error_kind_extracted_only_from_error_variant() {
        let err = FormulaResult::Error(FormulaErrorKind::DivisionByZero);
        assert_eq!(err.error_kind(), Some(FormulaErrorKind::DivisionByZero));
        assert_eq!(FormulaResult::Value(1.0).error_kind(), None);
    }
}
