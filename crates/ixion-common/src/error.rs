//! The user-visible formula error taxonomy.
//!
//! This is a closed, `Copy` enum - one kind per result, matched
//! exhaustively everywhere it's consumed: no trait objects, no open set
//! of error kinds.

use std::fmt;
use std::str::FromStr;

/// One kind per formula result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaErrorKind {
    /// Success - not actually an error, included so a `FormulaResult` can
    /// carry "no error" without a separate `Option` wrapper at call sites
    /// that pattern-match the kind.
    NoError,
    /// Self-reference, cycle participant, or dangling reference.
    RefResultNotAvailable,
    /// `x / 0`.
    DivisionByZero,
    /// Parser/interpreter syntactic failure, type mismatch, premature end
    /// of tokens.
    InvalidExpression,
    /// A named expression does not resolve.
    NameNotFound,
    /// Catch-all, including unknown function opcode.
    GeneralError,
}

impl FormulaErrorKind {
    /// Printable form.
    pub const fn as_str(self) -> &'static str {
        match self {
            FormulaErrorKind::NoError => "",
            FormulaErrorKind::RefResultNotAvailable => "#REF!",
            FormulaErrorKind::DivisionByZero => "#DIV/0!",
            FormulaErrorKind::InvalidExpression => "#VALUE!",
            FormulaErrorKind::NameNotFound => "#NAME?",
            FormulaErrorKind::GeneralError => "#ERROR!",
        }
    }
}

impl fmt::Display for FormulaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed to parse a textual error code back into a [`FormulaErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFormulaErrorKind(pub String);

impl fmt::Display for ParseFormulaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized formula error text: {:?}", self.0)
    }
}

impl std::error::Error for ParseFormulaErrorKind {}

impl FromStr for FormulaErrorKind {
    type Err = ParseFormulaErrorKind;

    /// Parsing the same strings re-inflates the error kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(FormulaErrorKind::NoError),
            "#REF!" => Ok(FormulaErrorKind::RefResultNotAvailable),
            "#DIV/0!" => Ok(FormulaErrorKind::DivisionByZero),
            "#VALUE!" => Ok(FormulaErrorKind::InvalidExpression),
            "#NAME?" => Ok(FormulaErrorKind::NameNotFound),
            "#ERROR!" => Ok(FormulaErrorKind::GeneralError),
            other => Err(ParseFormulaErrorKind(other.to_string())),
        }
    }
}
