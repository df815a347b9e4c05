//! Address, range, error and value types shared by `ixion-parse` and `ixion-eval`.
//!
//! This crate owns no behavior beyond the data model and configuration
//! types it defines - no parsing, no evaluation. It exists so the
//! parser and the interpreter agree on one vocabulary for cells, ranges,
//! tables, errors and results.

pub mod address;
pub mod config;
pub mod error;
pub mod range;
pub mod value;

pub use address::{Address, COLUMN_UNSET, ROW_UNSET};
pub use config::{
    COLUMN_UPPER_BOUND, EMPTY_STRING_ID, FormulaConfig, GLOBAL_SCOPE, INVALID_SHEET,
    ROW_UPPER_BOUND,
};
pub use error::{FormulaErrorKind, ParseFormulaErrorKind};
pub use range::{Range, TableAreas, TableHandler, TableReference};
pub use value::{FormulaResult, StringId};
