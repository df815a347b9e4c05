//! Ixion: an embeddable spreadsheet formula engine.
//!
//! This crate is the facade over three lower-level crates:
//!
//! - [`ixion_common`] - addresses, ranges, the error taxonomy, formula
//!   results and the global configuration constants.
//! - [`ixion_parse`] - the lexer, the five-dialect name resolver, and the
//!   parser producing a [`FormulaToken`] stream.
//! - [`ixion_eval`] - the token interpreter, built-in functions, the
//!   dependency tracker and the worker-pool recompute engine.
//!
//! An embedder implements [`ModelContext`] over its own cell storage; this
//! crate also ships [`Workbook`]/[`Engine`], an in-memory implementation
//! good enough for tests and small workbooks.

pub mod engine;

pub use engine::{Engine, Workbook};

pub use ixion_common::{
    Address, FormulaConfig, FormulaErrorKind, FormulaResult, ParseFormulaErrorKind, Range,
    StringId, TableAreas, TableHandler, TableReference, COLUMN_UNSET, COLUMN_UPPER_BOUND,
    EMPTY_STRING_ID, GLOBAL_SCOPE, INVALID_SHEET, ROW_UNSET, ROW_UPPER_BOUND,
};
pub use ixion_parse::resolver::{format_column, parse_column};
pub use ixion_parse::{
    format_address, format_range, parse_formula_string, resolve, Dialect, FormulaToken,
    FunctionOpcode, NameType, ParseError, ParserOptions, SheetResolver, StringInterner, TokenStore,
};
pub use ixion_eval::{
    interpret, CellQueueManager, CellStatus, CellType, DependencyTracker, ListenerTarget,
    ListenerTracker, MatrixCell, MatrixValue, ModelContext, PoolError, Schedule, SessionHandler,
};
