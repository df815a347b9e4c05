//! The façade the core consumes to read/write cells, strings and sheets.
//! The concrete storage backend lives outside this crate; everything here
//! is a trait the embedder implements once over its own columnar model.

use ixion_common::{Address, FormulaConfig, FormulaResult, Range, StringId, TableHandler};
use ixion_parse::token::{FormulaToken, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Empty,
    Numeric,
    String,
    Formula,
    Unknown,
}

/// Consumed by the interpreter, the dependency tracker and the cell queue
/// manager. Readers (interpreter threads) vastly outnumber writers; any
/// implementation must let `get_*`/`is_empty`/`get_celltype` run
/// concurrently, excluding writers only at the quiescent points between
/// recompute batches.
pub trait ModelContext: Send + Sync {
    fn get_config(&self) -> FormulaConfig;

    fn is_empty(&self, addr: Address) -> bool;
    fn get_celltype(&self, addr: Address) -> CellType;
    fn get_numeric_value(&self, addr: Address) -> f64;
    fn get_string_identifier(&self, addr: Address) -> StringId;
    fn get_formula_cell(&self, addr: Address) -> Option<FormulaResult>;

    fn get_string(&self, id: StringId) -> Option<String>;
    fn add_string(&self, text: &str) -> StringId;
    fn append_string(&self, id: StringId, text: &str) -> StringId;

    /// `sheet = None` looks the name up in the global scope.
    fn get_named_expression(&self, sheet: Option<i32>, name: &str) -> Option<TokenStore>;

    fn get_formula_tokens(&self, addr: Address) -> Option<TokenStore>;
    fn get_shared_formula_tokens(&self, addr: Address) -> Option<TokenStore>;
    fn get_shared_formula_range(&self, addr: Address) -> Option<Range>;

    fn get_sheet_name(&self, sheet: i32) -> Option<String>;
    fn get_sheet_index(&self, name: &str) -> Option<i32>;
    fn get_sheet_size(&self, sheet: i32) -> Option<(i32, i32)>;
    fn sheet_count(&self) -> i32;

    fn get_table_handler(&self) -> Option<&dyn TableHandler>;

    /// A fresh observer for one cell's interpret, or `None` if nobody is
    /// tracing this recompute.
    fn create_session_handler(&self) -> Option<Box<dyn SessionHandler>>;

    /// Publish a cell's freshly computed result. Must be atomic relative
    /// to concurrent readers - a reader never observes a half-written
    /// `FormulaResult`.
    fn set_result(&self, addr: Address, result: FormulaResult);
}

/// An observer invoked per-token during interpretation, used for tracing.
/// Created per-cell-interpret and dropped at end-of-cell.
pub trait SessionHandler: Send {
    fn on_token(&mut self, token: &FormulaToken);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTarget {
    Point(Address),
    Range(Range),
}

/// The inverse of the dependency edge set: given a modified cell, find
/// every listener registered against it (as a point or as part of a
/// range) so the tracker can compute the dirty set.
pub trait ListenerTracker {
    fn add(&mut self, listener_cell: Address, target: ListenerTarget);
    fn remove(&mut self, listener_cell: Address, target: ListenerTarget);
    fn get_all_listeners(&self, modified: Address, out_listeners: &mut Vec<Address>);
}
