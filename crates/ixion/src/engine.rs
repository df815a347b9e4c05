//! An in-memory workbook and the recompute engine built on top of it.
//!
//! This is the "test workbook" the crate ships for its own integration
//! suite (and for embedders who want a reference before writing a real
//! columnar backend). It keeps every cell behind a [`DashMap`] and every
//! formula's tokens behind an `Arc`, adequate for tests and small
//! workbooks, not for a production spreadsheet.

use std::sync::Mutex;

use dashmap::DashMap;
use rustc_hash::FxHashSet;

use ixion_common::{Address, FormulaConfig, FormulaResult, Range, StringId, TableHandler, TableReference};
use ixion_eval::{CellQueueManager, CellType, DependencyTracker, ModelContext, PoolError, Schedule, SessionHandler};
use ixion_parse::parser::{parse_formula_string, ParseError, ParserOptions, StringInterner};
use ixion_parse::resolver::{Dialect, SheetResolver};
use ixion_parse::token::{FormulaToken, TokenStore};

#[derive(Clone)]
enum CellSlot {
    Numeric(f64),
    Text(StringId),
    Formula { tokens: TokenStore, result: FormulaResult },
}

/// No-op table handler: this workbook doesn't model Excel-style tables.
/// An embedder that needs table references implements [`TableHandler`]
/// over its own table metadata and swaps it in.
struct NullTableHandler;

impl TableHandler for NullTableHandler {
    fn resolve_table(&self, _table: &TableReference, _origin: &Address) -> Option<Range> {
        None
    }
}

/// A small in-memory spreadsheet: named sheets, a sparse cell map, and an
/// interned string pool. Implements [`ModelContext`] so the interpreter
/// and queue manager can run directly against it.
pub struct Workbook {
    sheets: Mutex<Vec<String>>,
    sheet_lookup: DashMap<String, i32>,
    cells: DashMap<(i32, i32, i32), CellSlot>,
    strings: DashMap<String, u32>,
    string_pool: Mutex<Vec<String>>,
    named_expressions: DashMap<(Option<i32>, String), TokenStore>,
    table_handler: NullTableHandler,
}

impl Workbook {
    /// A workbook with one sheet, "Sheet1".
    pub fn new() -> Self {
        let workbook = Workbook {
            sheets: Mutex::new(Vec::new()),
            sheet_lookup: DashMap::new(),
            cells: DashMap::new(),
            strings: DashMap::new(),
            string_pool: Mutex::new(vec![String::new()]),
            named_expressions: DashMap::new(),
            table_handler: NullTableHandler,
        };
        workbook.strings.insert(String::new(), StringId::EMPTY.0);
        workbook.add_sheet("Sheet1");
        workbook
    }

    /// Appends a new sheet and returns its index.
    pub fn add_sheet(&self, name: &str) -> i32 {
        let mut sheets = self.sheets.lock().unwrap();
        let index = sheets.len() as i32;
        sheets.push(name.to_string());
        self.sheet_lookup.insert(name.to_string(), index);
        index
    }

    fn key(addr: Address) -> (i32, i32, i32) {
        (addr.sheet, addr.row, addr.col)
    }

    pub fn set_value(&self, addr: Address, value: f64) {
        self.cells.insert(Self::key(addr), CellSlot::Numeric(value));
    }

    pub fn set_text(&self, addr: Address, text: &str) {
        let id = self.add_string(text);
        self.cells.insert(Self::key(addr), CellSlot::Text(id));
    }

    pub fn clear(&self, addr: Address) {
        self.cells.remove(&Self::key(addr));
    }

    /// Parses `text` in `dialect` against this workbook's sheets and
    /// stores the resulting tokens as `addr`'s formula. The cell's result
    /// is left at `RESET` until the next [`Engine::recalc`].
    pub fn set_formula(&self, addr: Address, dialect: Dialect, text: &str) -> Result<(), ParseError> {
        let mut interner = WorkbookInterner(self);
        let opts = ParserOptions { dialect, preserve_unresolved: false };
        let store = parse_formula_string(text, &addr, self, &mut interner, opts)?;
        self.cells.insert(Self::key(addr), CellSlot::Formula { tokens: store, result: FormulaResult::RESET });
        Ok(())
    }

    pub fn set_named_expression(&self, sheet: Option<i32>, name: &str, dialect: Dialect, text: &str) -> Result<(), ParseError> {
        let origin = Address::absolute(sheet.unwrap_or(0), 0, 0);
        let mut interner = WorkbookInterner(self);
        let opts = ParserOptions { dialect, preserve_unresolved: false };
        let store = parse_formula_string(text, &origin, self, &mut interner, opts)?;
        self.named_expressions.insert((sheet, name.to_string()), store);
        Ok(())
    }

    pub fn result_of(&self, addr: Address) -> FormulaResult {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Numeric(v)) => FormulaResult::Value(v),
            Some(CellSlot::Text(id)) => FormulaResult::String(id),
            Some(CellSlot::Formula { result, .. }) => result,
            None => FormulaResult::RESET,
        }
    }

    pub fn string_of(&self, id: StringId) -> Option<String> {
        self.get_string(id)
    }

    /// Every cell currently holding a formula, in no particular order.
    fn formula_cells(&self) -> Vec<Address> {
        self.cells
            .iter()
            .filter_map(|entry| match entry.value() {
                CellSlot::Formula { .. } => {
                    let (sheet, row, col) = *entry.key();
                    Some(Address::absolute(sheet, row, col))
                }
                _ => None,
            })
            .collect()
    }

    /// Direct references a formula's top-level token stream reads,
    /// resolved against `origin`. Named-expression expansions are not
    /// walked here - they're resolved lazily by the interpreter itself,
    /// and scenario 2's recursion guard catches a cyclic expansion
    /// without needing it reflected in the dependency graph.
    fn direct_references(&self, origin: Address, tokens: &[FormulaToken]) -> Vec<Address> {
        let mut out = Vec::new();
        for token in tokens {
            match token {
                FormulaToken::SingleRef(addr) => out.push(addr.resolve(&origin)),
                FormulaToken::RangeRef(range) => out.extend(range.resolve(&origin).iter_cells()),
                FormulaToken::TableRef(table) => {
                    if let Some(range) = self.table_handler.resolve_table(table, &origin) {
                        out.extend(range.iter_cells());
                    }
                }
                _ => {}
            }
        }
        out
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook::new()
    }
}

struct WorkbookInterner<'a>(&'a Workbook);

impl StringInterner for WorkbookInterner<'_> {
    fn intern(&mut self, text: &str) -> u32 {
        self.0.add_string(text).0
    }
}

impl SheetResolver for Workbook {
    fn sheet_index(&self, name: &str) -> Option<i32> {
        self.sheet_lookup.get(name).map(|e| *e)
    }

    fn sheet_name(&self, index: i32) -> Option<String> {
        self.sheets.lock().unwrap().get(index as usize).cloned()
    }

    fn sheet_size(&self, index: i32) -> Option<(i32, i32)> {
        if index >= 0 && (index as usize) < self.sheets.lock().unwrap().len() {
            Some((ixion_common::ROW_UPPER_BOUND + 1, ixion_common::COLUMN_UPPER_BOUND + 1))
        } else {
            None
        }
    }

    fn sheet_count(&self) -> i32 {
        self.sheets.lock().unwrap().len() as i32
    }
}

impl ModelContext for Workbook {
    fn get_config(&self) -> FormulaConfig {
        FormulaConfig::default()
    }

    fn is_empty(&self, addr: Address) -> bool {
        !self.cells.contains_key(&Self::key(addr))
    }

    fn get_celltype(&self, addr: Address) -> CellType {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Numeric(_)) => CellType::Numeric,
            Some(CellSlot::Text(_)) => CellType::String,
            Some(CellSlot::Formula { .. }) => CellType::Formula,
            None => CellType::Empty,
        }
    }

    fn get_numeric_value(&self, addr: Address) -> f64 {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Numeric(v)) => v,
            _ => 0.0,
        }
    }

    fn get_string_identifier(&self, addr: Address) -> StringId {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Text(id)) => id,
            _ => StringId::EMPTY,
        }
    }

    fn get_formula_cell(&self, addr: Address) -> Option<FormulaResult> {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Formula { result, .. }) => Some(result),
            _ => None,
        }
    }

    fn get_string(&self, id: StringId) -> Option<String> {
        self.string_pool.lock().unwrap().get(id.0 as usize).cloned()
    }

    fn add_string(&self, text: &str) -> StringId {
        if let Some(existing) = self.strings.get(text) {
            return StringId(*existing);
        }
        let mut pool = self.string_pool.lock().unwrap();
        let id = pool.len() as u32;
        pool.push(text.to_string());
        self.strings.insert(text.to_string(), id);
        StringId(id)
    }

    fn append_string(&self, id: StringId, text: &str) -> StringId {
        let existing = self.get_string(id).unwrap_or_default();
        self.add_string(&(existing + text))
    }

    fn get_named_expression(&self, sheet: Option<i32>, name: &str) -> Option<TokenStore> {
        self.named_expressions.get(&(sheet, name.to_string())).map(|e| e.clone())
    }

    fn get_formula_tokens(&self, addr: Address) -> Option<TokenStore> {
        match self.cells.get(&Self::key(addr)).map(|e| e.clone()) {
            Some(CellSlot::Formula { tokens, .. }) => Some(tokens),
            _ => None,
        }
    }

    fn get_shared_formula_tokens(&self, _addr: Address) -> Option<TokenStore> {
        None
    }

    fn get_shared_formula_range(&self, _addr: Address) -> Option<Range> {
        None
    }

    fn get_sheet_name(&self, sheet: i32) -> Option<String> {
        SheetResolver::sheet_name(self, sheet)
    }

    fn get_sheet_index(&self, name: &str) -> Option<i32> {
        SheetResolver::sheet_index(self, name)
    }

    fn get_sheet_size(&self, sheet: i32) -> Option<(i32, i32)> {
        SheetResolver::sheet_size(self, sheet)
    }

    fn sheet_count(&self) -> i32 {
        SheetResolver::sheet_count(self)
    }

    fn get_table_handler(&self) -> Option<&dyn TableHandler> {
        Some(&self.table_handler)
    }

    fn create_session_handler(&self) -> Option<Box<dyn SessionHandler>> {
        None
    }

    fn set_result(&self, addr: Address, result: FormulaResult) {
        let key = Self::key(addr);
        if let Some(mut entry) = self.cells.get_mut(&key) {
            if let CellSlot::Formula { result: slot, .. } = entry.value_mut() {
                *slot = result;
            }
        }
    }
}

/// Owns a [`Workbook`] and drives full recompute batches over it.
///
/// This facade always recomputes every formula cell (there is no dirty-set
/// tracking here - the real incremental-recalc story is the embedder's
/// storage backend's job, out of scope per the workbook's own doc comment
/// above). For each batch it rebuilds the dependency graph from the
/// workbook's current tokens, which matches the tracker's own "transient,
/// rebuilt per recompute batch" lifecycle.
pub struct Engine {
    workbook: std::sync::Arc<Workbook>,
}

impl Engine {
    pub fn new() -> Self {
        Engine { workbook: std::sync::Arc::new(Workbook::new()) }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Recomputes every formula cell using `workers` worker threads
    /// (`0` runs serially on the calling thread).
    pub fn recalc(&self, workers: usize) -> Result<(), PoolError> {
        let formula_cells = self.workbook.formula_cells();

        let mut tracker = DependencyTracker::new();
        let mut no_deps: FxHashSet<Address> = FxHashSet::default();
        for &origin in &formula_cells {
            let tokens = match self.workbook.get_formula_tokens(origin) {
                Some(store) => store,
                None => continue,
            };
            let deps = self.workbook.direct_references(origin, tokens.tokens());
            if deps.is_empty() {
                no_deps.insert(origin);
            }
            for dep in deps {
                tracker.insert_depend(origin, dep);
            }
        }

        let mut schedule = tracker.topo_sort();
        let already_scheduled: FxHashSet<Address> = schedule.order.iter().copied().collect();
        let mut leading: Vec<Address> = no_deps.into_iter().filter(|a| !already_scheduled.contains(a)).collect();
        leading.sort_by_key(|a| (a.sheet, a.row, a.col));
        leading.extend(schedule.order);
        schedule = Schedule { order: leading, cyclic: schedule.cyclic };

        log::debug!("recalc: {} formula cells, {} workers", formula_cells.len(), workers);

        let context: std::sync::Arc<dyn ModelContext> = self.workbook.clone();
        let manager = CellQueueManager::init(workers, context);
        manager.run_batch(&schedule, &tracker, self.workbook.as_ref());
        manager.terminate()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
