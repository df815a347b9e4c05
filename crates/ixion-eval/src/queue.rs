//! The worker pool that drives a recompute batch: one manager thread plus
//! N worker threads pulling ready cell positions off a shared queue.
//!
//! `init`/`reset`/`check_circular`/dispatch/`terminate` are explicit
//! phases rather than a condition-variable handshake - `reset` and
//! `check_circular` run as barriers before any cell is pushed, and
//! dispatch respects the dependency order via per-cell remaining-
//! dependency counters, so a cell is never pushed before every direct
//! dependency it has has already published its result.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;

use bitflags::bitflags;
use crossbeam_channel::{Receiver, Sender};
use ixion_common::{Address, FormulaErrorKind, FormulaResult};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::context::ModelContext;
use crate::depends::{DependencyTracker, Schedule};
use crate::interpreter;

/// Plumbing failures: never reach a cell's cached result.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("ready queue disconnected before terminate()")]
    Disconnected,
    #[error("a worker thread could not be joined")]
    JoinFailed,
}

bitflags! {
    /// Per-cell phase-tracking bookkeeping for one recompute batch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellStatus: u8 {
        const RESET            = 0b0001;
        const CIRCULAR_CHECKED = 0b0010;
        const DISPATCHED       = 0b0100;
        const EVALUATED        = 0b1000;
    }
}

enum Job {
    Cell(Address, Sender<Address>),
    Terminate,
}

/// One manager plus its N worker threads. `N == 0` is a legal, serial
/// configuration: `run_batch` then evaluates every cell on the calling
/// thread instead of dispatching.
pub struct CellQueueManager {
    n: usize,
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl CellQueueManager {
    /// Spawns `n` workers sharing `context`. Each worker blocks on the
    /// ready queue until a cell arrives or `terminate()` sends the
    /// shutdown sentinel.
    pub fn init(n: usize, context: Arc<dyn ModelContext>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(n);
        for _ in 0..n {
            let worker_receiver = receiver.clone();
            let worker_context = Arc::clone(&context);
            workers.push(std::thread::spawn(move || worker_loop(worker_receiver, worker_context)));
        }
        CellQueueManager { n, sender, receiver, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.n
    }

    /// Runs the four in-batch phases - reset, circular-check, dispatch,
    /// and (implicitly) join-on-completion - for `schedule`. Blocks until
    /// every non-cyclic cell has published a result.
    pub fn run_batch(&self, schedule: &Schedule, tracker: &DependencyTracker, context: &dyn ModelContext) {
        let mut status: FxHashMap<Address, CellStatus> = FxHashMap::default();

        for &addr in &schedule.order {
            context.set_result(addr, FormulaResult::RESET);
            status.insert(addr, CellStatus::RESET);
        }

        for &addr in &schedule.order {
            let entry = status.entry(addr).or_insert(CellStatus::empty());
            if schedule.cyclic.contains(&addr) {
                log::warn!("cell {addr} participates in a dependency cycle");
                context.set_result(addr, FormulaResult::Error(FormulaErrorKind::RefResultNotAvailable));
                *entry |= CellStatus::CIRCULAR_CHECKED | CellStatus::EVALUATED;
            } else {
                *entry |= CellStatus::CIRCULAR_CHECKED;
            }
        }

        let runnable: Vec<Address> = schedule.order.iter().copied().filter(|a| !schedule.cyclic.contains(a)).collect();
        log::debug!("recompute batch: {} cells, {} cyclic", runnable.len(), schedule.cyclic.len());

        if self.n == 0 || self.workers.is_empty() {
            for addr in runnable {
                debug_assert!(status[&addr].contains(CellStatus::CIRCULAR_CHECKED));
                interpret_and_publish(addr, context);
                status.insert(addr, status[&addr] | CellStatus::DISPATCHED | CellStatus::EVALUATED);
            }
            return;
        }

        self.dispatch_parallel(&runnable, tracker, schedule, &mut status);
    }

    fn dispatch_parallel(
        &self,
        runnable: &[Address],
        tracker: &DependencyTracker,
        schedule: &Schedule,
        status: &mut FxHashMap<Address, CellStatus>,
    ) {
        let mut remaining: FxHashMap<Address, usize> = FxHashMap::default();
        let mut dependents: FxHashMap<Address, Vec<Address>> = FxHashMap::default();
        for &addr in runnable {
            let deps: Vec<Address> = tracker.dependencies_of(addr).filter(|d| !schedule.cyclic.contains(d)).collect();
            remaining.insert(addr, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(addr);
            }
        }

        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Address>();
        let mut ready: Vec<Address> = runnable.iter().copied().filter(|a| remaining[a] == 0).collect();
        let mut inflight = 0usize;
        let total = runnable.len();
        let mut completed = 0usize;

        loop {
            while let Some(addr) = ready.pop() {
                debug_assert!(status[&addr].contains(CellStatus::CIRCULAR_CHECKED));
                self.sender.send(Job::Cell(addr, done_tx.clone())).expect("ready queue disconnected mid-batch");
                status.insert(addr, status[&addr] | CellStatus::DISPATCHED);
                inflight += 1;
            }
            if completed == total {
                break;
            }
            if inflight == 0 {
                break;
            }
            let finished = done_rx.recv().expect("worker completion channel closed early");
            inflight -= 1;
            completed += 1;
            status.insert(finished, status[&finished] | CellStatus::EVALUATED);
            if let Some(waiting) = dependents.get(&finished) {
                for &addr in waiting {
                    let counter = remaining.get_mut(&addr).unwrap();
                    *counter -= 1;
                    if *counter == 0 {
                        ready.push(addr);
                    }
                }
            }
        }
    }

    /// Flushes the queue, signals every worker to exit, and joins them.
    pub fn terminate(mut self) -> Result<(), PoolError> {
        for _ in 0..self.workers.len() {
            self.sender.send(Job::Terminate).map_err(|_| PoolError::Disconnected)?;
        }
        drop(self.receiver);
        for worker in self.workers.drain(..) {
            worker.join().map_err(|_| PoolError::JoinFailed)?;
        }
        Ok(())
    }
}

fn worker_loop(receiver: Receiver<Job>, context: Arc<dyn ModelContext>) {
    loop {
        match receiver.recv() {
            Ok(Job::Cell(addr, done)) => {
                interpret_and_publish(addr, context.as_ref());
                let _ = done.send(addr);
            }
            Ok(Job::Terminate) | Err(_) => break,
        }
    }
}

/// Reads a cell's token stream, interprets it, and publishes the result,
/// catching a worker-thread panic and turning it into a `general_error`
/// result rather than letting it cross the worker boundary.
fn interpret_and_publish(addr: Address, context: &dyn ModelContext) {
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| match context.get_formula_tokens(addr) {
        Some(store) => interpreter::interpret(store.tokens(), addr, context),
        None => FormulaResult::Error(FormulaErrorKind::GeneralError),
    }));
    let result = outcome.unwrap_or_else(|_| {
        log::error!("worker panicked interpreting {addr}");
        FormulaResult::Error(FormulaErrorKind::GeneralError)
    });
    context.set_result(addr, result);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ixion_common::{FormulaConfig, Range, StringId, TableHandler};
    use ixion_parse::parser::{parse_formula_string, ParserOptions};
    use ixion_parse::resolver::Dialect;
    use ixion_parse::token::TokenStore;

    use super::*;
    use crate::context::{CellType, SessionHandler};
    use crate::depends::DependencyTracker;

    struct TestSheets;
    impl ixion_parse::resolver::SheetResolver for TestSheets {
        fn sheet_index(&self, _name: &str) -> Option<i32> {
            Some(0)
        }
        fn sheet_name(&self, _sheet: i32) -> Option<String> {
            Some("Sheet1".to_string())
        }
        fn sheet_size(&self, _sheet: i32) -> Option<(i32, i32)> {
            Some((1_048_576, 16_384))
        }
        fn sheet_count(&self) -> i32 {
            1
        }
    }

    struct Interner;
    impl ixion_parse::parser::StringInterner for Interner {
        fn intern(&mut self, _text: &str) -> u32 {
            0
        }
    }

    struct TestContext {
        formulas: Mutex<FxHashMap<(i32, i32, i32), TokenStore>>,
        results: Mutex<FxHashMap<(i32, i32, i32), FormulaResult>>,
    }

    impl TestContext {
        fn new() -> Self {
            TestContext { formulas: Mutex::new(FxHashMap::default()), results: Mutex::new(FxHashMap::default()) }
        }

        fn set_formula(&self, addr: Address, text: &str) {
            let store = parse_formula_string(text, addr, &TestSheets, &mut Interner, ParserOptions { dialect: Dialect::ExcelA1, preserve_unresolved: false }).unwrap();
            self.formulas.lock().unwrap().insert((addr.sheet, addr.row, addr.col), store);
        }

        fn set_value(&self, addr: Address, value: f64) {
            self.results.lock().unwrap().insert((addr.sheet, addr.row, addr.col), FormulaResult::Value(value));
        }

        fn result_of(&self, addr: Address) -> FormulaResult {
            self.results.lock().unwrap().get(&(addr.sheet, addr.row, addr.col)).copied().unwrap_or(FormulaResult::RESET)
        }
    }

    impl ModelContext for TestContext {
        fn get_config(&self) -> FormulaConfig {
            FormulaConfig::default()
        }
        fn is_empty(&self, addr: Address) -> bool {
            let key = (addr.sheet, addr.row, addr.col);
            !self.formulas.lock().unwrap().contains_key(&key) && !self.results.lock().unwrap().contains_key(&key)
        }
        fn get_celltype(&self, addr: Address) -> CellType {
            let key = (addr.sheet, addr.row, addr.col);
            if self.formulas.lock().unwrap().contains_key(&key) {
                CellType::Formula
            } else if self.results.lock().unwrap().contains_key(&key) {
                CellType::Numeric
            } else {
                CellType::Empty
            }
        }
        fn get_numeric_value(&self, addr: Address) -> f64 {
            match self.result_of(addr) {
                FormulaResult::Value(v) => v,
                _ => 0.0,
            }
        }
        fn get_string_identifier(&self, _addr: Address) -> StringId {
            StringId::EMPTY
        }
        fn get_formula_cell(&self, addr: Address) -> Option<FormulaResult> {
            Some(self.result_of(addr))
        }
        fn get_string(&self, _id: StringId) -> Option<String> {
            None
        }
        fn add_string(&self, _text: &str) -> StringId {
            StringId::EMPTY
        }
        fn append_string(&self, id: StringId, _text: &str) -> StringId {
            id
        }
        fn get_named_expression(&self, _sheet: Option<i32>, _name: &str) -> Option<TokenStore> {
            None
        }
        fn get_formula_tokens(&self, addr: Address) -> Option<TokenStore> {
            self.formulas.lock().unwrap().get(&(addr.sheet, addr.row, addr.col)).cloned()
        }
        fn get_shared_formula_tokens(&self, _addr: Address) -> Option<TokenStore> {
            None
        }
        fn get_shared_formula_range(&self, _addr: Address) -> Option<Range> {
            None
        }
        fn get_sheet_name(&self, _sheet: i32) -> Option<String> {
            Some("Sheet1".to_string())
        }
        fn get_sheet_index(&self, _name: &str) -> Option<i32> {
            Some(0)
        }
        fn get_sheet_size(&self, _sheet: i32) -> Option<(i32, i32)> {
            Some((1_048_576, 16_384))
        }
        fn sheet_count(&self) -> i32 {
            1
        }
        fn get_table_handler(&self) -> Option<&dyn TableHandler> {
            None
        }
        fn create_session_handler(&self) -> Option<Box<dyn SessionHandler>> {
            None
        }
        fn set_result(&self, addr: Address, result: FormulaResult) {
            self.results.lock().unwrap().insert((addr.sheet, addr.row, addr.col), result);
        }
    }

    fn addr(row: i32) -> Address {
        Address::absolute(0, row, 0)
    }

    #[test]
    fn serial_and_parallel_runs_agree_on_a_chain() {
        for n in [0usize, 2usize] {
            let ctx = Arc::new(TestContext::new());
            ctx.set_value(addr(0), 1.0);
            ctx.set_formula(addr(1), "=A1+1");
            ctx.set_formula(addr(2), "=A2+1");

            let mut tracker = DependencyTracker::new();
            tracker.insert_depend(addr(1), addr(0));
            tracker.insert_depend(addr(2), addr(1));
            let schedule = tracker.topo_sort();

            let manager = CellQueueManager::init(n, Arc::clone(&ctx) as Arc<dyn ModelContext>);
            manager.run_batch(&schedule, &tracker, ctx.as_ref());
            assert_eq!(ctx.result_of(addr(1)), FormulaResult::Value(2.0));
            assert_eq!(ctx.result_of(addr(2)), FormulaResult::Value(3.0));
            manager.terminate().unwrap();
        }
    }

    #[test]
    fn cycle_of_three_marks_every_participant() {
        let ctx = Arc::new(TestContext::new());
        ctx.set_formula(addr(0), "=A2");
        ctx.set_formula(addr(1), "=A3");
        ctx.set_formula(addr(2), "=A1");

        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(0), addr(1));
        tracker.insert_depend(addr(1), addr(2));
        tracker.insert_depend(addr(2), addr(0));
        let schedule = tracker.topo_sort();
        assert_eq!(schedule.cyclic.len(), 3);

        let manager = CellQueueManager::init(0, Arc::clone(&ctx) as Arc<dyn ModelContext>);
        manager.run_batch(&schedule, &tracker, ctx.as_ref());
        for row in 0..3 {
            assert_eq!(
                ctx.result_of(addr(row)),
                FormulaResult::Error(FormulaErrorKind::RefResultNotAvailable)
            );
        }
    }

    #[test]
    fn zero_workers_evaluates_serially_without_a_pool() {
        let ctx = Arc::new(TestContext::new());
        ctx.set_value(addr(0), 4.0);
        ctx.set_formula(addr(1), "=A1*2");

        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(1), addr(0));
        let schedule = tracker.topo_sort();

        let manager = CellQueueManager::init(0, Arc::clone(&ctx) as Arc<dyn ModelContext>);
        assert_eq!(manager.worker_count(), 0);
        manager.run_batch(&schedule, &tracker, ctx.as_ref());
        assert_eq!(ctx.result_of(addr(1)), FormulaResult::Value(8.0));
        manager.terminate().unwrap();
    }
}
