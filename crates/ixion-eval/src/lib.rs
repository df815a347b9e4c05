//! Token interpreter, built-in function dispatch, dependency tracker and
//! worker pool. Consumes [`ixion_parse`]'s token streams and a
//! [`context::ModelContext`] implementation supplied by the embedder.

pub mod context;
pub mod depends;
pub mod functions;
pub mod interpreter;
pub mod matrix;
pub mod queue;

pub use context::{CellType, ListenerTarget, ListenerTracker, ModelContext, SessionHandler};
pub use depends::{DependencyTracker, Schedule};
pub use interpreter::interpret;
pub use matrix::{MatrixCell, MatrixValue};
pub use queue::{CellQueueManager, CellStatus, PoolError};
