//! Task module - the task model, filter selectors and the ordered store.
//!
//! - Invariants are enforced by the mutation helpers on `Task`
//! - The store holds no locks; `service` decides who may write

mod filter;
mod store;
pub mod task;

pub use filter::TaskFilter;
pub use store::{CategoryCount, TaskStore, DEFAULT_CATEGORIES};
pub use task::{dedup_labels, Priority, Task, TaskError, TaskId, TaskPatch, DEFAULT_DURATION};
