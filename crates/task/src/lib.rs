//! Task descriptors and the RWC (Read/Write/Commit/Lock) semaphore.
//!
//! This crate is the leaf of the engine's concurrency substrate: a [`Task`]
//! is a resumable unit of work that a dispatcher drives to completion one
//! step at a time, parking on an [`RwcSemaphore`] whenever it cannot make
//! progress. Nothing here spawns threads or schedules anything — that is
//! `raleighsl-runqueue` and `raleighsl-dispatcher`'s job.

mod queue;
mod rwc;
mod task;
mod tree;

pub use queue::TaskQueue;
pub use rwc::{Drained, RwcMode, RwcSemaphore, WaitTarget};
pub use task::{Outcome, Task, TaskBody, TaskFlags};
pub use tree::TaskTree;
