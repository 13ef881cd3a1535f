//! Pluggable scheduling disciplines sharing one task-dispatch contract.
//!
//! Every run queue in this crate implements [`RunQueue`]; the global
//! dispatcher (`raleighsl-dispatcher`) is generic over this trait and
//! doesn't know which discipline it is driving.

mod fair;
mod fifo;
mod group;
mod round_robin;

pub use fair::FairQueue;
pub use fifo::FifoQueue;
pub use group::GroupQueue;
pub use round_robin::RoundRobinQueue;
use raleighsl_task::Task;

/// Common contract for a scheduling discipline.
///
/// A `RunQueue` owns tasks between the time they are submitted and the time
/// a dispatcher worker fetches them to run.
pub trait RunQueue: Send {
	/// Admits a task, assigning it a `seqid` if it doesn't have one yet.
	fn add(&mut self, task: Task);

	/// Re-admits a task at the head of its class (e.g. after a wait-queue
	/// wake-up, or a round-robin quantum rotation), ahead of freshly
	/// submitted work.
	fn readd(&mut self, task: Task);

	/// Removes and returns the next task to run, or `None` if empty.
	fn fetch(&mut self) -> Option<Task>;

	/// Number of tasks currently held.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Called when a task fetched from this queue finishes running,
	/// regardless of its outcome. Group queues use this to track
	/// `running`/`barrier` bookkeeping; other disciplines no-op.
	fn fini(&mut self, _task_was_barrier: bool) {}
}
