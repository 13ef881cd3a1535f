use std::fmt;

use bitflags::bitflags;

use crate::rwc::WaitTarget;

bitflags! {
	/// Behavioral flags carried alongside a task's resume state.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct TaskFlags: u32 {
		/// This task must not be fetched concurrently with its siblings in
		/// the same run-queue group (see `raleighsl-runqueue`'s group queue).
		const BARRIER = 1 << 0;
		/// The dispatcher may drop this task silently on a fatal error
		/// instead of logging it as unexpected.
		const AUTOCLEAN = 1 << 1;
	}
}

/// What a [`TaskBody`] step produced.
#[derive(Debug)]
pub enum Outcome {
	/// The task finished; it will not be resumed again.
	Done,
	/// The task wants to run again immediately (e.g. it consumed a
	/// round-robin quantum). The caller re-admits it to a run queue.
	Yield,
	/// The task could not make progress and has recorded where it is
	/// waiting via [`TaskBody::wait_target`]. The caller must move the
	/// task onto that target's wait queue.
	Park,
}

/// The resumable body of a task.
///
/// Unlike an `async fn`, a `TaskBody` never captures an implicit
/// continuation: each call to [`run`](TaskBody::run) executes to the next
/// suspension point and returns, leaving any state that must survive the
/// suspension inside `self`. This mirrors the reference engine's
/// function-pointer-plus-argument-area task model without needing raw
/// pointers: ordinary field storage on the concrete type plays the role of
/// the C implementation's small fixed-size argument area.
pub trait TaskBody: Send {
	/// Advance the task by one step.
	fn run(&mut self) -> Outcome;

	/// When [`run`](TaskBody::run) returns [`Outcome::Park`], this must
	/// return the semaphore and mode the task is now waiting on.
	fn wait_target(&self) -> Option<WaitTarget> {
		None
	}
}

/// A resumable unit of computation scheduled by the run queues and executed
/// by dispatcher workers.
pub struct Task {
	/// Scheduler-assigned monotonic sequence number; `0` means unassigned.
	pub seqid: u64,
	/// Fair-scheduling virtual time; incremented by the fair run queue on
	/// every fetch.
	pub vtime: u64,
	/// Composing-layer priority (used by round-robin/group queues).
	pub priority: u32,
	pub flags: TaskFlags,
	body: Box<dyn TaskBody>,
}

impl fmt::Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("seqid", &self.seqid)
			.field("vtime", &self.vtime)
			.field("priority", &self.priority)
			.field("flags", &self.flags)
			.finish_non_exhaustive()
	}
}

impl Task {
	/// Creates a fresh, unassigned task wrapping `body`.
	pub fn new(body: impl TaskBody + 'static) -> Self {
		Self {
			seqid: 0,
			vtime: 0,
			priority: 0,
			flags: TaskFlags::empty(),
			body: Box::new(body),
		}
	}

	/// `true` once a run queue has assigned this task a `seqid`.
	pub fn has_seqid(&self) -> bool {
		self.seqid != 0
	}

	/// Advances the task by one step.
	pub fn step(&mut self) -> Outcome {
		self.body.run()
	}

	/// Where the task is waiting, valid only right after a `Park` outcome.
	pub fn wait_target(&self) -> Option<WaitTarget> {
		self.body.wait_target()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct CountTo3 {
		n: u32,
	}

	impl TaskBody for CountTo3 {
		fn run(&mut self) -> Outcome {
			self.n += 1;
			if self.n >= 3 { Outcome::Done } else { Outcome::Yield }
		}
	}

	#[test]
	fn step_yields_then_completes() {
		let mut task = Task::new(CountTo3 { n: 0 });
		assert!(matches!(task.step(), Outcome::Yield));
		assert!(matches!(task.step(), Outcome::Yield));
		assert!(matches!(task.step(), Outcome::Done));
	}

	#[test]
	fn fresh_task_has_no_seqid() {
		let task = Task::new(CountTo3 { n: 0 });
		assert!(!task.has_seqid());
	}
}
