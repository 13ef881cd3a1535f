use raleighsl_task::{Task, TaskFlags, TaskQueue};

use crate::RunQueue;

/// A nested run queue implementing barrier semantics.
///
/// A task tagged [`TaskFlags::BARRIER`] must wait for every task admitted
/// ahead of it in this group to finish (`running == 0`) before it can be
/// fetched, and once it is fetched no further task is fetched from the
/// group until it (and anything still running) finishes. Tasks `add`-ed
/// while a barrier is active queue in `pending` and are spliced back into
/// `main` once the barrier clears.
///
/// Useful for expressing an ordered commit escalation as scheduling: each
/// object's `COMMIT` acquisition for one transaction is submitted as a
/// single barrier-tagged group so they drain together without interleaving
/// with unrelated work on the same object.
#[derive(Default)]
pub struct GroupQueue {
	main: TaskQueue,
	pending: TaskQueue,
	running: u32,
	barrier_active: bool,
}

impl GroupQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn running(&self) -> u32 {
		self.running
	}

	pub fn barrier_active(&self) -> bool {
		self.barrier_active
	}
}

impl RunQueue for GroupQueue {
	fn add(&mut self, task: Task) {
		if self.barrier_active {
			self.pending.push(task);
		} else {
			self.main.push(task);
		}
	}

	fn readd(&mut self, task: Task) {
		if self.barrier_active {
			self.pending.push_front(task);
		} else {
			self.main.push_front(task);
		}
	}

	fn fetch(&mut self) -> Option<Task> {
		if self.barrier_active {
			return None;
		}
		let is_barrier = self.main.front()?.flags.contains(TaskFlags::BARRIER);
		if is_barrier && self.running > 0 {
			// A barrier task has pending predecessors still running.
			return None;
		}
		let task = self.main.pop()?;
		if is_barrier {
			self.barrier_active = true;
			tracing::debug!(running = self.running, "group queue barrier admitted");
		}
		self.running += 1;
		Some(task)
	}

	fn len(&self) -> usize {
		self.main.len() + self.pending.len()
	}

	fn fini(&mut self, task_was_barrier: bool) {
		self.running = self.running.saturating_sub(1);
		if task_was_barrier && self.running == 0 {
			self.barrier_active = false;
			let pending = self.pending.drain();
			tracing::debug!(requeued = pending.len(), "group queue barrier cleared");
			self.main.push_front_all(pending);
		}
	}
}
