use std::sync::atomic::{AtomicU64, Ordering};

use raleighsl_task::{Task, TaskQueue, TaskTree};

use crate::RunQueue;

/// Plain FIFO discipline.
///
/// Tasks submitted for the first time (`seqid == 0`) are assigned a fresh
/// seqid and appended to the tail of a plain queue. Tasks that already carry
/// a seqid — because they are re-entering after parking on a wait queue —
/// go into a seqid-ordered pending tree that is drained first, so a task
/// that yielded mid-stream still comes out before work submitted after it.
#[derive(Default)]
pub struct FifoQueue {
	next_seqid: AtomicU64,
	pending: TaskTree,
	queue: TaskQueue,
}

impl FifoQueue {
	pub fn new() -> Self {
		Self::default()
	}

	fn assign_seqid(&self, task: &mut Task) {
		if !task.has_seqid() {
			task.seqid = self.next_seqid.fetch_add(1, Ordering::Relaxed) + 1;
		}
	}
}

impl RunQueue for FifoQueue {
	fn add(&mut self, mut task: Task) {
		if task.has_seqid() {
			self.pending.push(task);
		} else {
			self.assign_seqid(&mut task);
			self.queue.push(task);
		}
	}

	fn readd(&mut self, task: Task) {
		self.pending.push(task);
	}

	fn fetch(&mut self) -> Option<Task> {
		if let Some(task) = self.pending.pop_min() {
			return Some(task);
		}
		self.queue.pop()
	}

	fn len(&self) -> usize {
		self.pending.len() + self.queue.len()
	}
}
