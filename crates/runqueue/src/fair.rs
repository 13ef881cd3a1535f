use std::sync::atomic::{AtomicU64, Ordering};

use raleighsl_task::{Task, TaskTree};

use crate::RunQueue;

/// Virtual-time fair discipline: tasks live in a tree keyed by
/// `(vtime, seqid)`. Fetching the minimum and bumping its `vtime` spreads
/// scheduling opportunities across tasks roughly evenly; the `seqid`
/// tie-break gives FIFO behavior among equal-vtime peers.
#[derive(Default)]
pub struct FairQueue {
	next_seqid: AtomicU64,
	tasks: TaskTree,
}

impl FairQueue {
	pub fn new() -> Self {
		Self::default()
	}
}

impl RunQueue for FairQueue {
	fn add(&mut self, mut task: Task) {
		if !task.has_seqid() {
			task.seqid = self.next_seqid.fetch_add(1, Ordering::Relaxed) + 1;
		}
		self.tasks.push(task);
	}

	fn readd(&mut self, task: Task) {
		self.tasks.push(task);
	}

	fn fetch(&mut self) -> Option<Task> {
		let mut task = self.tasks.pop_min()?;
		task.vtime += 1;
		Some(task)
	}

	fn len(&self) -> usize {
		self.tasks.len()
	}
}
