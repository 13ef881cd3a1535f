use std::collections::BTreeMap;

use crate::task::Task;

/// Ordered task container keyed by `(vtime, seqid)`, used to re-admit
/// out-of-order tasks back to a scheduler in monotone order.
///
/// The reference engine keys this on an intrusive AVL tree; this crate's
/// DESIGN NOTES (pointer-heavy graphs) direct against porting that shape, so
/// this is a plain `BTreeMap` — same ordered pop-minimum semantics, none of
/// the self-referential node linkage.
#[derive(Default)]
pub struct TaskTree {
	tasks: BTreeMap<(u64, u64), Task>,
}

impl TaskTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `task`, keyed by its current `(vtime, seqid)`.
	pub fn push(&mut self, task: Task) {
		self.tasks.insert((task.vtime, task.seqid), task);
	}

	/// Removes and returns the minimum-keyed task.
	pub fn pop_min(&mut self) -> Option<Task> {
		let key = *self.tasks.keys().next()?;
		self.tasks.remove(&key)
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}
}
