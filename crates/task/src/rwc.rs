use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::queue::TaskQueue;
use crate::task::Task;

/// The four operation modes an [`RwcSemaphore`] arbitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RwcMode {
	/// Shared read access; any number of readers may hold this mode.
	Read,
	/// Shared write-staging; multiple writers may stage concurrently.
	Write,
	/// Exclusive publish of staged writes.
	Commit,
	/// Exclusive administrative lock (rename/unlink).
	Lock,
}

/// Identifies where a parked task is waiting, so a dispatcher can move it
/// onto the right queue after an [`Outcome::Park`](crate::Outcome::Park).
#[derive(Clone)]
pub struct WaitTarget {
	pub semaphore: Arc<RwcSemaphore>,
	pub mode: RwcMode,
}

#[derive(Default, Clone, Copy)]
struct State {
	readers: u32,
	writers: u32,
	commit: bool,
	lock: bool,
}

impl State {
	fn exclusive_free(&self) -> bool {
		!self.commit && !self.lock
	}

	fn admits(&self, mode: RwcMode) -> bool {
		match mode {
			RwcMode::Read | RwcMode::Write => self.exclusive_free(),
			RwcMode::Commit | RwcMode::Lock => {
				self.exclusive_free() && self.readers == 0 && self.writers == 0
			}
		}
	}

	fn acquire(&mut self, mode: RwcMode) {
		match mode {
			RwcMode::Read => self.readers += 1,
			RwcMode::Write => self.writers += 1,
			RwcMode::Commit => self.commit = true,
			RwcMode::Lock => self.lock = true,
		}
	}

	fn release(&mut self, mode: RwcMode) {
		match mode {
			RwcMode::Read => self.readers = self.readers.saturating_sub(1),
			RwcMode::Write => self.writers = self.writers.saturating_sub(1),
			RwcMode::Commit => self.commit = false,
			RwcMode::Lock => self.lock = false,
		}
	}
}

#[derive(Default)]
struct Inner {
	state: State,
	readq: TaskQueue,
	writeq: TaskQueue,
	commitq: TaskQueue,
	lockq: TaskQueue,
}

/// Lists of tasks drained from wait queues on [`RwcSemaphore::release`],
/// ready to be bulk-resubmitted to a dispatcher's run queue.
#[derive(Default)]
pub struct Drained {
	pub read: VecDeque<Task>,
	pub write: VecDeque<Task>,
	pub commit: VecDeque<Task>,
	pub lock: VecDeque<Task>,
}

impl Drained {
	/// `true` if nothing was woken.
	pub fn is_empty(&self) -> bool {
		self.read.is_empty() && self.write.is_empty() && self.commit.is_empty() && self.lock.is_empty()
	}

	/// Consumes this into a single list, read/write/commit/lock order.
	pub fn into_vec(mut self) -> Vec<Task> {
		let mut out = Vec::with_capacity(
			self.read.len() + self.write.len() + self.commit.len() + self.lock.len(),
		);
		out.extend(self.read.drain(..));
		out.extend(self.write.drain(..));
		out.extend(self.commit.drain(..));
		out.extend(self.lock.drain(..));
		out
	}
}

/// A four-mode lock protecting one object or transaction.
///
/// Combines a state word with four per-mode FIFO wait queues. Waking a
/// parked task only gives it another chance to retry
/// [`try_acquire`](RwcSemaphore::try_acquire) — it is not a guarantee of
/// grant, which is why `Commit`/`Lock` wait queues may be drained in bulk
/// even though only one holder can win the retry race.
///
/// The reference engine keeps the state word and the wait-queue spinlock as
/// two separate critical sections for throughput; this crate collapses them
/// under one `parking_lot::Mutex` for simplicity, without changing the
/// observable acquire/park/release contract.
pub struct RwcSemaphore {
	inner: Mutex<Inner>,
}

impl Default for RwcSemaphore {
	fn default() -> Self {
		Self::new()
	}
}

impl RwcSemaphore {
	pub fn new() -> Self {
		Self { inner: Mutex::new(Inner::default()) }
	}

	/// Attempts to take `mode`. On success the state word is updated
	/// atomically (under the lock) and the caller may proceed.
	pub fn try_acquire(&self, mode: RwcMode) -> bool {
		let mut inner = self.inner.lock();
		if inner.state.admits(mode) {
			inner.state.acquire(mode);
			tracing::trace!(?mode, "rwc acquired");
			true
		} else {
			tracing::trace!(?mode, "rwc acquire blocked");
			false
		}
	}

	/// Parks `task` on `mode`'s wait queue. Called after a failed
	/// `try_acquire` for this same mode.
	pub fn park(&self, mode: RwcMode, task: Task) {
		let mut inner = self.inner.lock();
		match mode {
			RwcMode::Read => inner.readq.push(task),
			RwcMode::Write => inner.writeq.push(task),
			RwcMode::Commit => inner.commitq.push(task),
			RwcMode::Lock => inner.lockq.push(task),
		}
		tracing::debug!(?mode, "task parked on rwc semaphore");
	}

	/// Releases `mode` and drains whichever wait queues the resulting state
	/// now admits, returning them for the caller to resubmit to a
	/// dispatcher.
	pub fn release(&self, mode: RwcMode) -> Drained {
		let mut inner = self.inner.lock();
		inner.state.release(mode);
		let state = inner.state;

		let mut drained = Drained::default();
		if state.admits(RwcMode::Read) && !inner.readq.is_empty() {
			drained.read = inner.readq.drain();
		}
		if state.admits(RwcMode::Write) && !inner.writeq.is_empty() {
			drained.write = inner.writeq.drain();
		}
		if state.admits(RwcMode::Commit) && !inner.commitq.is_empty() {
			drained.commit = inner.commitq.drain();
		}
		if state.admits(RwcMode::Lock) && !inner.lockq.is_empty() {
			drained.lock = inner.lockq.drain();
		}
		tracing::trace!(?mode, woken = drained.read.len() + drained.write.len() + drained.commit.len() + drained.lock.len(), "rwc released");
		drained
	}

	/// Number of tasks currently parked across all four wait queues.
	pub fn waiting_len(&self) -> usize {
		let inner = self.inner.lock();
		inner.readq.len() + inner.writeq.len() + inner.commitq.len() + inner.lockq.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::task::{Outcome, TaskBody};

	struct Noop;
	impl TaskBody for Noop {
		fn run(&mut self) -> Outcome {
			Outcome::Done
		}
	}

	#[test]
	fn many_readers_admitted_concurrently() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Read));
		assert!(sem.try_acquire(RwcMode::Read));
		assert!(sem.try_acquire(RwcMode::Read));
	}

	#[test]
	fn commit_excludes_everything() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Commit));
		assert!(!sem.try_acquire(RwcMode::Read));
		assert!(!sem.try_acquire(RwcMode::Write));
		assert!(!sem.try_acquire(RwcMode::Commit));
		assert!(!sem.try_acquire(RwcMode::Lock));
	}

	#[test]
	fn lock_excludes_everything_including_itself() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Lock));
		assert!(!sem.try_acquire(RwcMode::Read));
		assert!(!sem.try_acquire(RwcMode::Lock));
	}

	#[test]
	fn write_and_read_coexist_but_block_commit() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Write));
		assert!(sem.try_acquire(RwcMode::Read));
		assert!(sem.try_acquire(RwcMode::Write));
		assert!(!sem.try_acquire(RwcMode::Commit));
		assert!(!sem.try_acquire(RwcMode::Lock));
	}

	#[test]
	fn release_drains_admissible_waiters() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Write));
		assert!(!sem.try_acquire(RwcMode::Commit));
		sem.park(RwcMode::Commit, Task::new(Noop));
		assert_eq!(sem.waiting_len(), 1);

		let drained = sem.release(RwcMode::Write);
		assert_eq!(drained.commit.len(), 1);
		assert_eq!(sem.waiting_len(), 0);
	}

	#[test]
	fn release_does_not_drain_inadmissible_queues() {
		let sem = RwcSemaphore::new();
		assert!(sem.try_acquire(RwcMode::Write));
		assert!(sem.try_acquire(RwcMode::Write));
		assert!(!sem.try_acquire(RwcMode::Commit));
		sem.park(RwcMode::Commit, Task::new(Noop));

		// One writer releases; the other still blocks commit.
		let drained = sem.release(RwcMode::Write);
		assert!(drained.is_empty());
		assert_eq!(sem.waiting_len(), 1);
	}
}
