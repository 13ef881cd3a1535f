//! The global worker pool that drives run queues to completion.
//!
//! A [`Dispatcher`] owns a fixed-size pool of OS threads and a single root
//! [`RunQueue`]. Workers loop: fetch a task, step it, and react to its
//! [`Outcome`] — re-admit it, park it on an [`raleighsl_task::RwcSemaphore`],
//! or drop it once done. Nothing here is `async`: a task is driven forward
//! by repeated synchronous calls to [`TaskBody::run`](raleighsl_task::TaskBody::run),
//! never by capturing an implicit continuation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use raleighsl_runqueue::RunQueue;
use raleighsl_task::{Drained, Outcome, Task, TaskFlags};

/// How long a worker with nothing to do waits before re-checking the root
/// queue. Workers are woken early by [`Dispatcher::submit`] and friends; this
/// bound only matters if a wake-up notification is missed.
const PARK_TIMEOUT: Duration = Duration::from_millis(100);

/// A cheaply cloneable reference to a [`Dispatcher`]'s submission path.
///
/// Task bodies that release an [`raleighsl_task::RwcSemaphore`] mid-step (the
/// exec layer's commit/rollback escalation, for instance) need a way to
/// resubmit whatever that release drained without owning the dispatcher
/// itself — this is that handle, the same role the broker's per-service
/// `*Handle` types play relative to their owning actor.
#[derive(Clone)]
pub struct DispatcherHandle {
	root: Arc<Mutex<Box<dyn RunQueue>>>,
	wake: Arc<Condvar>,
}

impl DispatcherHandle {
	/// Submits a single task and wakes one worker.
	pub fn submit(&self, task: Task) {
		self.root.lock().add(task);
		self.wake.notify_one();
	}

	/// Submits a batch of tasks and wakes every worker, since the batch may
	/// have landed across several run-queue classes.
	pub fn submit_many(&self, tasks: impl IntoIterator<Item = Task>) {
		let mut root = self.root.lock();
		let mut any = false;
		for task in tasks {
			root.add(task);
			any = true;
		}
		drop(root);
		if any {
			self.wake.notify_all();
		}
	}

	/// Resubmits everything an [`raleighsl_task::RwcSemaphore::release`] drained.
	pub fn resubmit_drained(&self, drained: Drained) {
		if !drained.is_empty() {
			self.submit_many(drained.into_vec());
		}
	}

	/// Number of tasks currently sitting in the root run queue (not counting
	/// ones parked on a semaphore or mid-step on a worker).
	pub fn pending_len(&self) -> usize {
		self.root.lock().len()
	}
}

/// Owns the worker thread pool and the root run queue.
///
/// Dropping a `Dispatcher` does not stop its workers; call
/// [`shutdown`](Self::shutdown) explicitly and join them.
pub struct Dispatcher {
	handle: DispatcherHandle,
	wake_lock: Arc<Mutex<()>>,
	shutdown: Arc<AtomicBool>,
	workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
	/// Spawns a pool of `worker_count` threads (defaulting to the number of
	/// available cores) draining `root`.
	pub fn new(root: Box<dyn RunQueue>, worker_count: Option<usize>) -> Self {
		let worker_count = worker_count.unwrap_or_else(|| {
			thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
		});
		let root = Arc::new(Mutex::new(root));
		let wake = Arc::new(Condvar::new());
		let wake_lock = Arc::new(Mutex::new(()));
		let shutdown = Arc::new(AtomicBool::new(false));
		let handle = DispatcherHandle { root: Arc::clone(&root), wake: Arc::clone(&wake) };

		let workers = (0..worker_count)
			.map(|idx| {
				let root = Arc::clone(&root);
				let wake = Arc::clone(&wake);
				let wake_lock = Arc::clone(&wake_lock);
				let shutdown = Arc::clone(&shutdown);
				thread::Builder::new()
					.name(format!("raleighsl-worker-{idx}"))
					.spawn(move || worker_loop(idx, root, wake, wake_lock, shutdown))
					.expect("failed to spawn dispatcher worker thread")
			})
			.collect();

		Self { handle, wake_lock, shutdown, workers }
	}

	/// A cloneable handle other components can hold to submit work without
	/// owning this dispatcher.
	pub fn handle(&self) -> DispatcherHandle {
		self.handle.clone()
	}

	/// Submits a single task and wakes one worker.
	pub fn submit(&self, task: Task) {
		self.handle.submit(task);
	}

	/// Submits a batch of tasks and wakes every worker, since the batch may
	/// have landed across several run-queue classes.
	pub fn submit_many(&self, tasks: impl IntoIterator<Item = Task>) {
		self.handle.submit_many(tasks);
	}

	/// Resubmits everything an [`raleighsl_task::RwcSemaphore::release`] drained.
	pub fn resubmit_drained(&self, drained: Drained) {
		self.handle.resubmit_drained(drained);
	}

	/// Number of tasks currently sitting in the root run queue (not counting
	/// ones parked on a semaphore or mid-step on a worker).
	pub fn pending_len(&self) -> usize {
		self.handle.pending_len()
	}

	/// Signals every worker to stop after its current task and joins them.
	pub fn shutdown(mut self) {
		self.shutdown.store(true, Ordering::SeqCst);
		self.handle.wake.notify_all();
		for worker in self.workers.drain(..) {
			let _ = worker.join();
		}
	}
}

#[tracing::instrument(skip_all, fields(worker = idx))]
fn worker_loop(
	idx: usize,
	root: Arc<Mutex<Box<dyn RunQueue>>>,
	wake: Arc<Condvar>,
	wake_lock: Arc<Mutex<()>>,
	shutdown: Arc<AtomicBool>,
) {
	loop {
		if shutdown.load(Ordering::SeqCst) {
			return;
		}

		let fetched = root.lock().fetch();
		let Some(mut task) = fetched else {
			let mut guard = wake_lock.lock();
			if shutdown.load(Ordering::SeqCst) {
				return;
			}
			wake.wait_for(&mut guard, PARK_TIMEOUT);
			continue;
		};

		let task_was_barrier = task.flags.contains(TaskFlags::BARRIER);

		match task.step() {
			Outcome::Done => {
				root.lock().fini(task_was_barrier);
			}
			Outcome::Yield => {
				let mut guard = root.lock();
				guard.readd(task);
				guard.fini(task_was_barrier);
				drop(guard);
				wake.notify_one();
			}
			Outcome::Park => match task.wait_target() {
				Some(target) => {
					target.semaphore.park(target.mode, task);
					root.lock().fini(task_was_barrier);
				}
				None => {
					tracing::error!("task returned Outcome::Park with no wait_target; dropping it");
					root.lock().fini(task_was_barrier);
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use raleighsl_runqueue::FifoQueue;
	use raleighsl_task::TaskBody;
	use std::sync::mpsc;

	struct Report {
		tx: mpsc::Sender<u32>,
		value: u32,
	}

	impl TaskBody for Report {
		fn run(&mut self) -> Outcome {
			let _ = self.tx.send(self.value);
			Outcome::Done
		}
	}

	#[test]
	fn submitted_task_runs_to_completion() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(2));
		let (tx, rx) = mpsc::channel();
		dispatcher.submit(Task::new(Report { tx, value: 42 }));
		assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
		dispatcher.shutdown();
	}

	#[test]
	fn submit_many_runs_every_task() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(4));
		let (tx, rx) = mpsc::channel();
		let tasks = (0..8).map(|n| Task::new(Report { tx: tx.clone(), value: n }));
		dispatcher.submit_many(tasks);

		let mut seen: Vec<u32> = (0..8)
			.map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
			.collect();
		seen.sort_unstable();
		assert_eq!(seen, (0..8).collect::<Vec<_>>());
		dispatcher.shutdown();
	}

	struct ParkThenDone {
		sem: Arc<raleighsl_task::RwcSemaphore>,
		mode: raleighsl_task::RwcMode,
		tried: bool,
		tx: mpsc::Sender<()>,
	}

	impl TaskBody for ParkThenDone {
		fn run(&mut self) -> Outcome {
			if self.sem.try_acquire(self.mode) {
				let _ = self.tx.send(());
				Outcome::Done
			} else {
				self.tried = true;
				Outcome::Park
			}
		}

		fn wait_target(&self) -> Option<raleighsl_task::WaitTarget> {
			self.tried.then(|| raleighsl_task::WaitTarget { semaphore: Arc::clone(&self.sem), mode: self.mode })
		}
	}

	#[test]
	fn parked_task_resumes_after_release() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(2));
		let sem = Arc::new(raleighsl_task::RwcSemaphore::new());
		assert!(sem.try_acquire(raleighsl_task::RwcMode::Commit));

		let (tx, rx) = mpsc::channel();
		dispatcher.submit(Task::new(ParkThenDone {
			sem: Arc::clone(&sem),
			mode: raleighsl_task::RwcMode::Commit,
			tried: false,
			tx,
		}));

		// give the worker a moment to park on the semaphore
		thread::sleep(Duration::from_millis(50));
		let drained = sem.release(raleighsl_task::RwcMode::Commit);
		dispatcher.resubmit_drained(drained);

		assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
		dispatcher.shutdown();
	}
}
