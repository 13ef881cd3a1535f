use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use raleighsl_task::{Outcome, Task, TaskBody};

use crate::filesystem::Filesystem;

/// Bounds how long a single step sleeps before checking whether it should
/// give another worker a turn; keeps a not-yet-due reaper from tying up a
/// worker thread indefinitely.
const MAX_SLEEP: Duration = Duration::from_millis(100);

/// Drives the transaction reaper as an ordinary resubmitted task rather
/// than a dedicated OS thread. A step either sleeps in bounded increments
/// until the next sweep is due, or sweeps and reschedules. Only ever holds
/// a `Weak` reference, so it never keeps the filesystem alive on its own
/// and stops resubmitting once the last strong reference drops.
struct ReaperTask {
	filesystem: Weak<Filesystem>,
	interval: Duration,
	next_due: Instant,
}

impl TaskBody for ReaperTask {
	fn run(&mut self) -> Outcome {
		let Some(filesystem) = self.filesystem.upgrade() else {
			return Outcome::Done;
		};

		let now = Instant::now();
		if now < self.next_due {
			std::thread::sleep((self.next_due - now).min(MAX_SLEEP));
			return Outcome::Yield;
		}

		let reaped = filesystem.reap();
		if reaped > 0 {
			tracing::debug!(reaped, "reaper rolled back stale transactions");
		}
		self.next_due = Instant::now() + self.interval;
		Outcome::Yield
	}
}

/// Submits the reaper task for `filesystem`. It keeps resubmitting itself
/// until every strong reference to `filesystem` is gone.
pub fn spawn(filesystem: &Arc<Filesystem>) {
	let interval = filesystem.reaper_interval();
	let task = Task::new(ReaperTask { filesystem: Arc::downgrade(filesystem), interval, next_due: Instant::now() });
	filesystem.submit(task);
}
