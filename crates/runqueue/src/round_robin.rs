use raleighsl_task::Task;

use crate::RunQueue;

/// Composes several peer run queues, fetching up to `quantum` tasks from
/// one peer before rotating to the next non-empty peer.
///
/// This is how the global dispatcher shares one worker pool across many
/// independent groups (e.g. one [`GroupQueue`](crate::GroupQueue) per
/// tenant): each peer is scheduled fairly at the granularity of a quantum
/// rather than a single task.
pub struct RoundRobinQueue {
	peers: Vec<Box<dyn RunQueue>>,
	quantum: u32,
	current: usize,
	consumed: u32,
	next_add: usize,
}

impl RoundRobinQueue {
	pub fn new(peers: Vec<Box<dyn RunQueue>>, quantum: u32) -> Self {
		Self { peers, quantum: quantum.max(1), current: 0, consumed: 0, next_add: 0 }
	}

	/// Adds a task to a specific peer by index.
	pub fn add_to(&mut self, peer: usize, task: Task) {
		self.peers[peer].add(task);
	}

	pub fn peer_count(&self) -> usize {
		self.peers.len()
	}

	fn rotate(&mut self) {
		if !self.peers.is_empty() {
			self.current = (self.current + 1) % self.peers.len();
		}
		self.consumed = 0;
	}
}

impl RunQueue for RoundRobinQueue {
	/// Fresh tasks without a target peer are spread round-robin across
	/// peers; callers that need to target a specific peer should use
	/// [`add_to`](Self::add_to) instead.
	fn add(&mut self, task: Task) {
		if self.peers.is_empty() {
			return;
		}
		let peer = self.next_add % self.peers.len();
		self.next_add = self.next_add.wrapping_add(1);
		self.peers[peer].add(task);
	}

	fn readd(&mut self, task: Task) {
		if self.peers.is_empty() {
			return;
		}
		self.peers[self.current].readd(task);
	}

	fn fetch(&mut self) -> Option<Task> {
		if self.peers.is_empty() {
			return None;
		}
		let n = self.peers.len();
		for _ in 0..=n {
			if self.consumed >= self.quantum || self.peers[self.current].is_empty() {
				self.rotate();
				if self.peers.iter().all(|p| p.is_empty()) {
					return None;
				}
				continue;
			}
			if let Some(task) = self.peers[self.current].fetch() {
				self.consumed += 1;
				return Some(task);
			}
			self.rotate();
		}
		None
	}

	fn len(&self) -> usize {
		self.peers.iter().map(|p| p.len()).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::FifoQueue;
	use raleighsl_task::{Outcome, Task, TaskBody};

	struct Noop;
	impl TaskBody for Noop {
		fn run(&mut self) -> Outcome {
			Outcome::Done
		}
	}

	fn tagged(n: u32) -> Task {
		let mut t = Task::new(Noop);
		t.priority = n;
		t
	}

	#[test]
	fn rotates_after_quantum_exhausted() {
		let peers: Vec<Box<dyn RunQueue>> =
			vec![Box::new(FifoQueue::new()), Box::new(FifoQueue::new())];
		let mut rq = RoundRobinQueue::new(peers, 1);
		rq.add_to(0, tagged(1));
		rq.add_to(0, tagged(2));
		rq.add_to(1, tagged(3));

		let first = rq.fetch().unwrap();
		assert_eq!(first.priority, 1); // peer 0, first quantum
		let second = rq.fetch().unwrap();
		assert_eq!(second.priority, 3); // rotated to peer 1
	}

	#[test]
	fn empty_peers_are_skipped() {
		let peers: Vec<Box<dyn RunQueue>> =
			vec![Box::new(FifoQueue::new()), Box::new(FifoQueue::new())];
		let mut rq = RoundRobinQueue::new(peers, 5);
		rq.add_to(1, tagged(9));
		assert_eq!(rq.fetch().unwrap().priority, 9);
		assert!(rq.fetch().is_none());
	}
}
