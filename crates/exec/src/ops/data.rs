use std::sync::Arc;

use raleighsl_dispatcher::DispatcherHandle;
use raleighsl_task::{Outcome, RwcMode, Task, TaskBody, WaitTarget};
use raleighsl_txn::{Claim, TxnId, TxnManager};

use crate::object::ObjectHandle;
use crate::response::{ExecResponse, Reply};

/// `object READ under txn | object.read | completion on read`
struct ReadTask {
	object: ObjectHandle,
	offset: u64,
	len: usize,
	acquired: bool,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl ReadTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for ReadTask {
	fn run(&mut self) -> Outcome {
		if !self.acquired {
			if !self.object.rwc.try_acquire(RwcMode::Read) {
				return Outcome::Park;
			}
			self.acquired = true;
		}

		let mut buf = vec![0u8; self.len];
		let result = {
			let mut state = self.object.state.lock();
			self.object.plugin.read(&mut state, self.offset, &mut buf)
		};
		let drained = self.object.rwc.release(RwcMode::Read);
		self.dispatcher.resubmit_drained(drained);

		match result {
			Ok(n) => {
				buf.truncate(n);
				self.reply(Ok(ExecResponse::Bytes(buf)));
			}
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		(!self.acquired).then(|| WaitTarget { semaphore: Arc::clone(&self.object.rwc), mode: RwcMode::Read })
	}
}

/// Builds the task for the `read` entry point.
pub fn read(object: ObjectHandle, offset: u64, len: usize, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	Task::new(ReadTask { object, offset, len, acquired: false, dispatcher, reply: Some(reply) })
}

/// `object WRITE under txn (plus pending-txn arbitration) | object.write | completion`
struct WriteTask {
	object: ObjectHandle,
	txn: Arc<TxnManager>,
	txn_id: TxnId,
	offset: u64,
	data: Vec<u8>,
	claimed: bool,
	acquired: bool,
	blocked_on: Option<Arc<raleighsl_task::RwcSemaphore>>,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl WriteTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for WriteTask {
	fn run(&mut self) -> Outcome {
		if !self.claimed {
			match self.txn.try_claim_write(self.txn_id, self.object.oid) {
				Claim::Owned => {
					if let Err(err) = self.txn.enlist(self.txn_id, self.object.oid) {
						self.reply(Err(err.into()));
						return Outcome::Done;
					}
					self.claimed = true;
				}
				Claim::AlreadyOwned => self.claimed = true,
				Claim::Blocked(sem) => {
					self.blocked_on = Some(sem);
					return Outcome::Park;
				}
			}
		}

		if !self.acquired {
			if !self.object.rwc.try_acquire(RwcMode::Write) {
				return Outcome::Park;
			}
			self.acquired = true;
		}

		let result = {
			let mut state = self.object.state.lock();
			self.object.plugin.write(&mut state, self.offset, &self.data)
		};
		let drained = self.object.rwc.release(RwcMode::Write);
		self.dispatcher.resubmit_drained(drained);

		match result {
			Ok(n) => self.reply(Ok(ExecResponse::Written(n))),
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		if !self.claimed {
			return self.blocked_on.as_ref().map(|sem| WaitTarget { semaphore: Arc::clone(sem), mode: RwcMode::Write });
		}
		(!self.acquired).then(|| WaitTarget { semaphore: Arc::clone(&self.object.rwc), mode: RwcMode::Write })
	}
}

/// Builds the task for the `write` entry point.
pub fn write(
	object: ObjectHandle,
	txn: Arc<TxnManager>,
	txn_id: TxnId,
	offset: u64,
	data: Vec<u8>,
	dispatcher: DispatcherHandle,
	reply: Reply,
) -> Task {
	Task::new(WriteTask {
		object,
		txn,
		txn_id,
		offset,
		data,
		claimed: false,
		acquired: false,
		blocked_on: None,
		dispatcher,
		reply: Some(reply),
	})
}
