use std::sync::Arc;

use raleighsl_dispatcher::DispatcherHandle;
use raleighsl_task::{Outcome, RwcMode, Task, TaskBody, WaitTarget};
use raleighsl_txn::{TxnId, TxnManager};

use crate::error::RaleighError;
use crate::object::ObjectHandle;
use crate::response::{ExecResponse, Reply};

/// `object COMMIT per enlisted object, OID-sorted | object.commit | completion`
///
/// `objects` must already be OID-sorted (the order [`raleighsl_txn::Transaction::enlisted_oids`]
/// gives for free) to avoid deadlocking against a concurrent commit that
/// shares one of these objects. If any object's plugin commit fails, the
/// transaction is moved to `DONT_COMMIT` and every object from that point on
/// — including the one that just failed — is unwound through rollback
/// instead, so the transaction still reaches a single, consistent terminal
/// state.
struct CommitTask {
	txn: Arc<TxnManager>,
	txn_id: TxnId,
	objects: Vec<ObjectHandle>,
	idx: usize,
	escalated: bool,
	failed: Option<RaleighError>,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl CommitTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for CommitTask {
	fn run(&mut self) -> Outcome {
		loop {
			if self.idx >= self.objects.len() {
				let result = if let Some(err) = self.failed.take() {
					let _ = self.txn.complete_rollback(self.txn_id);
					Err(err)
				} else {
					match self.txn.complete_commit(self.txn_id) {
						Ok(()) => Ok(ExecResponse::Unit),
						Err(err) => Err(err.into()),
					}
				};
				self.reply(result);
				return Outcome::Done;
			}

			let rolling_back = self.failed.is_some();
			let object = self.objects[self.idx].clone();

			if !self.escalated {
				let escalated =
					if rolling_back { self.txn.try_escalate_rollback(object.oid) } else { self.txn.try_escalate_commit(object.oid) };
				if !escalated {
					return Outcome::Park;
				}
				self.escalated = true;
			}

			let outcome = {
				let mut state = object.state.lock();
				if rolling_back { object.plugin.rollback(&mut state) } else { object.plugin.commit(&mut state) }
			};

			let drained = if rolling_back {
				self.txn.finish_object_rollback(self.txn_id, object.oid)
			} else {
				self.txn.finish_object_commit(self.txn_id, object.oid)
			};
			self.dispatcher.resubmit_drained(drained);
			self.escalated = false;

			if let Err(err) = outcome
				&& self.failed.is_none()
			{
				self.failed = Some(err.into());
				let _ = self.txn.abort_to_rollback(self.txn_id);
				// Unwind this same object under rollback before moving on.
				continue;
			}

			self.idx += 1;
		}
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		if self.escalated || self.idx >= self.objects.len() {
			return None;
		}
		let mode = if self.failed.is_some() { RwcMode::Lock } else { RwcMode::Commit };
		Some(WaitTarget { semaphore: Arc::clone(&self.objects[self.idx].rwc), mode })
	}
}

/// Builds the task for the `txn commit` entry point. `objects` must already
/// be sorted by OID.
pub fn commit(txn: Arc<TxnManager>, txn_id: TxnId, objects: Vec<ObjectHandle>, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	Task::new(CommitTask { txn, txn_id, objects, idx: 0, escalated: false, failed: None, dispatcher, reply: Some(reply) })
}

/// `object LOCK per enlisted object, OID-sorted | object.rollback | completion`
struct RollbackTask {
	txn: Arc<TxnManager>,
	txn_id: TxnId,
	objects: Vec<ObjectHandle>,
	idx: usize,
	escalated: bool,
	first_error: Option<RaleighError>,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl RollbackTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for RollbackTask {
	fn run(&mut self) -> Outcome {
		loop {
			if self.idx >= self.objects.len() {
				let result = match self.first_error.take() {
					Some(err) => {
						let _ = self.txn.complete_rollback(self.txn_id);
						Err(err)
					}
					None => match self.txn.complete_rollback(self.txn_id) {
						Ok(()) => Ok(ExecResponse::Unit),
						Err(err) => Err(err.into()),
					},
				};
				self.reply(result);
				return Outcome::Done;
			}

			let object = self.objects[self.idx].clone();
			if !self.escalated {
				if !self.txn.try_escalate_rollback(object.oid) {
					return Outcome::Park;
				}
				self.escalated = true;
			}

			let outcome = {
				let mut state = object.state.lock();
				object.plugin.rollback(&mut state)
			};
			if let Err(err) = outcome
				&& self.first_error.is_none()
			{
				self.first_error = Some(err.into());
			}

			let drained = self.txn.finish_object_rollback(self.txn_id, object.oid);
			self.dispatcher.resubmit_drained(drained);

			self.idx += 1;
			self.escalated = false;
		}
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		if self.escalated || self.idx >= self.objects.len() {
			return None;
		}
		Some(WaitTarget { semaphore: Arc::clone(&self.objects[self.idx].rwc), mode: RwcMode::Lock })
	}
}

/// Builds the task for the `txn rollback` entry point. Moves the
/// transaction to `DONT_COMMIT` immediately, before the per-object unwind
/// starts, matching the state diagram's only path into `ROLLEDBACK`.
pub fn rollback(txn: Arc<TxnManager>, txn_id: TxnId, objects: Vec<ObjectHandle>, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	let _ = txn.abort_to_rollback(txn_id);
	Task::new(RollbackTask { txn, txn_id, objects, idx: 0, escalated: false, first_error: None, dispatcher, reply: Some(reply) })
}

#[cfg(test)]
mod tests {
	use std::any::Any;

	use parking_lot::Mutex;
	use raleighsl_dispatcher::Dispatcher;
	use raleighsl_plugin::{ObjectPlugin, ObjectState, Plugin, PluginHeader, PluginKind, PluginResult};
	use raleighsl_runqueue::FifoQueue;
	use raleighsl_task::RwcSemaphore;

	use super::*;

	struct CountingPlugin {
		header: PluginHeader,
		fail_commit: bool,
	}

	impl Plugin for CountingPlugin {
		fn header(&self) -> &PluginHeader {
			&self.header
		}
	}

	impl ObjectPlugin for CountingPlugin {
		fn create(&self) -> PluginResult<ObjectState> {
			Ok(Box::new(0u32))
		}
		fn open(&self, _persisted: &[u8]) -> PluginResult<ObjectState> {
			Ok(Box::new(0u32))
		}
		fn read(&self, _state: &mut ObjectState, _offset: u64, _out: &mut [u8]) -> PluginResult<usize> {
			Ok(0)
		}
		fn write(&self, _state: &mut ObjectState, _offset: u64, _data: &[u8]) -> PluginResult<usize> {
			Ok(0)
		}
		fn commit(&self, state: &mut ObjectState) -> PluginResult<()> {
			if self.fail_commit {
				return Err(raleighsl_plugin::PluginError::Io("device offline".into()));
			}
			*state.downcast_mut::<u32>().unwrap() += 1;
			Ok(())
		}
		fn rollback(&self, state: &mut ObjectState) -> PluginResult<()> {
			*state.downcast_mut::<u32>().unwrap() = 0;
			Ok(())
		}
	}

	fn object(oid: raleighsl_cache::Oid, fail_commit: bool) -> ObjectHandle {
		ObjectHandle {
			oid,
			plugin: Arc::new(CountingPlugin {
				header: PluginHeader::new(PluginKind::Object, uuid::Uuid::from_bytes([5; 16]), "counting", ""),
				fail_commit,
			}),
			state: Arc::new(Mutex::new(Box::new(0u32) as Box<dyn Any + Send>)),
			rwc: Arc::new(RwcSemaphore::new()),
		}
	}

	#[test]
	fn commit_runs_every_object_in_order_and_completes() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(2));
		let txn = Arc::new(TxnManager::new(1_000_000));
		let t1 = txn.begin(0);
		let objects = vec![object(1, false), object(2, false)];

		let (tx, rx) = tokio::sync::oneshot::channel();
		dispatcher.submit(commit(Arc::clone(&txn), t1, objects, dispatcher.handle(), tx));
		assert!(matches!(rx.blocking_recv().unwrap().unwrap(), ExecResponse::Unit));
		assert_eq!(txn.get(t1).unwrap().state(), raleighsl_txn::TxnState::Committed);
		dispatcher.shutdown();
	}

	#[test]
	fn failed_commit_unwinds_through_rollback() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(2));
		let txn = Arc::new(TxnManager::new(1_000_000));
		let t1 = txn.begin(0);
		let objects = vec![object(1, true)];

		let (tx, rx) = tokio::sync::oneshot::channel();
		dispatcher.submit(commit(Arc::clone(&txn), t1, objects, dispatcher.handle(), tx));
		assert!(rx.blocking_recv().unwrap().is_err());
		assert_eq!(txn.get(t1).unwrap().state(), raleighsl_txn::TxnState::RolledBack);
		dispatcher.shutdown();
	}

	#[test]
	fn rollback_clears_every_enlisted_object() {
		let dispatcher = Dispatcher::new(Box::new(FifoQueue::new()), Some(2));
		let txn = Arc::new(TxnManager::new(1_000_000));
		let t1 = txn.begin(0);
		let objects = vec![object(1, false)];

		let (tx, rx) = tokio::sync::oneshot::channel();
		dispatcher.submit(rollback(Arc::clone(&txn), t1, objects, dispatcher.handle(), tx));
		assert!(matches!(rx.blocking_recv().unwrap().unwrap(), ExecResponse::Unit));
		assert_eq!(txn.get(t1).unwrap().state(), raleighsl_txn::TxnState::RolledBack);
		dispatcher.shutdown();
	}
}
