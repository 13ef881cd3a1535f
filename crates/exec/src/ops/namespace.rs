use std::sync::Arc;

use raleighsl_dispatcher::DispatcherHandle;
use raleighsl_plugin::ObjectPlugin;
use raleighsl_task::{Outcome, RwcMode, RwcSemaphore, Task, TaskBody, WaitTarget};

use crate::object::{ObjectHandle, SemanticHandle};
use crate::response::{ExecResponse, Reply};

/// `semantic READ | semantic.open | completion`
struct LookupTask {
	semantic: SemanticHandle,
	name: String,
	acquired: bool,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl LookupTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for LookupTask {
	fn run(&mut self) -> Outcome {
		if !self.acquired {
			if !self.semantic.rwc.try_acquire(RwcMode::Read) {
				return Outcome::Park;
			}
			self.acquired = true;
		}

		let result = self.semantic.plugin.lookup(&self.name);
		let drained = self.semantic.rwc.release(RwcMode::Read);
		self.dispatcher.resubmit_drained(drained);

		match result {
			Ok(oid) => self.reply(Ok(ExecResponse::Oid(oid))),
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		(!self.acquired).then(|| WaitTarget { semaphore: Arc::clone(&self.semantic.rwc), mode: RwcMode::Read })
	}
}

/// Builds the task for the `lookup` entry point.
pub fn lookup(semantic: SemanticHandle, name: String, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	Task::new(LookupTask { semantic, name, acquired: false, dispatcher, reply: Some(reply) })
}

/// `semantic LOCK | semantic.rename | completion`
struct RenameTask {
	semantic: SemanticHandle,
	old_name: String,
	new_name: String,
	acquired: bool,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl RenameTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for RenameTask {
	fn run(&mut self) -> Outcome {
		if !self.acquired {
			if !self.semantic.rwc.try_acquire(RwcMode::Lock) {
				return Outcome::Park;
			}
			self.acquired = true;
		}

		let result = self.semantic.plugin.rename(&self.old_name, &self.new_name);
		let drained = self.semantic.rwc.release(RwcMode::Lock);
		self.dispatcher.resubmit_drained(drained);

		match result {
			Ok(()) => self.reply(Ok(ExecResponse::Unit)),
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		(!self.acquired).then(|| WaitTarget { semaphore: Arc::clone(&self.semantic.rwc), mode: RwcMode::Lock })
	}
}

/// Builds the task for the `rename` entry point.
pub fn rename(semantic: SemanticHandle, old_name: String, new_name: String, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	Task::new(RenameTask { semantic, old_name, new_name, acquired: false, dispatcher, reply: Some(reply) })
}

#[derive(PartialEq, Eq)]
enum CreateStep {
	SemanticLock,
	ObjectLock,
}

/// `semantic LOCK; on success, object LOCK for the new object | semantic.create, object.create`
struct CreateTask {
	semantic: SemanticHandle,
	object_plugin: Arc<dyn ObjectPlugin>,
	object_rwc: Arc<RwcSemaphore>,
	name: String,
	step: CreateStep,
	oid: Option<raleighsl_cache::Oid>,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl CreateTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for CreateTask {
	fn run(&mut self) -> Outcome {
		if self.step == CreateStep::SemanticLock {
			if !self.semantic.rwc.try_acquire(RwcMode::Lock) {
				return Outcome::Park;
			}
			let oid = self.semantic.plugin.next_oid();
			if let Err(err) = self.semantic.plugin.insert(&self.name, oid) {
				let drained = self.semantic.rwc.release(RwcMode::Lock);
				self.dispatcher.resubmit_drained(drained);
				self.reply(Err(err.into()));
				return Outcome::Done;
			}
			self.oid = Some(oid);
			self.step = CreateStep::ObjectLock;
		}

		if !self.object_rwc.try_acquire(RwcMode::Lock) {
			return Outcome::Park;
		}

		let result = self.object_plugin.create();
		// A freshly minted semaphore: nothing could have been waiting on it.
		self.object_rwc.release(RwcMode::Lock);
		let semantic_drained = self.semantic.rwc.release(RwcMode::Lock);
		self.dispatcher.resubmit_drained(semantic_drained);

		match result {
			Ok(state) => self.reply(Ok(ExecResponse::Created { oid: self.oid.expect("oid set before ObjectLock step"), state })),
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		match self.step {
			CreateStep::SemanticLock => Some(WaitTarget { semaphore: Arc::clone(&self.semantic.rwc), mode: RwcMode::Lock }),
			CreateStep::ObjectLock => Some(WaitTarget { semaphore: Arc::clone(&self.object_rwc), mode: RwcMode::Lock }),
		}
	}
}

/// Builds the task for the `create` entry point. `object_rwc` is the fresh
/// semaphore the caller will install alongside the new object's cache entry.
pub fn create(
	semantic: SemanticHandle,
	object_plugin: Arc<dyn ObjectPlugin>,
	object_rwc: Arc<RwcSemaphore>,
	name: String,
	dispatcher: DispatcherHandle,
	reply: Reply,
) -> Task {
	Task::new(CreateTask {
		semantic,
		object_plugin,
		object_rwc,
		name,
		step: CreateStep::SemanticLock,
		oid: None,
		dispatcher,
		reply: Some(reply),
	})
}

#[derive(PartialEq, Eq)]
enum UnlinkStep {
	SemanticLock,
	ObjectLock,
}

/// `semantic LOCK; object LOCK | semantic.unlink, object.close | completion`
struct UnlinkTask {
	semantic: SemanticHandle,
	object: ObjectHandle,
	name: String,
	step: UnlinkStep,
	dispatcher: DispatcherHandle,
	reply: Option<Reply>,
}

impl UnlinkTask {
	fn reply(&mut self, result: crate::Result<ExecResponse>) {
		if let Some(reply) = self.reply.take() {
			let _ = reply.send(result);
		}
	}
}

impl TaskBody for UnlinkTask {
	fn run(&mut self) -> Outcome {
		if self.step == UnlinkStep::SemanticLock {
			if !self.semantic.rwc.try_acquire(RwcMode::Lock) {
				return Outcome::Park;
			}
			if let Err(err) = self.semantic.plugin.remove(&self.name) {
				let drained = self.semantic.rwc.release(RwcMode::Lock);
				self.dispatcher.resubmit_drained(drained);
				self.reply(Err(err.into()));
				return Outcome::Done;
			}
			self.step = UnlinkStep::ObjectLock;
		}

		if !self.object.rwc.try_acquire(RwcMode::Lock) {
			return Outcome::Park;
		}

		let result = {
			let mut state = self.object.state.lock();
			self.object.plugin.close(&mut state)
		};
		let object_drained = self.object.rwc.release(RwcMode::Lock);
		self.dispatcher.resubmit_drained(object_drained);
		let semantic_drained = self.semantic.rwc.release(RwcMode::Lock);
		self.dispatcher.resubmit_drained(semantic_drained);

		match result {
			Ok(()) => self.reply(Ok(ExecResponse::Unit)),
			Err(err) => self.reply(Err(err.into())),
		}
		Outcome::Done
	}

	fn wait_target(&self) -> Option<WaitTarget> {
		match self.step {
			UnlinkStep::SemanticLock => Some(WaitTarget { semaphore: Arc::clone(&self.semantic.rwc), mode: RwcMode::Lock }),
			UnlinkStep::ObjectLock => Some(WaitTarget { semaphore: Arc::clone(&self.object.rwc), mode: RwcMode::Lock }),
		}
	}
}

/// Builds the task for the `unlink` entry point.
pub fn unlink(semantic: SemanticHandle, object: ObjectHandle, name: String, dispatcher: DispatcherHandle, reply: Reply) -> Task {
	Task::new(UnlinkTask { semantic, object, name, step: UnlinkStep::SemanticLock, dispatcher, reply: Some(reply) })
}
