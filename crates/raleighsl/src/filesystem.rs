use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use raleighsl_cache::{LruPolicy, MruPolicy, ObjectCache, Oid};
use raleighsl_codec::{MasterBlock, MASTER_BLOCK_LEN};
use raleighsl_dispatcher::Dispatcher;
use raleighsl_exec::{ExecResponse, ObjectHandle, RaleighError, Reply, SemanticHandle};
use raleighsl_plugin::{FormatPlugin, KeyPlugin, ObjectPlugin, PluginRegistry, SemanticPlugin, SpacePlugin};
use raleighsl_runqueue::{FifoQueue, RoundRobinQueue};
use raleighsl_task::{RwcSemaphore, Task};
use raleighsl_txn::{TxnId, TxnManager};
use uuid::Uuid;

use crate::config::{EvictionPolicyKind, RaleighConfig};
use crate::device::DeviceHandle;
use crate::error::{FilesystemError, Result};
use crate::object::ObjectEntry;
use crate::reaper;

fn now_micros() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_micros() as u64
}

/// Everything bound at `create`/`open` time: the on-device header plus the
/// three plugins a filesystem can't operate without.
struct OpenState {
	master_block: MasterBlock,
	#[allow(dead_code)] // kept for parity with the on-device header; not yet read back outside open()
	format: Arc<dyn FormatPlugin>,
	space: Arc<dyn SpacePlugin>,
	semantic: SemanticHandle,
}

/// Point-in-time counters describing one filesystem instance.
#[derive(Debug, Clone, Copy)]
pub struct FilesystemStats {
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub cached_objects: usize,
	pub pending_tasks: usize,
}

/// Binds a master block, a pluggable object cache, a transaction manager,
/// and a dispatcher into one embeddable storage engine.
///
/// Plugins are installed into per-role registries before `create`/`open`
/// selects which ones this instance actually uses: format plugins by the
/// uuid persisted in the master block, space and semantic plugins by the
/// label the caller supplies (a filesystem doesn't persist which space or
/// semantic layer it was opened with — only the format is fixed at
/// creation time).
pub struct Filesystem {
	device: Arc<dyn DeviceHandle>,
	object_plugins: RwLock<PluginRegistry<dyn ObjectPlugin>>,
	semantic_plugins: RwLock<PluginRegistry<dyn SemanticPlugin>>,
	space_plugins: RwLock<PluginRegistry<dyn SpacePlugin>>,
	format_plugins: RwLock<PluginRegistry<dyn FormatPlugin>>,
	key_plugins: RwLock<PluginRegistry<dyn KeyPlugin>>,
	cache: ObjectCache<ObjectEntry>,
	txn: Arc<TxnManager>,
	dispatcher: Dispatcher,
	config: RaleighConfig,
	opened: Mutex<Option<OpenState>>,
}

impl Filesystem {
	/// Builds a filesystem over `device` and spawns its background reaper.
	/// Returned as an `Arc` because the reaper only holds a `Weak` reference
	/// back to it.
	pub fn new(device: Arc<dyn DeviceHandle>, config: RaleighConfig) -> Arc<Self> {
		let txn = Arc::new(TxnManager::new(config.reaper_staleness_micros));
		let gate_txn = Arc::clone(&txn);
		let cache = ObjectCache::new(config.cache_capacity, Self::policy(&config), move |entry: &ObjectEntry| {
			!gate_txn.is_pending(entry.oid)
		});

		let root: Box<dyn raleighsl_runqueue::RunQueue> =
			Box::new(RoundRobinQueue::new(vec![Box::new(FifoQueue::new())], config.round_robin_quantum));
		let dispatcher = Dispatcher::new(root, config.worker_threads);

		let filesystem = Arc::new(Self {
			device,
			object_plugins: RwLock::new(PluginRegistry::new()),
			semantic_plugins: RwLock::new(PluginRegistry::new()),
			space_plugins: RwLock::new(PluginRegistry::new()),
			format_plugins: RwLock::new(PluginRegistry::new()),
			key_plugins: RwLock::new(PluginRegistry::new()),
			cache,
			txn,
			dispatcher,
			config,
			opened: Mutex::new(None),
		});
		reaper::spawn(&filesystem);
		filesystem
	}

	fn policy(config: &RaleighConfig) -> Box<dyn raleighsl_cache::EvictionPolicy> {
		match config.eviction_policy {
			EvictionPolicyKind::Lru => Box::new(LruPolicy::new()),
			EvictionPolicyKind::Mru => Box::new(MruPolicy::new()),
		}
	}

	pub(crate) fn reaper_interval(&self) -> std::time::Duration {
		std::time::Duration::from_micros(self.config.reaper_interval_micros)
	}

	pub(crate) fn submit(&self, task: Task) {
		self.dispatcher.submit(task);
	}

	pub fn install_object_plugin(&self, plugin: Arc<dyn ObjectPlugin>) -> Result<()> {
		Ok(self.object_plugins.write().install(plugin)?)
	}

	pub fn install_semantic_plugin(&self, plugin: Arc<dyn SemanticPlugin>) -> Result<()> {
		Ok(self.semantic_plugins.write().install(plugin)?)
	}

	pub fn install_space_plugin(&self, plugin: Arc<dyn SpacePlugin>) -> Result<()> {
		Ok(self.space_plugins.write().install(plugin)?)
	}

	pub fn install_format_plugin(&self, plugin: Arc<dyn FormatPlugin>) -> Result<()> {
		Ok(self.format_plugins.write().install(plugin)?)
	}

	pub fn install_key_plugin(&self, plugin: Arc<dyn KeyPlugin>) -> Result<()> {
		Ok(self.key_plugins.write().install(plugin)?)
	}

	/// Formats `device` with a fresh master block naming `format_uuid` (the
	/// plugin's own uuid doubles as the filesystem's persisted identity) and
	/// binds `space_label`/`semantic_label` for this session.
	pub fn create(&self, format_uuid: Uuid, space_label: &str, semantic_label: &str, label: &str) -> Result<()> {
		let mut opened = self.opened.lock();
		if opened.is_some() {
			return Err(FilesystemError::AlreadyOpen);
		}

		let format =
			self.format_plugins.read().lookup_by_uuid(&format_uuid).ok_or(FilesystemError::FormatPluginNotFound)?;
		let space =
			self.space_plugins.read().lookup_by_label(space_label).ok_or(FilesystemError::SpacePluginNotFound)?;
		let semantic_plugin = self
			.semantic_plugins
			.read()
			.lookup_by_label(semantic_label)
			.ok_or(FilesystemError::SemanticPluginNotFound)?;

		let master_block =
			MasterBlock { format_id: format.format_id(), ctime: now_micros(), uuid: *format_uuid.as_bytes(), label: label.to_string() };
		let encoded = master_block.encode()?;
		self.device.write_at(0, &encoded)?;
		self.device.sync()?;

		*opened = Some(OpenState {
			master_block,
			format,
			space,
			semantic: SemanticHandle { plugin: semantic_plugin, rwc: Arc::new(RwcSemaphore::new()) },
		});
		Ok(())
	}

	/// Reads the master block off `device`, validates it against the format
	/// plugin it names, and binds `space_label`/`semantic_label`.
	pub fn open(&self, space_label: &str, semantic_label: &str) -> Result<()> {
		let mut opened = self.opened.lock();
		if opened.is_some() {
			return Err(FilesystemError::AlreadyOpen);
		}

		let mut raw = [0u8; MASTER_BLOCK_LEN];
		self.device.read_at(0, &mut raw)?;
		let master_block = MasterBlock::decode(&raw[..])?;

		let format_uuid = Uuid::from_bytes(master_block.uuid);
		let format =
			self.format_plugins.read().lookup_by_uuid(&format_uuid).ok_or(FilesystemError::FormatPluginNotFound)?;
		if format.format_id() != master_block.format_id {
			return Err(FilesystemError::FormatMismatch { on_device: master_block.format_id, plugin: format.format_id() });
		}
		format.validate(&master_block)?;

		let space =
			self.space_plugins.read().lookup_by_label(space_label).ok_or(FilesystemError::SpacePluginNotFound)?;
		let semantic_plugin = self
			.semantic_plugins
			.read()
			.lookup_by_label(semantic_label)
			.ok_or(FilesystemError::SemanticPluginNotFound)?;

		*opened = Some(OpenState {
			master_block,
			format,
			space,
			semantic: SemanticHandle { plugin: semantic_plugin, rwc: Arc::new(RwcSemaphore::new()) },
		});
		Ok(())
	}

	/// Runs a best-effort sync hook: a plugin that doesn't implement `sync`
	/// just logs and is skipped, rather than failing the whole sync/close.
	fn best_effort_sync(what: &str, result: raleighsl_plugin::PluginResult<()>) {
		match result {
			Ok(()) => {}
			Err(raleighsl_plugin::PluginError::NotImplemented) => {
				tracing::debug!(what, "plugin does not implement sync; skipping");
			}
			Err(err) => {
				tracing::warn!(what, %err, "plugin sync failed");
			}
		}
	}

	pub fn close(&self) -> Result<()> {
		let mut opened = self.opened.lock();
		let state = opened.take().ok_or(FilesystemError::NotOpen)?;
		Self::best_effort_sync("semantic", state.semantic.plugin.sync());
		Self::best_effort_sync("space", state.space.sync());
		self.device.sync()?;
		Ok(())
	}

	pub fn sync(&self) -> Result<()> {
		let opened = self.opened.lock();
		let state = opened.as_ref().ok_or(FilesystemError::NotOpen)?;
		Self::best_effort_sync("semantic", state.semantic.plugin.sync());
		Self::best_effort_sync("space", state.space.sync());
		self.device.sync()?;
		Ok(())
	}

	fn semantic_handle(&self) -> Result<SemanticHandle> {
		Ok(self.opened.lock().as_ref().ok_or(FilesystemError::NotOpen)?.semantic.clone())
	}

	fn object_handle(&self, oid: Oid) -> Result<ObjectHandle> {
		let entry = self.cache.lookup(oid).ok_or(FilesystemError::ObjectNotCached(oid))?;
		Ok(entry.with(|o| ObjectHandle { oid, plugin: Arc::clone(&o.plugin), state: Arc::clone(&o.state), rwc: Arc::clone(&o.rwc) }))
	}

	fn enlisted_handles(&self, txn_id: TxnId) -> Result<Vec<ObjectHandle>> {
		let txn = self.txn.get(txn_id).ok_or(FilesystemError::Exec(RaleighError::TxnNotFound))?;
		txn.enlisted_oids().into_iter().map(|oid| self.object_handle(oid)).collect()
	}

	fn submit_and_wait(&self, build: impl FnOnce(Reply) -> Task) -> Result<ExecResponse> {
		let (tx, rx) = tokio::sync::oneshot::channel();
		self.dispatcher.submit(build(tx));
		match rx.blocking_recv() {
			Ok(Ok(response)) => Ok(response),
			Ok(Err(err)) => Err(err.into()),
			Err(_) => Err(FilesystemError::ReplyDropped),
		}
	}

	/// Creates a new object named `name` in the bound semantic namespace,
	/// backed by the installed object plugin `object_plugin_uuid`, and seeds
	/// the cache with it.
	pub fn create_object(&self, name: &str, object_plugin_uuid: Uuid) -> Result<Oid> {
		let semantic = self.semantic_handle()?;
		let object_plugin =
			self.object_plugins.read().lookup_by_uuid(&object_plugin_uuid).ok_or(FilesystemError::ObjectPluginNotFound)?;
		let object_rwc = Arc::new(RwcSemaphore::new());
		let handle = self.dispatcher.handle();
		let plugin_for_task = Arc::clone(&object_plugin);
		let rwc_for_task = Arc::clone(&object_rwc);
		let name_owned = name.to_string();

		match self.submit_and_wait(move |reply| {
			raleighsl_exec::create(semantic, plugin_for_task, rwc_for_task, name_owned, handle, reply)
		})? {
			ExecResponse::Created { oid, state } => {
				let entry = ObjectEntry { oid, plugin: object_plugin, state: Arc::new(Mutex::new(state)), rwc: object_rwc };
				self.cache.try_insert(oid, entry, 1);
				Ok(oid)
			}
			_ => Err(FilesystemError::Exec(RaleighError::Internal("create returned an unexpected response".into()))),
		}
	}

	pub fn lookup(&self, name: &str) -> Result<Oid> {
		let semantic = self.semantic_handle()?;
		let handle = self.dispatcher.handle();
		let name_owned = name.to_string();
		match self.submit_and_wait(move |reply| raleighsl_exec::lookup(semantic, name_owned, handle, reply))? {
			ExecResponse::Oid(oid) => Ok(oid),
			_ => Err(FilesystemError::Exec(RaleighError::Internal("lookup returned an unexpected response".into()))),
		}
	}

	pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
		let semantic = self.semantic_handle()?;
		let handle = self.dispatcher.handle();
		let old_owned = old_name.to_string();
		let new_owned = new_name.to_string();
		self.submit_and_wait(move |reply| raleighsl_exec::rename(semantic, old_owned, new_owned, handle, reply))?;
		Ok(())
	}

	pub fn unlink(&self, name: &str) -> Result<()> {
		let semantic = self.semantic_handle()?;
		let oid = self.lookup(name)?;
		let object = self.object_handle(oid)?;
		let handle = self.dispatcher.handle();
		let name_owned = name.to_string();
		self.submit_and_wait(move |reply| raleighsl_exec::unlink(semantic, object, name_owned, handle, reply))?;
		self.cache.remove(oid);
		Ok(())
	}

	pub fn read(&self, oid: Oid, offset: u64, len: usize) -> Result<Vec<u8>> {
		let object = self.object_handle(oid)?;
		let handle = self.dispatcher.handle();
		match self.submit_and_wait(move |reply| raleighsl_exec::read(object, offset, len, handle, reply))? {
			ExecResponse::Bytes(buf) => Ok(buf),
			_ => Err(FilesystemError::Exec(RaleighError::Internal("read returned an unexpected response".into()))),
		}
	}

	pub fn write(&self, oid: Oid, txn_id: TxnId, offset: u64, data: Vec<u8>) -> Result<usize> {
		let object = self.object_handle(oid)?;
		let handle = self.dispatcher.handle();
		let txn = Arc::clone(&self.txn);
		match self.submit_and_wait(move |reply| raleighsl_exec::write(object, txn, txn_id, offset, data, handle, reply))? {
			ExecResponse::Written(n) => Ok(n),
			_ => Err(FilesystemError::Exec(RaleighError::Internal("write returned an unexpected response".into()))),
		}
	}

	pub fn begin(&self) -> TxnId {
		self.txn.begin(now_micros())
	}

	pub fn commit(&self, txn_id: TxnId) -> Result<()> {
		let objects = self.enlisted_handles(txn_id)?;
		let handle = self.dispatcher.handle();
		let txn = Arc::clone(&self.txn);
		self.submit_and_wait(move |reply| raleighsl_exec::commit(txn, txn_id, objects, handle, reply))?;
		Ok(())
	}

	pub fn rollback(&self, txn_id: TxnId) -> Result<()> {
		let objects = self.enlisted_handles(txn_id)?;
		let handle = self.dispatcher.handle();
		let txn = Arc::clone(&self.txn);
		self.submit_and_wait(move |reply| raleighsl_exec::rollback(txn, txn_id, objects, handle, reply))?;
		Ok(())
	}

	/// Rolls back every transaction idle past the reaper's staleness
	/// threshold. Returns how many were reaped.
	pub fn reap(&self) -> usize {
		let stale = self.txn.reap(now_micros());
		let mut reaped = 0;
		for txn_id in stale {
			match self.rollback(txn_id) {
				Ok(()) => reaped += 1,
				Err(err) => tracing::warn!(txn_id, %err, "reaper failed to roll back a stale transaction"),
			}
		}
		reaped
	}

	pub fn stats(&self) -> FilesystemStats {
		FilesystemStats {
			cache_hits: self.cache.stats().hits(),
			cache_misses: self.cache.stats().misses(),
			cached_objects: self.cache.dump().len(),
			pending_tasks: self.dispatcher.pending_len(),
		}
	}

	/// Stops the dispatcher's worker pool. Only actually shuts it down once
	/// `self` is the last strong reference; otherwise logs and leaves it
	/// running, since other handles may still be submitting work.
	pub fn shutdown(self: Arc<Self>) {
		match Arc::try_unwrap(self) {
			Ok(filesystem) => filesystem.dispatcher.shutdown(),
			Err(_arc) => {
				tracing::warn!("shutdown called with outstanding Filesystem handles; dispatcher left running");
			}
		}
	}
}
