use std::sync::Arc;

use parking_lot::Mutex;
use raleighsl_cache::Oid;
use raleighsl_plugin::{ObjectPlugin, ObjectState, SemanticPlugin};
use raleighsl_task::RwcSemaphore;

/// Everything an exec task needs to operate on one cached object: its
/// plugin, its boxed per-object state, and the RWC lock arbitrating access.
/// Built by the filesystem façade from a live cache entry — the exec layer
/// never looks inside the object cache itself, only at handles it is given.
#[derive(Clone)]
pub struct ObjectHandle {
	pub oid: Oid,
	pub plugin: Arc<dyn ObjectPlugin>,
	pub state: Arc<Mutex<ObjectState>>,
	pub rwc: Arc<RwcSemaphore>,
}

/// The namespace-wide plugin and lock a filesystem's semantic layer exposes
/// to `create`/`lookup`/`rename`/`unlink`.
#[derive(Clone)]
pub struct SemanticHandle {
	pub plugin: Arc<dyn SemanticPlugin>,
	pub rwc: Arc<RwcSemaphore>,
}
