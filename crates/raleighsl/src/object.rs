use std::sync::Arc;

use parking_lot::Mutex;
use raleighsl_cache::{CacheObject, Oid};
use raleighsl_plugin::{ObjectPlugin, ObjectState};
use raleighsl_task::RwcSemaphore;

/// The façade's own [`CacheObject`]: an object's plugin, boxed per-object
/// state, and RWC lock, bundled exactly the way the exec layer's
/// `ObjectHandle` expects to receive them.
pub struct ObjectEntry {
	pub oid: Oid,
	pub plugin: Arc<dyn ObjectPlugin>,
	pub state: Arc<Mutex<ObjectState>>,
	pub rwc: Arc<RwcSemaphore>,
}

impl CacheObject for ObjectEntry {
	/// Releases in-memory buffers on eviction. Persisted data survives;
	/// `unlink` is what calls the plugin's `destroy`, not this.
	fn on_destroy(&mut self) {
		let mut state = self.state.lock();
		if let Err(err) = self.plugin.close(&mut state) {
			tracing::warn!(oid = self.oid, %err, "plugin close failed on cache eviction");
		}
	}
}
