use std::any::Any;
use std::cmp::Ordering;

use raleighsl_codec::MasterBlock;

use crate::PluginResult;
use crate::header::PluginHeader;

/// Shared by every plugin role; the registry only ever needs this much to
/// do uuid/label bookkeeping.
pub trait Plugin: Send + Sync {
	fn header(&self) -> &PluginHeader;
}

/// Per-object type-erased plugin state: the opaque device-side and
/// memory-side buffers an [`ObjectPlugin`] owns for one object. Concrete
/// plugins downcast via [`Any`].
pub type ObjectState = Box<dyn Any + Send>;

/// Governs the lifecycle and RWC-gated data operations of one kind of
/// object (e.g. a counter, a blob, a flat-namespace directory entry).
pub trait ObjectPlugin: Plugin {
	/// Allocates fresh, empty per-object state for a newly created object.
	fn create(&self) -> PluginResult<ObjectState>;

	/// Reconstructs per-object state from its persisted form, on open.
	fn open(&self, persisted: &[u8]) -> PluginResult<ObjectState>;

	/// Releases any resources `state` holds without destroying persisted
	/// data (called when the object is evicted from cache, not deleted).
	fn close(&self, _state: &mut ObjectState) -> PluginResult<()> {
		Ok(())
	}

	/// Flushes dirty in-memory state to the device side.
	fn sync(&self, _state: &mut ObjectState) -> PluginResult<()> {
		Ok(())
	}

	/// Releases device- and memory-side buffers permanently (object
	/// deleted).
	fn destroy(&self, _state: &mut ObjectState) -> PluginResult<()> {
		Ok(())
	}

	/// Reads committed data at `offset` into `out`, returning bytes read.
	fn read(&self, state: &mut ObjectState, offset: u64, out: &mut [u8]) -> PluginResult<usize>;

	/// Stages `data` at `offset` into this object's uncommitted view.
	fn write(&self, state: &mut ObjectState, offset: u64, data: &[u8]) -> PluginResult<usize>;

	/// Publishes the staged view as the committed one.
	fn commit(&self, state: &mut ObjectState) -> PluginResult<()>;

	/// Discards the staged view, leaving the committed one untouched.
	fn rollback(&self, state: &mut ObjectState) -> PluginResult<()>;
}

/// Namespace policy mapping human-facing names to OIDs, and handing out
/// fresh OIDs to `create`.
pub trait SemanticPlugin: Plugin {
	fn lookup(&self, name: &str) -> PluginResult<crate::Oid>;
	fn insert(&self, name: &str, oid: crate::Oid) -> PluginResult<()>;
	fn rename(&self, old_name: &str, new_name: &str) -> PluginResult<()>;
	fn remove(&self, name: &str) -> PluginResult<()>;
	fn next_oid(&self) -> crate::Oid;
	fn sync(&self) -> PluginResult<()> {
		Ok(())
	}
}

/// Device-space allocation: hands out and reclaims device-side byte
/// ranges for object plugins to back their buffers with.
pub trait SpacePlugin: Plugin {
	fn alloc(&self, size: u64) -> PluginResult<u64>;
	fn free(&self, offset: u64, size: u64) -> PluginResult<()>;
	fn sync(&self) -> PluginResult<()> {
		Ok(())
	}
}

/// On-device layout validation, bound at `open` time from the master
/// block's `format` field.
pub trait FormatPlugin: Plugin {
	fn format_id(&self) -> u32;
	fn validate(&self, block: &MasterBlock) -> PluginResult<()>;
}

/// Orders opaque object keys; used by semantic layers and the object
/// cache's custom lookups.
pub trait KeyPlugin: Plugin {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}
