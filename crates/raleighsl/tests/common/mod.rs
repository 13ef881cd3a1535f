use std::sync::Arc;

use parking_lot::Mutex;
use raleighsl::{InMemoryDevice, RaleighConfig};
use raleighsl_cache::Oid;
use raleighsl_codec::MasterBlock;
use raleighsl_plugin::{
	FormatPlugin, Plugin, PluginHeader, PluginKind, PluginResult, SemanticPlugin, SpacePlugin,
};
use rustc_hash::FxHashMap;
use uuid::Uuid;

pub const FORMAT_UUID: Uuid = Uuid::from_bytes([1u8; 16]);
pub const FORMAT_ID: u32 = 7;

pub struct NullFormatPlugin {
	header: PluginHeader,
}

impl NullFormatPlugin {
	pub fn new() -> Self {
		Self { header: PluginHeader::new(PluginKind::Format, FORMAT_UUID, "null-format", "accepts any master block") }
	}
}

impl Plugin for NullFormatPlugin {
	fn header(&self) -> &PluginHeader {
		&self.header
	}
}

impl FormatPlugin for NullFormatPlugin {
	fn format_id(&self) -> u32 {
		FORMAT_ID
	}

	fn validate(&self, _block: &MasterBlock) -> PluginResult<()> {
		Ok(())
	}
}

pub struct NullSpacePlugin {
	header: PluginHeader,
	next: Mutex<u64>,
}

impl NullSpacePlugin {
	pub fn new() -> Self {
		Self {
			header: PluginHeader::new(PluginKind::Space, Uuid::from_bytes([2u8; 16]), "null-space", "bump allocator"),
			next: Mutex::new(0),
		}
	}
}

impl Plugin for NullSpacePlugin {
	fn header(&self) -> &PluginHeader {
		&self.header
	}
}

impl SpacePlugin for NullSpacePlugin {
	fn alloc(&self, size: u64) -> PluginResult<u64> {
		let mut next = self.next.lock();
		let offset = *next;
		*next += size;
		Ok(offset)
	}

	fn free(&self, _offset: u64, _size: u64) -> PluginResult<()> {
		Ok(())
	}
}

/// A flat in-memory name -> oid table, mirroring the exec layer's own
/// `DirPlugin` test double.
pub struct DirSemanticPlugin {
	header: PluginHeader,
	entries: Mutex<FxHashMap<String, Oid>>,
	next: Mutex<Oid>,
}

impl DirSemanticPlugin {
	pub fn new() -> Self {
		Self {
			header: PluginHeader::new(PluginKind::Semantic, Uuid::from_bytes([3u8; 16]), "flat-dir", "flat in-memory namespace"),
			entries: Mutex::new(FxHashMap::default()),
			next: Mutex::new(1),
		}
	}
}

impl Plugin for DirSemanticPlugin {
	fn header(&self) -> &PluginHeader {
		&self.header
	}
}

impl SemanticPlugin for DirSemanticPlugin {
	fn lookup(&self, name: &str) -> PluginResult<Oid> {
		self.entries.lock().get(name).copied().ok_or(raleighsl_plugin::PluginError::ObjectNotFound)
	}

	fn insert(&self, name: &str, oid: Oid) -> PluginResult<()> {
		self.entries.lock().insert(name.to_string(), oid);
		Ok(())
	}

	fn rename(&self, old_name: &str, new_name: &str) -> PluginResult<()> {
		let mut entries = self.entries.lock();
		let oid = entries.remove(old_name).ok_or(raleighsl_plugin::PluginError::ObjectNotFound)?;
		entries.insert(new_name.to_string(), oid);
		Ok(())
	}

	fn remove(&self, name: &str) -> PluginResult<()> {
		self.entries.lock().remove(name).ok_or(raleighsl_plugin::PluginError::ObjectNotFound)?;
		Ok(())
	}

	fn next_oid(&self) -> Oid {
		let mut next = self.next.lock();
		let oid = *next;
		*next += 1;
		oid
	}
}

/// Builds a filesystem over a fresh in-memory device with the counter
/// object plugin plus the null format/space/semantic plugins installed,
/// already `create`d and ready for use.
pub fn open_fresh_filesystem(config: RaleighConfig) -> Arc<raleighsl::Filesystem> {
	let filesystem = raleighsl::Filesystem::new(Arc::new(InMemoryDevice::new()), config);
	filesystem.install_format_plugin(Arc::new(NullFormatPlugin::new())).unwrap();
	filesystem.install_space_plugin(Arc::new(NullSpacePlugin::new())).unwrap();
	filesystem.install_semantic_plugin(Arc::new(DirSemanticPlugin::new())).unwrap();
	filesystem.install_object_plugin(Arc::new(raleighsl_plugin::CounterPlugin::new())).unwrap();
	filesystem.create(FORMAT_UUID, "null-space", "flat-dir", "test-fs").unwrap();
	filesystem
}

pub fn counter_plugin_uuid() -> Uuid {
	raleighsl_plugin::CounterPlugin::new().header().uuid
}
