use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::PluginError;
use crate::traits::Plugin;

/// One hash table of installed plugins for a single role, keyed by uuid
/// (fast path, `O(1)`) with label lookup as a linear scan (slow path, used
/// by human-facing commands rather than the hot load-from-master-block
/// path).
pub struct PluginRegistry<P: ?Sized + Plugin> {
	by_uuid: FxHashMap<uuid::Uuid, Arc<P>>,
}

impl<P: ?Sized + Plugin> Default for PluginRegistry<P> {
	fn default() -> Self {
		Self { by_uuid: FxHashMap::default() }
	}
}

impl<P: ?Sized + Plugin> PluginRegistry<P> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs `plugin`, rejecting a uuid or label collision with an
	/// already-installed plugin of this role.
	pub fn install(&mut self, plugin: Arc<P>) -> Result<(), PluginError> {
		let header = plugin.header();
		if self.by_uuid.contains_key(&header.uuid) {
			return Err(PluginError::DuplicateUuid(header.uuid));
		}
		if self.by_uuid.values().any(|installed| installed.header().label == header.label) {
			return Err(PluginError::DuplicateLabel(header.label.clone()));
		}
		self.by_uuid.insert(header.uuid, plugin);
		Ok(())
	}

	pub fn uninstall(&mut self, uuid: &uuid::Uuid) -> Option<Arc<P>> {
		self.by_uuid.remove(uuid)
	}

	pub fn lookup_by_uuid(&self, uuid: &uuid::Uuid) -> Option<Arc<P>> {
		self.by_uuid.get(uuid).cloned()
	}

	pub fn lookup_by_label(&self, label: &str) -> Option<Arc<P>> {
		self.by_uuid.values().find(|p| p.header().label == label).cloned()
	}

	pub fn len(&self) -> usize {
		self.by_uuid.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_uuid.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::header::{PluginHeader, PluginKind};

	struct Dummy {
		header: PluginHeader,
	}

	impl Plugin for Dummy {
		fn header(&self) -> &PluginHeader {
			&self.header
		}
	}

	fn uuid_of(byte: u8) -> uuid::Uuid {
		uuid::Uuid::from_bytes([byte; 16])
	}

	fn dummy(uuid: u8, label: &str) -> Arc<Dummy> {
		Arc::new(Dummy { header: PluginHeader::new(PluginKind::Object, uuid_of(uuid), label, "test plugin") })
	}

	#[test]
	fn install_then_lookup_by_uuid_and_label() {
		let mut registry = PluginRegistry::new();
		registry.install(dummy(1, "counter")).unwrap();
		assert!(registry.lookup_by_uuid(&uuid_of(1)).is_some());
		assert!(registry.lookup_by_label("counter").is_some());
		assert!(registry.lookup_by_label("missing").is_none());
	}

	#[test]
	fn duplicate_uuid_is_rejected() {
		let mut registry = PluginRegistry::new();
		registry.install(dummy(1, "a")).unwrap();
		assert!(matches!(registry.install(dummy(1, "b")), Err(PluginError::DuplicateUuid(_))));
	}

	#[test]
	fn duplicate_label_is_rejected() {
		let mut registry = PluginRegistry::new();
		registry.install(dummy(1, "same")).unwrap();
		assert!(matches!(registry.install(dummy(2, "same")), Err(PluginError::DuplicateLabel(_))));
	}

	#[test]
	fn uninstall_frees_both_uuid_and_label() {
		let mut registry = PluginRegistry::new();
		registry.install(dummy(1, "counter")).unwrap();
		assert!(registry.uninstall(&uuid_of(1)).is_some());
		registry.install(dummy(2, "counter")).unwrap(); // label is free again
	}

	#[test]
	fn key_plugin_registry_installs_and_looks_up_by_label() {
		use crate::reference::ByteLexKeyPlugin;
		use crate::traits::KeyPlugin;

		let mut registry: PluginRegistry<dyn KeyPlugin> = PluginRegistry::new();
		let plugin: Arc<dyn KeyPlugin> = Arc::new(ByteLexKeyPlugin::new());
		let uuid = plugin.header().uuid;
		registry.install(plugin).unwrap();

		assert!(registry.lookup_by_uuid(&uuid).is_some());
		let found = registry.lookup_by_label("byte-lex").unwrap();
		assert_eq!(found.compare(b"a", b"b"), std::cmp::Ordering::Less);
	}
}
