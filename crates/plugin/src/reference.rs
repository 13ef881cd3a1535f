use std::cmp::Ordering;

use crate::header::{PluginHeader, PluginKind};
use crate::traits::{KeyPlugin, ObjectPlugin, ObjectState, Plugin};
use crate::{PluginError, PluginResult};

/// In-memory per-object state for [`CounterPlugin`]: a committed byte
/// buffer plus an optional staged copy written-but-not-yet-committed.
struct CounterState {
	committed: Vec<u8>,
	staged: Option<Vec<u8>>,
}

/// A minimal object plugin storing a flat byte buffer entirely in memory,
/// with write staged separately from the committed view so that readers
/// never observe an in-flight write before it commits. Used by integration
/// tests in place of a real on-device object plugin.
pub struct CounterPlugin {
	header: PluginHeader,
}

impl CounterPlugin {
	pub fn new() -> Self {
		Self {
			header: PluginHeader::new(
				PluginKind::Object,
				uuid::Uuid::from_bytes([
					0xc0, 0x47, 0x7e, 0x12, 0x9a, 0x31, 0x4f, 0x06, 0x8b, 0x5e, 0x2d, 0x91, 0x77, 0x3c, 0x4a, 0x01,
				]),
				"counter",
				"in-memory byte-buffer object plugin for tests",
			),
		}
	}
}

impl Default for CounterPlugin {
	fn default() -> Self {
		Self::new()
	}
}

impl Plugin for CounterPlugin {
	fn header(&self) -> &PluginHeader {
		&self.header
	}
}

fn downcast(state: &mut ObjectState) -> PluginResult<&mut CounterState> {
	state
		.downcast_mut::<CounterState>()
		.ok_or_else(|| PluginError::InvalidArgument("state is not a CounterState".into()))
}

impl ObjectPlugin for CounterPlugin {
	fn create(&self) -> PluginResult<ObjectState> {
		Ok(Box::new(CounterState { committed: Vec::new(), staged: None }))
	}

	fn open(&self, persisted: &[u8]) -> PluginResult<ObjectState> {
		Ok(Box::new(CounterState { committed: persisted.to_vec(), staged: None }))
	}

	fn read(&self, state: &mut ObjectState, offset: u64, out: &mut [u8]) -> PluginResult<usize> {
		let state = downcast(state)?;
		let offset = offset as usize;
		if offset >= state.committed.len() {
			return Ok(0);
		}
		let available = &state.committed[offset..];
		let n = available.len().min(out.len());
		out[..n].copy_from_slice(&available[..n]);
		Ok(n)
	}

	fn write(&self, state: &mut ObjectState, offset: u64, data: &[u8]) -> PluginResult<usize> {
		let state = downcast(state)?;
		let offset = offset as usize;
		let buf = state.staged.get_or_insert_with(|| state.committed.clone());
		if buf.len() < offset + data.len() {
			buf.resize(offset + data.len(), 0);
		}
		buf[offset..offset + data.len()].copy_from_slice(data);
		Ok(data.len())
	}

	fn commit(&self, state: &mut ObjectState) -> PluginResult<()> {
		let state = downcast(state)?;
		if let Some(staged) = state.staged.take() {
			state.committed = staged;
		}
		Ok(())
	}

	fn rollback(&self, state: &mut ObjectState) -> PluginResult<()> {
		let state = downcast(state)?;
		state.staged = None;
		Ok(())
	}
}

/// Orders keys by plain byte-lexicographic comparison — the ordering a
/// B-tree-style object plugin would use to keep entries sorted.
pub struct ByteLexKeyPlugin {
	header: PluginHeader,
}

impl ByteLexKeyPlugin {
	pub fn new() -> Self {
		Self {
			header: PluginHeader::new(
				PluginKind::Key,
				uuid::Uuid::from_bytes([
					0xb7, 0xe8, 0x11, 0x4d, 0x9c, 0x2a, 0x4b, 0x5f, 0xa0, 0x63, 0x1e, 0x4c, 0x90, 0xd2, 0x6b, 0x02,
				]),
				"byte-lex",
				"plain byte-lexicographic key comparison",
			),
		}
	}
}

impl Default for ByteLexKeyPlugin {
	fn default() -> Self {
		Self::new()
	}
}

impl Plugin for ByteLexKeyPlugin {
	fn header(&self) -> &PluginHeader {
		&self.header
	}
}

impl KeyPlugin for ByteLexKeyPlugin {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		a.cmp(b)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byte_lex_key_plugin_orders_by_byte_value() {
		let plugin = ByteLexKeyPlugin::new();
		assert_eq!(plugin.compare(b"a", b"b"), Ordering::Less);
		assert_eq!(plugin.compare(b"b", b"a"), Ordering::Greater);
		assert_eq!(plugin.compare(b"same", b"same"), Ordering::Equal);
		assert_eq!(plugin.compare(b"ab", b"abc"), Ordering::Less);
	}

	#[test]
	fn write_is_invisible_to_read_until_commit() {
		let plugin = CounterPlugin::new();
		let mut state = plugin.create().unwrap();
		plugin.write(&mut state, 0, b"hello").unwrap();

		let mut out = [0u8; 5];
		assert_eq!(plugin.read(&mut state, 0, &mut out).unwrap(), 0);

		plugin.commit(&mut state).unwrap();
		assert_eq!(plugin.read(&mut state, 0, &mut out).unwrap(), 5);
		assert_eq!(&out, b"hello");
	}

	#[test]
	fn rollback_discards_staged_write() {
		let plugin = CounterPlugin::new();
		let mut state = plugin.create().unwrap();
		plugin.write(&mut state, 0, b"hello").unwrap();
		plugin.rollback(&mut state).unwrap();
		plugin.commit(&mut state).unwrap();

		let mut out = [0u8; 5];
		assert_eq!(plugin.read(&mut state, 0, &mut out).unwrap(), 0);
	}

	#[test]
	fn open_reconstructs_committed_view() {
		let plugin = CounterPlugin::new();
		let mut state = plugin.open(b"persisted").unwrap();
		let mut out = [0u8; 9];
		assert_eq!(plugin.read(&mut state, 0, &mut out).unwrap(), 9);
		assert_eq!(&out, b"persisted");
	}
}
