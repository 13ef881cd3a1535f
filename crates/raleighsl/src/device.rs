use std::io;

use parking_lot::Mutex;

/// The byte-addressable backing store a [`crate::Filesystem`] reads its
/// master block and object data from. Concrete device implementations
/// (files, block devices) live outside this crate; [`InMemoryDevice`] is
/// the reference implementation used by tests and standalone embedding.
pub trait DeviceHandle: Send + Sync {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
	fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()>;
	fn sync(&self) -> io::Result<()>;
}

/// A device backed by a growable in-memory buffer. Writes past the current
/// end zero-extend rather than failing.
#[derive(Default)]
pub struct InMemoryDevice {
	data: Mutex<Vec<u8>>,
}

impl InMemoryDevice {
	pub fn new() -> Self {
		Self::default()
	}
}

impl DeviceHandle for InMemoryDevice {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		let data = self.data.lock();
		let offset = offset as usize;
		let end = offset
			.checked_add(buf.len())
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "read offset overflow"))?;
		if end > data.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of device"));
		}
		buf.copy_from_slice(&data[offset..end]);
		Ok(())
	}

	fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
		let mut data = self.data.lock();
		let offset = offset as usize;
		let end = offset
			.checked_add(buf.len())
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "write offset overflow"))?;
		if data.len() < end {
			data.resize(end, 0);
		}
		data[offset..end].copy_from_slice(buf);
		Ok(())
	}

	fn sync(&self) -> io::Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_then_read_round_trips() {
		let device = InMemoryDevice::new();
		device.write_at(8, b"hello").unwrap();
		let mut buf = [0u8; 5];
		device.read_at(8, &mut buf).unwrap();
		assert_eq!(&buf, b"hello");
	}

	#[test]
	fn write_zero_extends_the_gap() {
		let device = InMemoryDevice::new();
		device.write_at(4, b"x").unwrap();
		let mut buf = [0u8; 4];
		device.read_at(0, &mut buf).unwrap();
		assert_eq!(buf, [0, 0, 0, 0]);
	}

	#[test]
	fn read_past_end_fails() {
		let device = InMemoryDevice::new();
		let mut buf = [0u8; 4];
		assert!(device.read_at(0, &mut buf).is_err());
	}
}
