//! The on-device master block: a fixed 64-byte little-endian packed header
//! describing the filesystem as a whole.
//!
//! ```text
//! offset  size  field
//! 0       12    magic ("R4l3igHfS-v5")
//! 12      4     format id (u32, LE)
//! 16      8     creation time (u64, LE, microseconds since epoch)
//! 24      16    uuid
//! 40      16    label (ASCII, NUL-padded)
//! 56      8     end magic (qmagic, u64 LE, 0xf5ba5028cb6afc76)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};

const MAGIC: &[u8; 12] = b"R4l3igHfS-v5";
const QMAGIC: u64 = 0xf5ba5028cb6afc76;
const LABEL_LEN: usize = 16;
pub const MASTER_BLOCK_LEN: usize = 64;

/// The filesystem-wide header written to the start of every device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterBlock {
	pub format_id: u32,
	/// Creation time, microseconds since the Unix epoch.
	pub ctime: u64,
	pub uuid: [u8; 16],
	pub label: String,
}

impl MasterBlock {
	/// Serializes to exactly [`MASTER_BLOCK_LEN`] bytes.
	pub fn encode(&self) -> Result<Bytes> {
		if !self.label.is_ascii() {
			return Err(CodecError::BadLabel);
		}
		if self.label.len() > LABEL_LEN {
			return Err(CodecError::BadLabel);
		}

		let mut buf = BytesMut::with_capacity(MASTER_BLOCK_LEN);
		buf.put_slice(MAGIC);
		buf.put_u32_le(self.format_id);
		buf.put_u64_le(self.ctime);
		buf.put_slice(&self.uuid);

		let mut label_bytes = [0u8; LABEL_LEN];
		label_bytes[..self.label.len()].copy_from_slice(self.label.as_bytes());
		buf.put_slice(&label_bytes);

		buf.put_u64_le(QMAGIC);
		debug_assert_eq!(buf.len(), MASTER_BLOCK_LEN);
		Ok(buf.freeze())
	}

	/// Parses a master block, validating both magics.
	pub fn decode(mut buf: impl Buf) -> Result<Self> {
		if buf.remaining() < MASTER_BLOCK_LEN {
			return Err(CodecError::Truncated { needed: MASTER_BLOCK_LEN, got: buf.remaining() });
		}

		let mut magic = [0u8; 12];
		buf.copy_to_slice(&mut magic);
		if &magic != MAGIC {
			return Err(CodecError::BadMagic);
		}

		let format_id = buf.get_u32_le();
		let ctime = buf.get_u64_le();

		let mut uuid = [0u8; 16];
		buf.copy_to_slice(&mut uuid);

		let mut label_bytes = [0u8; LABEL_LEN];
		buf.copy_to_slice(&mut label_bytes);
		let label_len = label_bytes.iter().position(|&b| b == 0).unwrap_or(LABEL_LEN);
		let label = std::str::from_utf8(&label_bytes[..label_len])
			.map_err(|_| CodecError::BadLabel)?
			.to_string();
		if !label.is_ascii() {
			return Err(CodecError::BadLabel);
		}

		let qmagic = buf.get_u64_le();
		if qmagic != QMAGIC {
			return Err(CodecError::BadMagic);
		}

		Ok(Self { format_id, ctime, uuid, label })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> MasterBlock {
		MasterBlock { format_id: 7, ctime: 1_700_000_000, uuid: [9u8; 16], label: "root".to_string() }
	}

	#[test]
	fn encode_is_exactly_64_bytes() {
		assert_eq!(sample().encode().unwrap().len(), MASTER_BLOCK_LEN);
	}

	#[test]
	fn roundtrip_preserves_fields() {
		let block = sample();
		let bytes = block.encode().unwrap();
		let decoded = MasterBlock::decode(bytes).unwrap();
		assert_eq!(decoded, block);
	}

	#[test]
	fn corrupt_start_magic_is_rejected() {
		let mut bytes = sample().encode().unwrap().to_vec();
		bytes[0] = b'X';
		assert!(matches!(MasterBlock::decode(Bytes::from(bytes)), Err(CodecError::BadMagic)));
	}

	#[test]
	fn corrupt_end_magic_is_rejected() {
		let mut bytes = sample().encode().unwrap().to_vec();
		let last = bytes.len() - 1;
		bytes[last] = b'X';
		assert!(matches!(MasterBlock::decode(Bytes::from(bytes)), Err(CodecError::BadMagic)));
	}

	#[test]
	fn label_over_capacity_is_rejected() {
		let mut block = sample();
		block.label = "a".repeat(LABEL_LEN + 1);
		assert!(matches!(block.encode(), Err(CodecError::BadLabel)));
	}

	proptest::proptest! {
		#[test]
		fn prop_masterblock_roundtrip(
			format_id: u32,
			ctime: u64,
			uuid: [u8; 16],
			label in "[ -~]{0,16}",
		) {
			let block = MasterBlock { format_id, ctime, uuid, label };
			let bytes = block.encode().unwrap();
			proptest::prop_assert_eq!(bytes.len(), MASTER_BLOCK_LEN);
			let decoded = MasterBlock::decode(bytes).unwrap();
			proptest::prop_assert_eq!(decoded, block);
		}
	}
}
