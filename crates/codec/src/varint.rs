//! Google-style base-128 varints with ZigZag encoding for signed values.

use bytes::{Buf, BufMut};

use crate::error::{CodecError, Result};

/// Number of bytes [`encode_u32`] would write for `value`.
pub fn u32_size(value: u32) -> u8 {
	u64_size(value as u64)
}

/// Number of bytes [`encode_u64`] would write for `value`.
pub fn u64_size(value: u64) -> u8 {
	let mut size = 1;
	let mut v = value >> 7;
	while v != 0 {
		size += 1;
		v >>= 7;
	}
	size
}

/// Appends `value` to `buf` as a base-128 varint, least-significant group
/// first, continuation bit set on every byte but the last.
pub fn encode_u64(buf: &mut impl BufMut, mut value: u64) {
	while value >= 0x80 {
		buf.put_u8((value as u8 & 0x7f) | 0x80);
		value >>= 7;
	}
	buf.put_u8(value as u8);
}

pub fn encode_u32(buf: &mut impl BufMut, value: u32) {
	encode_u64(buf, value as u64);
}

/// Decodes a varint from the front of `buf`, advancing it past the bytes
/// consumed.
pub fn decode_u64(buf: &mut impl Buf) -> Result<u64> {
	let mut result: u64 = 0;
	let mut shift = 0u32;
	loop {
		if !buf.has_remaining() {
			return Err(CodecError::Truncated { needed: 1, got: 0 });
		}
		if shift >= 70 {
			return Err(CodecError::VarintOverflow);
		}
		let byte = buf.get_u8();
		result |= ((byte & 0x7f) as u64) << shift;
		if byte & 0x80 == 0 {
			return Ok(result);
		}
		shift += 7;
	}
}

pub fn decode_u32(buf: &mut impl Buf) -> Result<u32> {
	let value = decode_u64(buf)?;
	if value > u32::MAX as u64 {
		return Err(CodecError::VarintOverflow);
	}
	Ok(value as u32)
}

pub fn zigzag32_encode(value: i32) -> u32 {
	((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag32_decode(value: u32) -> i32 {
	((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn zigzag64_encode(value: i64) -> u64 {
	((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag64_decode(value: u64) -> i64 {
	((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn single_byte_roundtrip() {
		let mut buf = BytesMut::new();
		encode_u64(&mut buf, 42);
		assert_eq!(buf.len(), 1);
		assert_eq!(decode_u64(&mut buf.freeze()).unwrap(), 42);
	}

	#[test]
	fn multi_byte_roundtrip() {
		for value in [127u64, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
			let mut buf = BytesMut::new();
			encode_u64(&mut buf, value);
			assert_eq!(buf.len() as u8, u64_size(value));
			assert_eq!(decode_u64(&mut buf.freeze()).unwrap(), value);
		}
	}

	#[test]
	fn truncated_buffer_errors() {
		let mut buf = BytesMut::new();
		buf.put_u8(0x80); // continuation bit set, no following byte
		assert!(matches!(decode_u64(&mut buf.freeze()), Err(CodecError::Truncated { .. })));
	}

	#[test]
	fn zigzag_roundtrip_negative_and_positive() {
		for value in [0i64, -1, 1, -1000, 1000, i64::MIN, i64::MAX] {
			assert_eq!(zigzag64_decode(zigzag64_encode(value)), value);
		}
	}

	proptest::proptest! {
		#[test]
		fn prop_varint_u64_roundtrip(value: u64) {
			let mut buf = BytesMut::new();
			encode_u64(&mut buf, value);
			let decoded = decode_u64(&mut buf.freeze()).unwrap();
			proptest::prop_assert_eq!(decoded, value);
		}

		#[test]
		fn prop_zigzag_i64_roundtrip(value: i64) {
			proptest::prop_assert_eq!(zigzag64_decode(zigzag64_encode(value)), value);
		}
	}
}
