//! Bit-packed RPC field head-byte encoding.
//!
//! A field is a 16-bit id plus a 64-bit length. Most fields are short
//! (length 1-8, id < 14), so the common case packs into one head byte:
//!
//! ```text
//! +-+---+----+
//! |0|LLL|IIII|
//! +-+---+----+
//! ```
//!
//! bit 7 clear means the length fits in the 3-bit `LLL` field as
//! `length - 1` (so 1..=8); the low nibble holds `field_id + 2` when
//! `field_id <= 13`. When the length doesn't fit in 3 bits, bit 7 is set,
//! `LLL` holds `external_length_byte_count - 1`, and that many length bytes
//! (minimal little-endian width) follow the head byte. Symmetrically, a
//! field id that doesn't fit the low nibble stores `byte_count - 1` there
//! instead and the id follows (after any external length bytes) as minimal
//! little-endian width.

use bytes::{Buf, BufMut};

use crate::error::{CodecError, Result};

fn fixed_width_u64(value: u64) -> u8 {
	if value < (1 << 8) {
		1
	} else if value < (1 << 16) {
		2
	} else if value < (1 << 24) {
		3
	} else if value < (1 << 32) {
		4
	} else if value < (1 << 40) {
		5
	} else if value < (1 << 48) {
		6
	} else if value < (1 << 56) {
		7
	} else {
		8
	}
}

fn fixed_width_u32(value: u32) -> u8 {
	if value < (1 << 8) {
		1
	} else if value < (1 << 16) {
		2
	} else if value < (1 << 24) {
		3
	} else {
		4
	}
}

fn write_fixed_width(buf: &mut impl BufMut, width: u8, value: u64) {
	for i in 0..width {
		buf.put_u8(((value >> (8 * i)) & 0xff) as u8);
	}
}

fn read_fixed_width(buf: &mut impl Buf, width: u8) -> Result<u64> {
	if (buf.remaining() as u64) < width as u64 {
		return Err(CodecError::Truncated { needed: width as usize, got: buf.remaining() });
	}
	let mut result: u64 = 0;
	for i in 0..width {
		result |= (buf.get_u8() as u64) << (8 * i);
	}
	Ok(result)
}

/// Lengths in `1..=8` pack into the head byte's 3-bit `LLL` field as
/// `length - 1`; everything else (including 0, which the 3-bit field can't
/// represent at all) spills into external length bytes.
fn fits_packed_length(length: u64) -> bool {
	(1..=8).contains(&length)
}

/// Number of bytes [`encode_field`] would write for this id/length pair.
pub fn encoded_field_len(field_id: u16, length: u64) -> u8 {
	let mut len = 1;
	if !fits_packed_length(length) {
		len += fixed_width_u64(length);
	}
	if field_id > 13 {
		len += fixed_width_u32(field_id as u32);
	}
	len
}

/// Writes a field head (and any external length/id bytes) to `buf`.
pub fn encode_field(buf: &mut impl BufMut, field_id: u16, length: u64) {
	let mut head: u8;
	let mut external_len_bytes: Option<(u8, u64)> = None;

	if fits_packed_length(length) {
		head = (((length - 1) & 0x7) as u8) << 4;
	} else {
		let width = fixed_width_u64(length);
		head = (1 << 7) | (((width - 1) & 0x7) << 4);
		external_len_bytes = Some((width, length));
	}

	let mut external_id_bytes: Option<(u8, u64)> = None;
	if field_id <= 13 {
		head |= (field_id as u8) + 2;
	} else {
		let width = fixed_width_u32(field_id as u32);
		head |= width - 1;
		external_id_bytes = Some((width, field_id as u64));
	}

	buf.put_u8(head);
	if let Some((width, value)) = external_len_bytes {
		write_fixed_width(buf, width, value);
	}
	if let Some((width, value)) = external_id_bytes {
		write_fixed_width(buf, width, value);
	}
}

/// Reads a field head from the front of `buf`, returning `(field_id,
/// length)` and advancing `buf` past everything consumed.
pub fn decode_field(buf: &mut impl Buf) -> Result<(u16, u64)> {
	if !buf.has_remaining() {
		return Err(CodecError::Truncated { needed: 1, got: 0 });
	}
	let head = buf.get_u8();
	let len_field = (head >> 4) & 0x7;
	let id_field = head & 0xf;

	let length = if head & (1 << 7) != 0 {
		read_fixed_width(buf, len_field + 1)?
	} else {
		(len_field + 1) as u64
	};

	let field_id = if id_field >= 2 {
		(id_field - 2) as u16
	} else {
		read_fixed_width(buf, id_field + 1)? as u16
	};

	Ok((field_id, length))
}
