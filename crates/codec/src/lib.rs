//! Wire-level encodings for the engine's external interfaces: the varint +
//! zigzag integer codec, the bit-packed RPC field codec, and the
//! fixed-layout on-device master block.

mod error;
mod field;
mod masterblock;
mod varint;

pub use error::CodecError;
pub use field::{decode_field, encode_field, encoded_field_len};
pub use masterblock::{MasterBlock, MASTER_BLOCK_LEN};
pub use varint::{
	decode_u32, decode_u64, encode_u32, encode_u64, u32_size, u64_size, zigzag32_decode,
	zigzag32_encode, zigzag64_decode, zigzag64_encode,
};
