use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
	#[error("buffer truncated: needed at least {needed} bytes, got {got}")]
	Truncated { needed: usize, got: usize },
	#[error("varint exceeds 64 bits")]
	VarintOverflow,
	#[error("master block magic mismatch")]
	BadMagic,
	#[error("master block label is not valid ASCII")]
	BadLabel,
}

pub type Result<T> = std::result::Result<T, CodecError>;
