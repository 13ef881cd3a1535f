use raleighsl_cache::Oid;
use raleighsl_codec::CodecError;
use raleighsl_exec::RaleighError;
use raleighsl_plugin::PluginError;
use thiserror::Error;

/// The façade's error type: every lower-layer error a caller might see,
/// plus the bookkeeping mistakes only the façade itself can make (opening
/// twice, asking for a plugin that was never installed, touching an object
/// that fell out of cache).
#[derive(Debug, Error)]
pub enum FilesystemError {
	#[error(transparent)]
	Exec(#[from] RaleighError),
	#[error(transparent)]
	Codec(#[from] CodecError),
	#[error(transparent)]
	Plugin(#[from] PluginError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("filesystem is not open")]
	NotOpen,
	#[error("filesystem is already open")]
	AlreadyOpen,
	#[error("no format plugin installed with that uuid")]
	FormatPluginNotFound,
	#[error("no space plugin installed with that label")]
	SpacePluginNotFound,
	#[error("no semantic plugin installed with that label")]
	SemanticPluginNotFound,
	#[error("no object plugin installed with that uuid")]
	ObjectPluginNotFound,
	#[error("object {0} is not in cache")]
	ObjectNotCached(Oid),
	#[error("on-device format id {on_device} does not match format plugin {plugin}")]
	FormatMismatch { on_device: u32, plugin: u32 },
	#[error("exec task's reply channel was dropped before completing")]
	ReplyDropped,
}

pub type Result<T> = std::result::Result<T, FilesystemError>;
