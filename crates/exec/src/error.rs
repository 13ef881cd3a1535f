use thiserror::Error;

use raleighsl_plugin::PluginError;
use raleighsl_txn::TxnError;

/// The exec layer's single error type. Plugin and transaction errors are
/// folded in by `#[from]`-style conversions so a caller matching on
/// `RaleighError` never has to know which lower layer raised it.
#[derive(Debug, Error)]
pub enum RaleighError {
	#[error("out of memory")]
	NoMemory,
	#[error("on-device data is corrupted")]
	DataCorrupted,
	#[error("device is full")]
	DeviceFull,
	#[error("object not found")]
	ObjectNotFound,
	#[error("object already exists")]
	ObjectExists,
	#[error("object is the wrong type for this operation")]
	ObjectWrongType,
	#[error("plugin not loaded")]
	PluginNotLoaded,
	#[error("operation not implemented by this plugin")]
	NotImplemented,
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("no such transaction")]
	TxnNotFound,
	#[error("transaction timed out")]
	TxnTimeout,
	#[error("transaction was rolled back")]
	TxnRolledBack,
	#[error("transaction already reached a terminal state")]
	TxnCommitted,
	#[error("i/o error: {0}")]
	Io(String),
	/// A local invariant violation (lock poisoning, a task reaching a state
	/// it should never reach): never expected to be matched on, only logged.
	#[error("internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, RaleighError>;

impl From<PluginError> for RaleighError {
	fn from(err: PluginError) -> Self {
		match err {
			PluginError::DuplicateUuid(_) | PluginError::DuplicateLabel(_) => RaleighError::Internal(err.to_string()),
			PluginError::NotImplemented => RaleighError::NotImplemented,
			PluginError::InvalidArgument(msg) => RaleighError::InvalidArgument(msg),
			PluginError::ObjectNotFound => RaleighError::ObjectNotFound,
			PluginError::ObjectExists => RaleighError::ObjectExists,
			PluginError::Io(msg) => RaleighError::Io(msg),
		}
	}
}

impl From<TxnError> for RaleighError {
	fn from(err: TxnError) -> Self {
		match err {
			TxnError::NotFound(_) => RaleighError::TxnNotFound,
			TxnError::Terminal(_) => RaleighError::TxnCommitted,
		}
	}
}
