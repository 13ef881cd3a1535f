use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
	#[error("a plugin with uuid {0} is already installed")]
	DuplicateUuid(uuid::Uuid),
	#[error("a plugin labeled {0:?} is already installed for this role")]
	DuplicateLabel(String),
	#[error("operation not implemented by this plugin")]
	NotImplemented,
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("object not found")]
	ObjectNotFound,
	#[error("object already exists")]
	ObjectExists,
	#[error("i/o error: {0}")]
	Io(String),
}
