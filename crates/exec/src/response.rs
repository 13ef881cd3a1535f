use raleighsl_cache::Oid;
use raleighsl_plugin::ObjectState;

use crate::error::RaleighError;

/// Unifies the payload every exec entry point's reply channel carries.
pub enum ExecResponse {
	Oid(Oid),
	Unit,
	Bytes(Vec<u8>),
	Written(usize),
	Created { oid: Oid, state: ObjectState },
}

/// The reply channel every exec task sends exactly once, always from a
/// worker thread, carrying the final result of the operation.
pub type Reply = tokio::sync::oneshot::Sender<Result<ExecResponse, RaleighError>>;
