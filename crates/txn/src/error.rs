use thiserror::Error;

use crate::TxnId;

#[derive(Debug, Error)]
pub enum TxnError {
	#[error("no such transaction {0}")]
	NotFound(TxnId),
	#[error("transaction {0} has already reached a terminal state")]
	Terminal(TxnId),
}

pub type Result<T> = std::result::Result<T, TxnError>;
