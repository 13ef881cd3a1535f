//! Transaction state machine and per-object write arbitration.
//!
//! A [`TxnManager`] owns every open [`Transaction`] plus the
//! `pending_txn_id`/RWC pair each touched object carries. It never sees a
//! real cached object, only its [`Oid`] — the exec layer is the one thing
//! that drives a transaction through claim -> escalate -> finish using a
//! scheduler-aware task, since any of those steps may need to park.

mod error;
mod manager;
mod transaction;

pub use error::{Result, TxnError};
pub use manager::{Claim, TxnManager};
pub use raleighsl_cache::Oid;
pub use transaction::{Transaction, TxnState};

/// Identifies one transaction for the lifetime of a [`TxnManager`].
pub type TxnId = u64;
