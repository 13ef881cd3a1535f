use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use raleighsl_cache::Oid;

use crate::TxnId;
use crate::error::{Result, TxnError};

/// A transaction's position in the `WAIT_COMMIT -> COMMITTED` /
/// `WAIT_COMMIT -> DONT_COMMIT -> ROLLEDBACK` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
	/// Still enlisting objects and staging writes; eligible to commit.
	WaitCommit,
	/// Commit has been abandoned; only rollback may follow.
	DontCommit,
	/// All enlisted objects published their staged writes.
	Committed,
	/// All enlisted objects discarded their staged writes.
	RolledBack,
}

impl TxnState {
	pub fn is_terminal(self) -> bool {
		matches!(self, TxnState::Committed | TxnState::RolledBack)
	}
}

/// One open unit of work: an id, a state, the set of objects it has
/// touched, and a liveness timestamp the reaper checks.
pub struct Transaction {
	id: TxnId,
	state: Mutex<TxnState>,
	objects: Mutex<BTreeSet<Oid>>,
	mtime: AtomicU64,
}

impl Transaction {
	pub(crate) fn new(id: TxnId, now: u64) -> Self {
		Self { id, state: Mutex::new(TxnState::WaitCommit), objects: Mutex::new(BTreeSet::new()), mtime: AtomicU64::new(now) }
	}

	pub fn id(&self) -> TxnId {
		self.id
	}

	pub fn state(&self) -> TxnState {
		*self.state.lock()
	}

	pub fn mtime(&self) -> u64 {
		self.mtime.load(Ordering::Relaxed)
	}

	pub fn touch(&self, now: u64) {
		self.mtime.store(now, Ordering::Relaxed);
	}

	/// OIDs enlisted so far, in ascending order — the commit/rollback
	/// escalation order a [`BTreeSet`] gives for free.
	pub fn enlisted_oids(&self) -> Vec<Oid> {
		self.objects.lock().iter().copied().collect()
	}

	pub(crate) fn enlist(&self, oid: Oid) -> Result<()> {
		let state = *self.state.lock();
		if state.is_terminal() {
			return Err(TxnError::Terminal(self.id));
		}
		self.objects.lock().insert(oid);
		Ok(())
	}

	pub(crate) fn mark_dont_commit(&self) {
		let mut state = self.state.lock();
		if *state == TxnState::WaitCommit {
			*state = TxnState::DontCommit;
		}
	}

	pub(crate) fn mark_committed(&self) {
		*self.state.lock() = TxnState::Committed;
	}

	pub(crate) fn mark_rolled_back(&self) {
		*self.state.lock() = TxnState::RolledBack;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn enlist_is_rejected_once_terminal() {
		let txn = Transaction::new(1, 0);
		txn.enlist(10).unwrap();
		txn.mark_committed();
		assert!(matches!(txn.enlist(11), Err(TxnError::Terminal(1))));
	}

	#[test]
	fn enlisted_oids_come_back_sorted() {
		let txn = Transaction::new(1, 0);
		txn.enlist(30).unwrap();
		txn.enlist(10).unwrap();
		txn.enlist(20).unwrap();
		assert_eq!(txn.enlisted_oids(), vec![10, 20, 30]);
	}

	#[test]
	fn dont_commit_does_not_clobber_a_terminal_state() {
		let txn = Transaction::new(1, 0);
		txn.mark_rolled_back();
		txn.mark_dont_commit();
		assert_eq!(txn.state(), TxnState::RolledBack);
	}
}
