use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use raleighsl_cache::Oid;
use raleighsl_task::{Drained, RwcMode, RwcSemaphore};
use rustc_hash::FxHashMap;

use crate::TxnId;
use crate::error::{Result, TxnError};
use crate::transaction::Transaction;

/// Per-object arbitration state: which transaction (if any) currently owns
/// the right to stage writes against this object, and the RWC lock
/// guarding read/write/commit/lock access to it.
struct ObjectArbiter {
	pending: AtomicU64,
	rwc: Arc<RwcSemaphore>,
}

impl ObjectArbiter {
	fn new() -> Self {
		Self { pending: AtomicU64::new(0), rwc: Arc::new(RwcSemaphore::new()) }
	}
}

/// Outcome of arbitrating a write claim against an object's `pending_txn_id`.
pub enum Claim {
	/// `pending_txn_id` was free and is now this transaction's.
	Owned,
	/// `pending_txn_id` already named this transaction.
	AlreadyOwned,
	/// Another transaction owns the object; the caller must park on this
	/// semaphore's `Write` queue and retry once it wakes.
	Blocked(Arc<RwcSemaphore>),
}

/// Tracks every open [`Transaction`] plus the per-object arbitration state
/// (`pending_txn_id` and RWC lock) that transactions contend over.
///
/// Object arbitration state outlives any single transaction and is created
/// lazily on first touch, mirroring the weak-by-oid references the exec
/// layer holds to cached objects: this manager never sees a real object,
/// only its id.
pub struct TxnManager {
	next_id: AtomicU64,
	transactions: RwLock<FxHashMap<TxnId, Arc<Transaction>>>,
	objects: RwLock<FxHashMap<Oid, Arc<ObjectArbiter>>>,
	reaper_timeout_micros: u64,
}

impl TxnManager {
	pub fn new(reaper_timeout_micros: u64) -> Self {
		Self {
			next_id: AtomicU64::new(1),
			transactions: RwLock::new(FxHashMap::default()),
			objects: RwLock::new(FxHashMap::default()),
			reaper_timeout_micros,
		}
	}

	pub fn begin(&self, now: u64) -> TxnId {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.transactions.write().insert(id, Arc::new(Transaction::new(id, now)));
		id
	}

	pub fn get(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
		self.transactions.read().get(&txn_id).cloned()
	}

	pub fn enlist(&self, txn_id: TxnId, oid: Oid) -> Result<()> {
		let txn = self.get(txn_id).ok_or(TxnError::NotFound(txn_id))?;
		txn.enlist(oid)
	}

	fn object_arbiter(&self, oid: Oid) -> Arc<ObjectArbiter> {
		if let Some(arbiter) = self.objects.read().get(&oid) {
			return Arc::clone(arbiter);
		}
		let mut objects = self.objects.write();
		Arc::clone(objects.entry(oid).or_insert_with(|| Arc::new(ObjectArbiter::new())))
	}

	/// The RWC lock guarding `oid`, for read/write acquisitions that don't
	/// go through transaction arbitration (e.g. plain reads).
	pub fn object_rwc(&self, oid: Oid) -> Arc<RwcSemaphore> {
		self.object_arbiter(oid).rwc.clone()
	}

	/// Whether `oid` currently has a non-zero `pending_txn_id`. Consulted by
	/// the object cache's evict-predicate gate, which must not evict an
	/// object a transaction is still staging writes against.
	pub fn is_pending(&self, oid: Oid) -> bool {
		match self.objects.read().get(&oid) {
			Some(arbiter) => arbiter.pending.load(Ordering::SeqCst) != 0,
			None => false,
		}
	}

	/// Arbitrates a write claim on `oid` for `txn_id`: free -> owned,
	/// already-owned -> no-op, owned-by-another -> the caller must park.
	pub fn try_claim_write(&self, txn_id: TxnId, oid: Oid) -> Claim {
		let arbiter = self.object_arbiter(oid);
		loop {
			let current = arbiter.pending.load(Ordering::SeqCst);
			if current == txn_id {
				return Claim::AlreadyOwned;
			}
			if current == 0 {
				match arbiter.pending.compare_exchange(0, txn_id, Ordering::SeqCst, Ordering::SeqCst) {
					Ok(_) => return Claim::Owned,
					Err(_) => continue,
				}
			}
			return Claim::Blocked(Arc::clone(&arbiter.rwc));
		}
	}

	/// Attempts to escalate `oid` to `Commit` mode, the first step of
	/// publishing a transaction's staged write to that object.
	pub fn try_escalate_commit(&self, oid: Oid) -> bool {
		self.object_arbiter(oid).rwc.try_acquire(RwcMode::Commit)
	}

	/// Attempts to escalate `oid` to `Lock` mode, the first step of
	/// discarding a transaction's staged write to that object.
	pub fn try_escalate_rollback(&self, oid: Oid) -> bool {
		self.object_arbiter(oid).rwc.try_acquire(RwcMode::Lock)
	}

	/// Clears `oid`'s `pending_txn_id` (if still held by `txn_id`) and
	/// releases its `Commit` lock, returning any tasks that can now be
	/// resubmitted.
	pub fn finish_object_commit(&self, txn_id: TxnId, oid: Oid) -> Drained {
		let arbiter = self.object_arbiter(oid);
		let _ = arbiter.pending.compare_exchange(txn_id, 0, Ordering::SeqCst, Ordering::SeqCst);
		arbiter.rwc.release(RwcMode::Commit)
	}

	/// Clears `oid`'s `pending_txn_id` (if still held by `txn_id`) and
	/// releases its `Lock`, returning any tasks that can now be
	/// resubmitted.
	pub fn finish_object_rollback(&self, txn_id: TxnId, oid: Oid) -> Drained {
		let arbiter = self.object_arbiter(oid);
		let _ = arbiter.pending.compare_exchange(txn_id, 0, Ordering::SeqCst, Ordering::SeqCst);
		arbiter.rwc.release(RwcMode::Lock)
	}

	/// Marks a transaction committed once every enlisted object has run
	/// through [`finish_object_commit`](Self::finish_object_commit).
	pub fn complete_commit(&self, txn_id: TxnId) -> Result<()> {
		let txn = self.get(txn_id).ok_or(TxnError::NotFound(txn_id))?;
		txn.mark_committed();
		Ok(())
	}

	/// Moves a transaction to `DONT_COMMIT`, the only path into rollback.
	pub fn abort_to_rollback(&self, txn_id: TxnId) -> Result<()> {
		let txn = self.get(txn_id).ok_or(TxnError::NotFound(txn_id))?;
		txn.mark_dont_commit();
		Ok(())
	}

	/// Marks a transaction rolled back once every enlisted object has run
	/// through [`finish_object_rollback`](Self::finish_object_rollback).
	pub fn complete_rollback(&self, txn_id: TxnId) -> Result<()> {
		let txn = self.get(txn_id).ok_or(TxnError::NotFound(txn_id))?;
		txn.mark_rolled_back();
		Ok(())
	}

	/// Sweeps for transactions idle past the reaper timeout, moving each to
	/// `DONT_COMMIT` and returning their ids for the caller to drive through
	/// rollback. Does not touch transactions already in a terminal state.
	pub fn reap(&self, now: u64) -> Vec<TxnId> {
		let transactions = self.transactions.read();
		let mut stale = Vec::new();
		for txn in transactions.values() {
			if txn.state() == crate::transaction::TxnState::WaitCommit
				&& now.saturating_sub(txn.mtime()) > self.reaper_timeout_micros
			{
				txn.mark_dont_commit();
				stale.push(txn.id());
			}
		}
		stale
	}
}
