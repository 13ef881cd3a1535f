use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::policy::EvictionPolicy;
use crate::{CacheObject, Oid};

const SHARD_COUNT: usize = 16;

fn shard_of(oid: Oid) -> usize {
	(oid as usize) % SHARD_COUNT
}

/// Membership state relative to the eviction policy's linkage, not the
/// index — an entry can be present in the index with state `Evicted` for a
/// moment while other holders still keep it alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
	New,
	InQueue,
	Evicted,
}

/// One cache-owned slot: the object plus bookkeeping. Handed out wrapped in
/// `Arc`; the strong count doubles as the cache's refcount, and dropping
/// the last handle runs [`CacheObject::on_destroy`].
pub struct CacheEntry<T: CacheObject> {
	pub oid: Oid,
	pub weight: u32,
	object: Mutex<T>,
	state: Mutex<EntryState>,
}

impl<T: CacheObject> CacheEntry<T> {
	/// Runs `f` with shared access to the wrapped object.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.object.lock())
	}

	/// Runs `f` with exclusive access to the wrapped object.
	pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
		f(&mut self.object.lock())
	}

	pub fn state(&self) -> EntryState {
		*self.state.lock()
	}
}

impl<T: CacheObject> Drop for CacheEntry<T> {
	fn drop(&mut self) {
		self.object.lock().on_destroy();
	}
}

/// Atomic hit/miss counters, exposed via [`ObjectCache::stats`].
#[derive(Default)]
pub struct CacheStats {
	hits: AtomicU64,
	misses: AtomicU64,
}

impl CacheStats {
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}
}

/// OID-keyed, reference-counted, pluggable-eviction object cache.
///
/// The index is sharded for concurrent access; the eviction policy's
/// linkage lives behind one lock since recency bookkeeping is inherently
/// sequential. Evicted entries are collected under the policy lock and
/// dropped only after it's released.
pub struct ObjectCache<T: CacheObject> {
	shards: Vec<RwLock<FxHashMap<Oid, Arc<CacheEntry<T>>>>>,
	policy: Mutex<Box<dyn EvictionPolicy>>,
	capacity: u32,
	evict_gate: Box<dyn Fn(&T) -> bool + Send + Sync>,
	stats: CacheStats,
}

impl<T: CacheObject> ObjectCache<T> {
	/// `evict_gate` is consulted once per eviction candidate; returning
	/// `false` keeps the entry no matter how over capacity the cache is.
	pub fn new(
		capacity: u32,
		policy: Box<dyn EvictionPolicy>,
		evict_gate: impl Fn(&T) -> bool + Send + Sync + 'static,
	) -> Self {
		let shards = (0..SHARD_COUNT).map(|_| RwLock::new(FxHashMap::default())).collect();
		Self { shards, policy: Mutex::new(policy), capacity, evict_gate: Box::new(evict_gate), stats: CacheStats::default() }
	}

	/// Installs `object` under `oid` if absent, else hands back the
	/// existing entry with its refcount implicitly bumped (a cloned `Arc`).
	pub fn try_insert(&self, oid: Oid, object: T, weight: u32) -> Arc<CacheEntry<T>> {
		let shard = &self.shards[shard_of(oid)];
		{
			let existing = shard.read();
			if let Some(entry) = existing.get(&oid) {
				self.policy.lock().touch(oid);
				return Arc::clone(entry);
			}
		}
		let mut guard = shard.write();
		if let Some(entry) = guard.get(&oid) {
			self.policy.lock().touch(oid);
			return Arc::clone(entry);
		}
		let entry = Arc::new(CacheEntry {
			oid,
			weight,
			object: Mutex::new(object),
			state: Mutex::new(EntryState::New),
		});
		guard.insert(oid, Arc::clone(&entry));
		drop(guard);
		*entry.state.lock() = EntryState::InQueue;

		let mut policy = self.policy.lock();
		policy.track(oid, weight);
		self.reclaim_locked(&mut policy);
		entry
	}

	/// Looks up `oid`, bumping recency and returning a cloned handle.
	pub fn lookup(&self, oid: Oid) -> Option<Arc<CacheEntry<T>>> {
		let shard = self.shards[shard_of(oid)].read();
		match shard.get(&oid) {
			Some(entry) => {
				drop(shard);
				self.policy.lock().touch(oid);
				self.stats.hits.fetch_add(1, Ordering::Relaxed);
				Some(Arc::clone(entry))
			}
			None => {
				self.stats.misses.fetch_add(1, Ordering::Relaxed);
				None
			}
		}
	}

	/// Detaches `oid` from the index and the eviction policy. The entry
	/// itself survives until every outstanding `Arc` handle drops.
	pub fn remove(&self, oid: Oid) -> Option<Arc<CacheEntry<T>>> {
		let mut shard = self.shards[shard_of(oid)].write();
		let entry = shard.remove(&oid)?;
		drop(shard);
		self.policy.lock().untrack(oid);
		*entry.state.lock() = EntryState::Evicted;
		Some(entry)
	}

	/// Hit/miss counters accumulated so far.
	pub fn stats(&self) -> &CacheStats {
		&self.stats
	}

	/// Current eviction-policy order, most-recent-to-evict first.
	pub fn dump(&self) -> Vec<Oid> {
		self.policy.lock().dump()
	}

	fn reclaim_locked(&self, policy: &mut Box<dyn EvictionPolicy>) {
		let evict_gate = &self.evict_gate;
		let mut candidates: Vec<Oid> = Vec::new();
		{
			let mut can_evict = |oid: Oid| -> bool {
				for shard in &self.shards {
					if let Some(entry) = shard.read().get(&oid) {
						return evict_gate(&entry.object.lock());
					}
				}
				false
			};
			candidates.extend(policy.reclaim(self.capacity, &mut can_evict));
		}

		for oid in candidates {
			let mut shard = self.shards[shard_of(oid)].write();
			if let Some(entry) = shard.remove(&oid) {
				drop(shard);
				*entry.state.lock() = EntryState::Evicted;
				tracing::debug!(oid, "evicted cache entry");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::LruPolicy;
	use std::sync::atomic::AtomicBool;

	struct Obj {
		destroyed: Arc<AtomicBool>,
	}

	impl CacheObject for Obj {
		fn on_destroy(&mut self) {
			self.destroyed.store(true, Ordering::SeqCst);
		}
	}

	#[test]
	fn insert_then_lookup_hits() {
		let cache = ObjectCache::new(10, Box::new(LruPolicy::new()), |_: &Obj| true);
		let flag = Arc::new(AtomicBool::new(false));
		cache.try_insert(1, Obj { destroyed: Arc::clone(&flag) }, 1);
		assert!(cache.lookup(1).is_some());
		assert!(cache.lookup(2).is_none());
		assert_eq!(cache.stats().hits(), 1);
		assert_eq!(cache.stats().misses(), 1);
	}

	#[test]
	fn double_insert_increments_refcount_not_entries() {
		let cache = ObjectCache::new(10, Box::new(LruPolicy::new()), |_: &Obj| true);
		let flag = Arc::new(AtomicBool::new(false));
		let a = cache.try_insert(1, Obj { destroyed: Arc::clone(&flag) }, 1);
		let b = cache.try_insert(1, Obj { destroyed: Arc::clone(&flag) }, 1);
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn destroy_hook_runs_once_last_handle_drops() {
		let cache = ObjectCache::new(10, Box::new(LruPolicy::new()), |_: &Obj| true);
		let flag = Arc::new(AtomicBool::new(false));
		let entry = cache.try_insert(1, Obj { destroyed: Arc::clone(&flag) }, 1);
		cache.remove(1);
		assert!(!flag.load(Ordering::SeqCst)); // caller still holds `entry`
		drop(entry);
		assert!(flag.load(Ordering::SeqCst));
	}

	struct PendingObj {
		pending: bool,
	}

	impl CacheObject for PendingObj {}

	#[test]
	fn capacity_eviction_honors_gate() {
		let cache = ObjectCache::new(2, Box::new(LruPolicy::new()), |o: &PendingObj| !o.pending);
		cache.try_insert(1, PendingObj { pending: false }, 1);
		cache.try_insert(2, PendingObj { pending: false }, 1);
		cache.try_insert(3, PendingObj { pending: false }, 1);
		// over capacity with nothing pending: the oldest (1) is evicted
		assert!(cache.lookup(1).is_none());
		assert!(cache.lookup(2).is_some());
		assert!(cache.lookup(3).is_some());

		let entry2 = cache.lookup(2).unwrap();
		entry2.with_mut(|o| o.pending = true);
		cache.try_insert(4, PendingObj { pending: false }, 1);
		// 2 is pending; the predicate must keep it no matter how far over
		// capacity the cache runs, even though it is now the oldest entry.
		assert!(cache.lookup(2).is_some());
	}
}
