use serde::{Deserialize, Serialize};

/// Which eviction discipline the object cache runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicyKind {
	Lru,
	Mru,
}

impl Default for EvictionPolicyKind {
	fn default() -> Self {
		Self::Lru
	}
}

/// Tunables for one [`crate::Filesystem`] instance, loadable from TOML.
///
/// `Default` gives sane standalone-embedded defaults: a worker per core, a
/// modest cache, and a reaper that sweeps once a second for transactions
/// idle past 30 seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaleighConfig {
	/// `None` defers to `std::thread::available_parallelism()`.
	pub worker_threads: Option<usize>,
	/// Soft capacity for the object cache, in cache-entry weight units.
	pub cache_capacity: u32,
	pub eviction_policy: EvictionPolicyKind,
	/// Tasks drained per round-robin lane before rotating to the next.
	pub round_robin_quantum: u32,
	/// How often the transaction reaper sweeps for stale transactions.
	pub reaper_interval_micros: u64,
	/// How long a `WAIT_COMMIT` transaction may sit idle before the reaper
	/// considers it abandoned.
	pub reaper_staleness_micros: u64,
}

impl Default for RaleighConfig {
	fn default() -> Self {
		Self {
			worker_threads: None,
			cache_capacity: 4096,
			eviction_policy: EvictionPolicyKind::default(),
			round_robin_quantum: 8,
			reaper_interval_micros: 1_000_000,
			reaper_staleness_micros: 30_000_000,
		}
	}
}

impl RaleighConfig {
	pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(s)
	}

	pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
		toml::to_string_pretty(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_round_trips_through_toml() {
		let config = RaleighConfig::default();
		let toml = config.to_toml_string().unwrap();
		let parsed = RaleighConfig::from_toml_str(&toml).unwrap();
		assert_eq!(parsed.cache_capacity, config.cache_capacity);
		assert_eq!(parsed.eviction_policy, config.eviction_policy);
	}

	#[test]
	fn partial_toml_falls_back_to_defaults() {
		let parsed = RaleighConfig::from_toml_str("cache_capacity = 128\n").unwrap();
		assert_eq!(parsed.cache_capacity, 128);
		assert_eq!(parsed.round_robin_quantum, RaleighConfig::default().round_robin_quantum);
	}
}
