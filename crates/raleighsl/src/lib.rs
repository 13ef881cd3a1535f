//! The filesystem façade: binds a master block, a pluggable object cache,
//! a transaction manager, a dispatcher, and per-role plugin registries into
//! one embeddable, pluggable transactional object-storage engine.
//!
//! This crate owns no storage policy of its own — every concrete
//! behavior (how objects are laid out, how a namespace resolves names, how
//! device space is allocated) comes from plugins installed by the caller.
//! What lives here is the wiring: task submission, cache admission, and
//! transaction arbitration shared by every plugin combination.

mod config;
mod device;
mod error;
mod filesystem;
mod object;
mod reaper;
pub mod telemetry;

pub use config::{EvictionPolicyKind, RaleighConfig};
pub use device::{DeviceHandle, InMemoryDevice};
pub use error::{FilesystemError, Result};
pub use filesystem::{Filesystem, FilesystemStats};
pub use object::ObjectEntry;
