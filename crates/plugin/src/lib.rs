//! Plugin identity, the five plugin-role traits, and the uuid/label
//! registry every filesystem keeps one of per role.

mod error;
mod header;
mod reference;
mod registry;
mod traits;

pub use error::PluginError;
pub use header::{PluginHeader, PluginKind};
pub use reference::{ByteLexKeyPlugin, CounterPlugin};
pub use registry::PluginRegistry;
pub use traits::{FormatPlugin, KeyPlugin, ObjectPlugin, ObjectState, Plugin, SemanticPlugin, SpacePlugin};

pub type PluginResult<T> = Result<T, PluginError>;
pub use raleighsl_cache::Oid;
