//! Builds the tasks that drive the eight storage entry points through a
//! dispatcher: `create`, `lookup`, `rename`, `unlink`, `read`, `write`,
//! `commit`, `rollback`. Every builder returns a [`raleighsl_task::Task`]
//! ready to hand to `Dispatcher::submit`; none of them touch a concrete
//! object cache or plugin registry directly; they operate purely on
//! [`ObjectHandle`]/[`SemanticHandle`], leaving the façade to resolve those
//! from live cache entries and registry lookups.

mod error;
mod object;
mod ops;
mod response;

pub use error::{RaleighError, Result};
pub use object::{ObjectHandle, SemanticHandle};
pub use ops::{commit, create, lookup, read, rename, rollback, unlink, write};
pub use response::{ExecResponse, Reply};
