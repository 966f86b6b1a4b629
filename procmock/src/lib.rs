//! Interception of process-level side effects for tests.
//!
//! Code under test reaches process termination, the standard streams, the
//! uptime clock and console logging through explicit targets
//! ([`io::process::Process`], [`io::console::Console`]) instead of ambient
//! globals. Tests swap those operations for recording stand-ins:
//!
//! - **[`core`]**: the interception primitive ([`core::operation`]) and
//!   scoped runs ([`core::scope`]) that install a set of interceptions, run a
//!   work unit, capture its outcome and restore everything.
//! - **[`io`]**: targets wired to the real side effects, and config loading.
//! - **[`mocks`]**: preconfigured interceptions for each process and console
//!   operation, and the standard scope combining them.

pub mod core;
pub mod fault;
pub mod io;
pub mod logging;
pub mod mocks;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::call::{Call, CallOutcome};
pub use crate::core::operation::{Interception, Operation, install};
pub use crate::core::recording::{Intercept, Recording};
pub use crate::core::scope::{Outcome, Scope, constructor, prepare};
pub use crate::fault::Fault;
