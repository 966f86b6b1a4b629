//! Interception primitive and scoped execution.
//!
//! Nothing in `core` touches real process state. It operates on
//! [`operation::Operation`] handles supplied by the caller; the process and
//! console targets that wrap real side effects live in [`crate::io`].

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod call;
pub mod operation;
pub mod recording;
pub mod scope;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Restoration runs on unwind paths, so it must never fail on poison.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
