//! Type-erased call histories.
//!
//! A scoped run holds interceptions of many different operation signatures
//! under one map, so it talks to them through [`Intercept`] and hands their
//! histories back as [`Recording`] snapshots. Callers recover the typed calls
//! with [`Recording::calls`].

use std::any::Any;
use std::fmt;

use crate::core::call::Call;

/// Capability shared by every installed interception, independent of its
/// argument and return types.
pub trait Intercept: Send {
    /// Name of the intercepted operation.
    fn name(&self) -> &str;

    /// Copy of the call history accrued so far.
    fn snapshot(&self) -> Recording;

    /// Revert the operation. Returns `false` when there was nothing to revert.
    fn restore(&self) -> bool;

    fn is_active(&self) -> bool;
}

impl<T: Intercept + ?Sized> Intercept for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn snapshot(&self) -> Recording {
        (**self).snapshot()
    }

    fn restore(&self) -> bool {
        (**self).restore()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

trait CallLog: Send + Sync {
    fn count(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
}

impl<A, R> CallLog for Vec<Call<A, R>>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn count(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Snapshot of one interception's call history.
pub struct Recording {
    operation: String,
    calls: Box<dyn CallLog>,
}

impl Recording {
    pub(crate) fn new<A, R>(operation: &str, calls: Vec<Call<A, R>>) -> Self
    where
        A: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        Self {
            operation: operation.to_string(),
            calls: Box::new(calls),
        }
    }

    /// Name of the operation this history was taken from.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn call_count(&self) -> usize {
        self.calls.count()
    }

    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Typed view of the recorded calls.
    ///
    /// Returns `None` if `A`/`R` do not match the operation's signature.
    pub fn calls<A: 'static, R: 'static>(&self) -> Option<&[Call<A, R>]> {
        self.calls
            .as_any()
            .downcast_ref::<Vec<Call<A, R>>>()
            .map(Vec::as_slice)
    }

    /// Drop every recorded call from this snapshot.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl fmt::Debug for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recording")
            .field("operation", &self.operation)
            .field("call_count", &self.call_count())
            .finish()
    }
}
