//! Replaceable operations and the interceptions installed on them.
//!
//! An [`Operation`] is a named slot holding the implementation that callers
//! reach through [`Operation::call`]. [`Operation::intercept`] swaps in a
//! recording wrapper around a replacement implementation; the returned
//! [`Interception`] reverts the slot on [`Interception::restore`].
//!
//! At most one interception is active per operation. Installing a new one
//! first restores whichever interception is pending, so substitutions never
//! stack.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::core::call::Call;
use crate::core::lock;
use crate::core::recording::{Intercept, Recording};
use crate::fault::Fault;

/// Shared implementation of an operation taking `A` and producing `R`.
pub type Implementation<A, R> = Arc<dyn Fn(A) -> Result<R, Fault> + Send + Sync>;

static NEXT_INTERCEPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Call history of one interception.
///
/// Entries are reserved when a call starts and settled when it returns.
/// `epoch` advances on every clear so that a call in flight across a clear
/// does not settle an unrelated entry.
struct History<A, R> {
    calls: Vec<Call<A, R>>,
    epoch: u64,
}

impl<A, R> History<A, R> {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            epoch: 0,
        }
    }

    fn begin(&mut self, args: A) -> (u64, usize) {
        self.calls.push(Call::pending(args));
        (self.epoch, self.calls.len() - 1)
    }

    fn settle(&mut self, (epoch, index): (u64, usize), result: &Result<R, Fault>)
    where
        R: Clone,
    {
        if epoch != self.epoch {
            return;
        }
        if let Some(call) = self.calls.get_mut(index) {
            call.settle(result);
        }
    }

    fn clear(&mut self) {
        self.calls.clear();
        self.epoch += 1;
    }
}

struct Slot<A, R> {
    current: Implementation<A, R>,
    /// Restore capability of the pending interception, if any.
    active: Option<Active<A, R>>,
}

struct Active<A, R> {
    id: u64,
    previous: Implementation<A, R>,
}

impl<A, R> Slot<A, R> {
    /// Revert the pending interception. `expected` limits the revert to one
    /// specific interception.
    fn revert(&mut self, expected: Option<u64>) -> Option<u64> {
        let matches = match (&self.active, expected) {
            (Some(active), Some(id)) => active.id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return None;
        }
        let active = self.active.take()?;
        self.current = active.previous;
        Some(active.id)
    }
}

/// Handle to one replaceable operation on a target.
///
/// Clones share the same slot, so an interception installed through one
/// handle is visible through every other.
pub struct Operation<A, R> {
    name: Arc<str>,
    slot: Arc<Mutex<Slot<A, R>>>,
}

impl<A, R> Clone for Operation<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A, R> fmt::Debug for Operation<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}

impl<A, R> Operation<A, R> {
    pub fn new<F>(name: &str, implementation: F) -> Self
    where
        F: Fn(A) -> Result<R, Fault> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            slot: Arc::new(Mutex::new(Slot {
                current: Arc::new(implementation),
                active: None,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke whatever implementation is currently installed.
    ///
    /// The slot lock is released before the implementation runs, so
    /// implementations may call back into the same operation.
    pub fn call(&self, args: A) -> Result<R, Fault> {
        let current = Arc::clone(&lock(&self.slot).current);
        current(args)
    }

    pub fn is_intercepted(&self) -> bool {
        lock(&self.slot).active.is_some()
    }

    /// Restore the pending interception, whichever one it is.
    ///
    /// Returns `false` if the operation was not intercepted.
    pub fn restore(&self) -> bool {
        let reverted = lock(&self.slot).revert(None);
        if let Some(id) = reverted {
            debug!(operation = %self.name, interception = id, "restored operation");
        }
        reverted.is_some()
    }

    /// True if both handles refer to the same slot.
    pub fn same_target(&self, other: &Operation<A, R>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<A, R> Operation<A, R>
where
    A: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    /// Replace this operation with `replacement`, recording every call.
    ///
    /// A pending interception is restored before the new one is installed.
    /// Faults raised by `replacement` are recorded and then returned to the
    /// caller of [`Operation::call`] unchanged.
    pub fn intercept<F>(&self, replacement: F) -> Interception<A, R>
    where
        F: Fn(A) -> Result<R, Fault> + Send + Sync + 'static,
    {
        let id = NEXT_INTERCEPTION_ID.fetch_add(1, Ordering::Relaxed);
        let history: Arc<Mutex<History<A, R>>> = Arc::new(Mutex::new(History::new()));

        let wrapper: Implementation<A, R> = {
            let history = Arc::clone(&history);
            let name = Arc::clone(&self.name);
            Arc::new(move |args: A| {
                let entry = lock(&history).begin(args.clone());
                let result = replacement(args);
                trace!(operation = %name, raised = result.is_err(), "intercepted call");
                lock(&history).settle(entry, &result);
                result
            })
        };

        let mut slot = lock(&self.slot);
        if let Some(superseded) = slot.revert(None) {
            debug!(
                operation = %self.name,
                interception = superseded,
                "restored pending interception before reinstalling"
            );
        }
        let previous = std::mem::replace(&mut slot.current, wrapper);
        slot.active = Some(Active { id, previous });
        drop(slot);

        debug!(operation = %self.name, interception = id, "installed interception");
        Interception {
            operation: self.clone(),
            id,
            history,
        }
    }
}

/// Install `replacement` on `operation`. Equivalent to
/// [`Operation::intercept`].
pub fn install<A, R, F>(operation: &Operation<A, R>, replacement: F) -> Interception<A, R>
where
    A: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(A) -> Result<R, Fault> + Send + Sync + 'static,
{
    operation.intercept(replacement)
}

/// A live substitution of one operation, with its call history.
pub struct Interception<A, R> {
    operation: Operation<A, R>,
    id: u64,
    history: Arc<Mutex<History<A, R>>>,
}

impl<A, R> fmt::Debug for Interception<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("operation", &self.operation.name())
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("call_count", &self.call_count())
            .finish()
    }
}

impl<A, R> Interception<A, R> {
    pub fn name(&self) -> &str {
        self.operation.name()
    }

    /// True while this interception is the one installed on its operation.
    pub fn is_active(&self) -> bool {
        lock(&self.operation.slot)
            .active
            .as_ref()
            .is_some_and(|active| active.id == self.id)
    }

    /// Revert the operation to the implementation it had before this
    /// interception was installed.
    ///
    /// Calling this after the interception was already restored, or after a
    /// newer interception replaced it, does nothing and returns `false`.
    pub fn restore(&self) -> bool {
        let reverted = lock(&self.operation.slot).revert(Some(self.id));
        if reverted.is_some() {
            debug!(operation = %self.operation.name, interception = self.id, "restored operation");
        }
        reverted.is_some()
    }

    /// Number of calls started so far, including any still running.
    pub fn call_count(&self) -> usize {
        lock(&self.history).calls.len()
    }

    /// Empty the call history without touching the installation.
    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

impl<A: Clone, R: Clone> Interception<A, R> {
    /// Recorded calls in the order they were started.
    pub fn calls(&self) -> Vec<Call<A, R>> {
        lock(&self.history).calls.clone()
    }

    pub fn last_call(&self) -> Option<Call<A, R>> {
        lock(&self.history).calls.last().cloned()
    }
}

impl<A, R> Intercept for Interception<A, R>
where
    A: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        Interception::name(self)
    }

    fn snapshot(&self) -> Recording {
        Recording::new(self.operation.name(), self.calls())
    }

    fn restore(&self) -> bool {
        Interception::restore(self)
    }

    fn is_active(&self) -> bool {
        Interception::is_active(self)
    }
}
