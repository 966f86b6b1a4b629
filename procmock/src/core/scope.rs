//! Scoped runs: install a set of interceptions, execute a work unit, capture
//! its outcome, restore everything.
//!
//! Installation and cleanup are shared by the synchronous and asynchronous
//! runners. The only difference between [`Scope::run`] and
//! [`Scope::run_async`] is whether the work unit's result is awaited.
//!
//! Restoration is tied to an internal guard. On the normal path the guard
//! snapshots every call history and then restores; if the work unit panics, a
//! constructor panics during installation, or an async run is dropped before
//! completion, the guard restores during drop instead.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::core::recording::{Intercept, Recording};

/// Zero-argument function that installs one interception.
pub type Constructor = Arc<dyn Fn() -> Box<dyn Intercept> + Send + Sync>;

/// Wrap a typed constructor so it can be stored in a [`Scope`].
pub fn constructor<I, F>(f: F) -> Constructor
where
    I: Intercept + 'static,
    F: Fn() -> I + Send + Sync + 'static,
{
    Arc::new(move || Box::new(f()) as Box<dyn Intercept>)
}

/// Build a reusable runner from `(name, constructor)` pairs.
///
/// Later entries replace earlier ones with the same name.
pub fn prepare<S, I>(constructors: I) -> Scope
where
    S: Into<String>,
    I: IntoIterator<Item = (S, Constructor)>,
{
    constructors
        .into_iter()
        .fold(Scope::new(), |scope, (name, ctor)| scope.insert(name, ctor))
}

/// A prepared set of named interception constructors.
///
/// Every call to [`Scope::run`] or [`Scope::run_async`] invokes each
/// constructor afresh, so runs never share interceptions or histories.
#[derive(Clone, Default)]
pub struct Scope {
    constructors: BTreeMap<String, Constructor>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named constructor.
    pub fn with<I, F>(self, name: impl Into<String>, f: F) -> Self
    where
        I: Intercept + 'static,
        F: Fn() -> I + Send + Sync + 'static,
    {
        self.insert(name, constructor(f))
    }

    fn insert(mut self, name: impl Into<String>, ctor: Constructor) -> Self {
        let name = name.into();
        if self.constructors.insert(name.clone(), ctor).is_some() {
            warn!(name = %name, "replaced existing constructor in scope");
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Run `work` with every interception installed.
    ///
    /// An `Err` from `work` is captured into the outcome, never returned or
    /// re-raised. Panics still propagate, after restoration.
    #[instrument(skip_all, fields(mocks = self.constructors.len()))]
    pub fn run<T, E, W>(&self, work: W) -> Outcome<T, E>
    where
        W: FnOnce() -> Result<T, E>,
    {
        let installed = self.install();
        let captured = work();
        installed.finish(captured)
    }

    /// Asynchronous variant of [`Scope::run`].
    ///
    /// Interceptions stay installed across every suspension inside the work
    /// unit and are restored once its future resolves.
    #[instrument(skip_all, fields(mocks = self.constructors.len()))]
    pub async fn run_async<T, E, W, Fut>(&self, work: W) -> Outcome<T, E>
    where
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let installed = self.install();
        let captured = work().await;
        installed.finish(captured)
    }

    fn install(&self) -> Installed {
        let mut installed = Installed {
            interceptions: Vec::with_capacity(self.constructors.len()),
        };
        for (name, ctor) in &self.constructors {
            let interception = ctor();
            debug!(name = %name, operation = interception.name(), "installed scoped interception");
            installed.interceptions.push((name.clone(), interception));
        }
        installed
    }
}

/// Interceptions installed by one run, restored on drop.
struct Installed {
    interceptions: Vec<(String, Box<dyn Intercept>)>,
}

impl Installed {
    fn finish<T, E>(mut self, captured: Result<T, E>) -> Outcome<T, E> {
        let mut mocks = BTreeMap::new();
        // Entries leave the guard only once restored, so a panicking snapshot
        // still leaves the rest to `Drop`.
        while let Some((name, interception)) = self.interceptions.last() {
            let recording = interception.snapshot();
            let name = name.clone();
            interception.restore();
            self.interceptions.pop();
            mocks.insert(name, recording);
        }
        debug!(
            mocks = mocks.len(),
            failed = captured.is_err(),
            "scoped run finished"
        );
        Outcome { captured, mocks }
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        if self.interceptions.is_empty() {
            return;
        }
        warn!(
            count = self.interceptions.len(),
            "scoped run interrupted, restoring interceptions"
        );
        for (_, interception) in self.interceptions.drain(..) {
            interception.restore();
        }
    }
}

/// Result of one scoped run.
#[derive(Debug)]
pub struct Outcome<T, E> {
    captured: Result<T, E>,
    /// Call histories keyed by the names given to the scope.
    pub mocks: BTreeMap<String, Recording>,
}

impl<T, E> Outcome<T, E> {
    /// Value returned by the work unit, if it did not fail.
    pub fn result(&self) -> Option<&T> {
        self.captured.as_ref().ok()
    }

    /// Error returned by the work unit, exactly as it was produced.
    pub fn error(&self) -> Option<&E> {
        self.captured.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.captured.is_ok()
    }

    pub fn mock(&self, name: &str) -> Option<&Recording> {
        self.mocks.get(name)
    }

    pub fn mock_mut(&mut self, name: &str) -> Option<&mut Recording> {
        self.mocks.get_mut(name)
    }

    pub fn into_result(self) -> Result<T, E> {
        self.captured
    }

    pub fn into_parts(self) -> (Result<T, E>, BTreeMap<String, Recording>) {
        (self.captured, self.mocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::operation::Operation;
    use crate::fault::Fault;

    fn counter() -> Operation<u32, u32> {
        Operation::new("counter", |n: u32| Ok(n))
    }

    #[test]
    fn empty_scope_still_captures_result() {
        let scope = Scope::new();
        assert!(scope.is_empty());

        let outcome: Outcome<&str, Fault> = scope.run(|| Ok("done"));
        assert!(outcome.is_ok());
        assert_eq!(outcome.result(), Some(&"done"));
        assert!(outcome.error().is_none());
        assert!(outcome.mocks.is_empty());
    }

    #[test]
    fn unit_result_counts_as_result() {
        let outcome: Outcome<(), Fault> = Scope::new().run(|| Ok(()));
        assert!(outcome.result().is_some());
        assert!(outcome.error().is_none());
    }

    #[test]
    fn later_constructor_replaces_earlier_name() {
        let op = counter();
        let a = op.clone();
        let b = op.clone();
        let scope = Scope::new()
            .with("count", move || a.intercept(|n| Ok(n + 1)))
            .with("count", move || b.intercept(|n| Ok(n + 100)));
        assert_eq!(scope.len(), 1);

        let outcome: Outcome<u32, Fault> = scope.run(|| op.call(1));
        assert_eq!(outcome.result(), Some(&101));
    }

    #[test]
    fn prepare_collects_named_constructors() {
        let op = counter();
        let alias = op.clone();
        let scope = prepare([(
            "count",
            constructor(move || alias.intercept(|n| Ok(n * 2))),
        )]);
        assert_eq!(scope.names().collect::<Vec<_>>(), vec!["count"]);

        let outcome: Outcome<u32, Fault> = scope.run(|| op.call(21));
        assert_eq!(outcome.result(), Some(&42));
        assert_eq!(outcome.mock("count").expect("mock").call_count(), 1);
        assert!(!op.is_intercepted());

        let (result, mocks) = outcome.into_parts();
        assert_eq!(result.expect("result"), 42);
        let calls = mocks["count"].calls::<u32, u32>().expect("typed");
        assert_eq!(calls[0].args, 21);
    }

    struct UnreadableHistory;

    impl Intercept for UnreadableHistory {
        fn name(&self) -> &str {
            "unreadable"
        }

        fn snapshot(&self) -> Recording {
            panic!("history could not be copied");
        }

        fn restore(&self) -> bool {
            true
        }

        fn is_active(&self) -> bool {
            true
        }
    }

    #[test]
    fn panicking_snapshot_still_restores_remaining() {
        let op = counter();
        let alias = op.clone();
        let scope = Scope::new()
            .with("count", move || alias.intercept(|n| Ok(n + 1)))
            .with("unreadable", || UnreadableHistory);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scope.run(|| op.call(1))
        }));

        assert!(result.is_err());
        assert!(!op.is_intercepted());
        assert_eq!(op.call(1).expect("call"), 1);
    }

    #[test]
    fn dropped_guard_restores() {
        let op = counter();
        let alias = op.clone();
        let scope = Scope::new().with("count", move || alias.intercept(|n| Ok(n + 1)));

        let installed = scope.install();
        assert!(op.is_intercepted());
        drop(installed);
        assert!(!op.is_intercepted());
    }
}
