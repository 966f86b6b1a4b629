//! Recorded invocations of an intercepted operation.

use crate::fault::Fault;

/// How a single intercepted call ended.
///
/// A call is recorded when it starts, so an entry stays `Pending` while its
/// implementation is still running.
#[derive(Debug, Clone)]
pub enum CallOutcome<R> {
    Pending,
    Returned(R),
    Raised(Fault),
}

impl<R> CallOutcome<R> {
    pub fn returned(&self) -> Option<&R> {
        match self {
            CallOutcome::Returned(value) => Some(value),
            CallOutcome::Pending | CallOutcome::Raised(_) => None,
        }
    }

    pub fn raised(&self) -> Option<&Fault> {
        match self {
            CallOutcome::Pending | CallOutcome::Returned(_) => None,
            CallOutcome::Raised(fault) => Some(fault),
        }
    }

    pub fn is_raised(&self) -> bool {
        matches!(self, CallOutcome::Raised(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CallOutcome::Pending)
    }
}

impl<R: Clone> CallOutcome<R> {
    fn settled(result: &Result<R, Fault>) -> Self {
        match result {
            Ok(value) => CallOutcome::Returned(value.clone()),
            Err(fault) => CallOutcome::Raised(fault.clone()),
        }
    }
}

/// One entry in an interception's call history.
#[derive(Debug, Clone)]
pub struct Call<A, R> {
    /// Arguments the operation was invoked with.
    pub args: A,
    pub outcome: CallOutcome<R>,
}

impl<A, R> Call<A, R> {
    #[cfg(test)]
    pub(crate) fn new(args: A, result: &Result<R, Fault>) -> Self
    where
        R: Clone,
    {
        Self {
            args,
            outcome: CallOutcome::settled(result),
        }
    }

    /// Entry for a call whose implementation has not returned yet.
    pub(crate) fn pending(args: A) -> Self {
        Self {
            args,
            outcome: CallOutcome::Pending,
        }
    }

    pub(crate) fn settle(&mut self, result: &Result<R, Fault>)
    where
        R: Clone,
    {
        self.outcome = CallOutcome::settled(result);
    }

    pub fn returned(&self) -> Option<&R> {
        self.outcome.returned()
    }

    pub fn raised(&self) -> Option<&Fault> {
        self.outcome.raised()
    }
}
