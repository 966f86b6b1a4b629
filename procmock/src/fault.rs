//! Errors raised by intercepted operations.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

/// An error value raised by an operation implementation.
///
/// A `Fault` is shared, not copied: every clone refers to the same underlying
/// error, so a fault recorded in a call history and the fault observed by the
/// caller can be compared by identity with [`Fault::ptr_eq`].
#[derive(Clone)]
pub struct Fault(Arc<anyhow::Error>);

impl Fault {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self(Arc::new(err.into()))
    }

    /// Create a fault carrying only a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self(Arc::new(anyhow!("{message}")))
    }

    /// True if both values refer to the same raised error.
    pub fn ptr_eq(a: &Fault, b: &Fault) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fault({:?})", self.0)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Self::new(err)
    }
}
