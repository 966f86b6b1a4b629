//! Opt-in tracing output for debugging interceptions.
//!
//! Install, restore and scope events are emitted at `debug`; every
//! intercepted call is emitted at `trace`. Nothing is printed unless a test
//! calls [`init`].

use tracing::trace;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset: only procmock warnings, such as an
/// interrupted scoped run.
pub const DEFAULT_FILTER: &str = "procmock=warn";

/// Route procmock's tracing events through the test harness's output
/// capture, so they show up only for failing tests.
///
/// Safe to call from every test; the first call wins.
///
/// # Example
/// ```bash
/// RUST_LOG=procmock=trace cargo test -- --nocapture
/// ```
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`], with `fallback` as the filter when `RUST_LOG` is unset.
pub fn init_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().without_time().compact())
        .try_init();
    if installed.is_err() {
        trace!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init_with("procmock=trace");
        init();
    }
}
