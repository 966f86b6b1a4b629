//! Test-only fixtures: fresh targets and a small program that touches every
//! intercepted operation.

use crate::core::scope::Scope;
use crate::fault::Fault;
use crate::io::config::MockConfig;
use crate::io::console::Console;
use crate::io::process::Process;
use crate::mocks::standard_scope;

/// A process and console pair private to one test.
#[derive(Debug, Clone, Default)]
pub struct Targets {
    pub process: Process,
    pub console: Console,
}

/// Create fresh targets wired to the real operations.
pub fn targets() -> Targets {
    Targets {
        process: Process::new(),
        console: Console::new(),
    }
}

/// Create a fault with a deterministic message.
pub fn fault(message: &str) -> Fault {
    Fault::msg(message)
}

/// Standard scope over `targets` with default config.
pub fn default_scope(targets: &Targets) -> Scope {
    standard_scope(&targets.process, &targets.console, &MockConfig::default())
}

/// Write to both streams, exit with `-1`, then log.
///
/// Mirrors a CLI error path: if the exit raises, the log line is never
/// reached.
pub fn report_and_exit(targets: &Targets) -> Result<(), Fault> {
    targets.process.stdout().write("stdout payload")?;
    targets.process.stderr().write("stderr payload")?;
    targets.process.exit(-1)?;
    targets.console.log("log payload")?;
    Ok(())
}

/// True if no operation on `targets` is intercepted.
pub fn all_restored(targets: &Targets) -> bool {
    let process = &targets.process;
    !process.exit_operation().is_intercepted()
        && !process.uptime_operation().is_intercepted()
        && !process.stdout().write_operation().is_intercepted()
        && !process.stderr().write_operation().is_intercepted()
        && !targets.console.log_operation().is_intercepted()
}
