//! Preconfigured interceptions for common process and console operations.
//!
//! Each constructor replaces one operation with a recording stand-in. Any
//! interception already pending on that operation is restored first, so
//! calling a constructor again (e.g. once per test) never stacks mocks.

use serde_json::Value;

use crate::core::operation::Interception;
use crate::core::scope::Scope;
use crate::fault::Fault;
use crate::io::config::MockConfig;
use crate::io::console::Console;
use crate::io::process::{Process, Stream, WriteArgs};

/// Intercept `process.exit`.
///
/// With `None` the call returns normally, letting the code under test keep
/// running. With `Some(fault)` every call raises that fault.
pub fn mock_process_exit(process: &Process, fault: Option<Fault>) -> Interception<i32, ()> {
    process
        .exit_operation()
        .intercept(move |_code| match &fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        })
}

/// Intercept writes to `stream`, returning `returns` from every write.
pub fn mock_stream_write(stream: &Stream, returns: bool) -> Interception<WriteArgs, bool> {
    stream.write_operation().intercept(move |_args| Ok(returns))
}

/// Intercept `process.stdout.write`. Writes report success.
pub fn mock_process_stdout(process: &Process) -> Interception<WriteArgs, bool> {
    mock_stream_write(process.stdout(), true)
}

/// Intercept `process.stderr.write`. Writes report success.
pub fn mock_process_stderr(process: &Process) -> Interception<WriteArgs, bool> {
    mock_stream_write(process.stderr(), true)
}

/// Intercept `process.uptime`, returning `value` (default `0.0`).
pub fn mock_process_uptime(process: &Process, value: Option<f64>) -> Interception<(), f64> {
    let value = value.unwrap_or(0.0);
    process.uptime_operation().intercept(move |()| Ok(value))
}

/// Intercept `console.log`. Logged values are recorded and discarded.
pub fn mock_console_log(console: &Console) -> Interception<Vec<Value>, ()> {
    console.log_operation().intercept(|_values| Ok(()))
}

/// Scope intercepting every process and console operation, named `exit`,
/// `stdout`, `stderr`, `uptime` and `log`.
pub fn standard_scope(process: &Process, console: &Console, config: &MockConfig) -> Scope {
    let exit_fault = config.exit_fault.as_deref().map(Fault::msg);
    let write_returns = config.write_returns;
    let uptime = config.uptime_secs;

    let exit = process.clone();
    let stdout = process.clone();
    let stderr = process.clone();
    let clock = process.clone();
    let log = console.clone();

    Scope::new()
        .with("exit", move || mock_process_exit(&exit, exit_fault.clone()))
        .with("stdout", move || mock_stream_write(stdout.stdout(), write_returns))
        .with("stderr", move || mock_stream_write(stderr.stderr(), write_returns))
        .with("uptime", move || mock_process_uptime(&clock, Some(uptime)))
        .with("log", move || mock_console_log(&log))
}
