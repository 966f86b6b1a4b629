//! Console logging channel.

use std::io::Write;

use serde_json::Value;

use crate::core::operation::Operation;
use crate::fault::Fault;

/// Render logged values the way a console prints them: strings verbatim,
/// everything else as compact JSON, separated by single spaces.
pub fn render(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Console target with a single `log` operation.
#[derive(Debug, Clone)]
pub struct Console {
    log: Operation<Vec<Value>, ()>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Console that prints each log line to standard output.
    pub fn new() -> Self {
        Self {
            log: Operation::new("console.log", |values: Vec<Value>| {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", render(&values))?;
                Ok(())
            }),
        }
    }

    pub fn log(&self, message: impl Into<Value>) -> Result<(), Fault> {
        self.log.call(vec![message.into()])
    }

    /// Log a message followed by additional values on one line.
    pub fn log_all(&self, values: Vec<Value>) -> Result<(), Fault> {
        self.log.call(values)
    }

    pub fn log_operation(&self) -> &Operation<Vec<Value>, ()> {
        &self.log
    }

    /// Restore the `log` operation if it is intercepted.
    pub fn restore_all(&self) -> usize {
        usize::from(self.log.restore())
    }
}
