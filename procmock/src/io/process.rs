//! Process-level operations: termination, standard streams, uptime.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::core::operation::Operation;
use crate::fault::Fault;

/// Payload of a single stream write: text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Bytes(Vec<u8>),
}

impl Chunk {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Text(text) => text.as_bytes(),
            Chunk::Bytes(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Chunk::Text(text) => Some(text),
            Chunk::Bytes(_) => None,
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chunk::Text(text) => f.write_str(text),
            Chunk::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::Text(text.to_string())
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::Text(text)
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Chunk::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk::Bytes(bytes)
    }
}

/// Completion callback passed along with a write.
///
/// Equality is identity: two callbacks are equal only if one is a clone of
/// the other.
#[derive(Clone)]
pub struct WriteCallback(Arc<dyn Fn() + Send + Sync>);

impl WriteCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn invoke(&self) {
        (self.0)();
    }
}

impl PartialEq for WriteCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for WriteCallback {}

impl fmt::Debug for WriteCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteCallback({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// Arguments of a stream write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteArgs {
    pub chunk: Chunk,
    /// Encoding label supplied by the caller. Text is always written as UTF-8;
    /// the label is carried so interceptions can observe it.
    pub encoding: Option<String>,
    /// Invoked by the real stream once the chunk has been flushed.
    /// Interceptions only record it.
    pub callback: Option<WriteCallback>,
}

impl WriteArgs {
    pub fn new(chunk: impl Into<Chunk>, encoding: Option<&str>) -> Self {
        Self {
            chunk: chunk.into(),
            encoding: encoding.map(str::to_string),
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: WriteCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl From<&str> for WriteArgs {
    fn from(text: &str) -> Self {
        Self::new(text, None)
    }
}

impl From<String> for WriteArgs {
    fn from(text: String) -> Self {
        Self::new(text, None)
    }
}

impl From<&[u8]> for WriteArgs {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes, None)
    }
}

impl From<Vec<u8>> for WriteArgs {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// One writable output stream.
#[derive(Debug, Clone)]
pub struct Stream {
    write: Operation<WriteArgs, bool>,
}

impl Stream {
    fn real(kind: StreamKind) -> Self {
        let name = match kind {
            StreamKind::Stdout => "process.stdout.write",
            StreamKind::Stderr => "process.stderr.write",
        };
        let write = Operation::new(name, move |args: WriteArgs| {
            let bytes = args.chunk.as_bytes();
            match kind {
                StreamKind::Stdout => {
                    let mut out = std::io::stdout().lock();
                    out.write_all(bytes)?;
                    out.flush()?;
                }
                StreamKind::Stderr => {
                    let mut err = std::io::stderr().lock();
                    err.write_all(bytes)?;
                    err.flush()?;
                }
            }
            if let Some(callback) = &args.callback {
                callback.invoke();
            }
            Ok(true)
        });
        Self { write }
    }

    pub fn write(&self, chunk: impl Into<Chunk>) -> Result<bool, Fault> {
        self.write.call(WriteArgs::new(chunk, None))
    }

    pub fn write_with_encoding(
        &self,
        chunk: impl Into<Chunk>,
        encoding: &str,
    ) -> Result<bool, Fault> {
        self.write.call(WriteArgs::new(chunk, Some(encoding)))
    }

    /// Write `chunk` and have `callback` invoked once it is flushed.
    pub fn write_with_callback(
        &self,
        chunk: impl Into<Chunk>,
        encoding: Option<&str>,
        callback: WriteCallback,
    ) -> Result<bool, Fault> {
        self.write
            .call(WriteArgs::new(chunk, encoding).with_callback(callback))
    }

    pub fn write_operation(&self) -> &Operation<WriteArgs, bool> {
        &self.write
    }
}

/// Process target exposing the operations tests usually need to intercept.
///
/// `Process::new` wires the real behavior. Code under test takes a
/// `&Process` (or a clone) instead of calling `std::process` directly, which
/// is what makes the operations replaceable.
#[derive(Debug, Clone)]
pub struct Process {
    exit: Operation<i32, ()>,
    stdout: Stream,
    stderr: Stream,
    uptime: Operation<(), f64>,
}

impl Default for Process {
    fn default() -> Self {
        Self::new()
    }
}

impl Process {
    pub fn new() -> Self {
        let started = Instant::now();
        Self {
            exit: Operation::new("process.exit", |code: i32| {
                info!(code, "exiting process");
                std::process::exit(code)
            }),
            stdout: Stream::real(StreamKind::Stdout),
            stderr: Stream::real(StreamKind::Stderr),
            uptime: Operation::new("process.uptime", move |()| {
                Ok(started.elapsed().as_secs_f64())
            }),
        }
    }

    /// Terminate the process with `code`.
    ///
    /// With the real implementation this never returns. An interception may
    /// return normally or raise a [`Fault`] instead.
    pub fn exit(&self, code: i32) -> Result<(), Fault> {
        self.exit.call(code)
    }

    /// Seconds elapsed since this target was created.
    pub fn uptime(&self) -> Result<f64, Fault> {
        self.uptime.call(())
    }

    pub fn stdout(&self) -> &Stream {
        &self.stdout
    }

    pub fn stderr(&self) -> &Stream {
        &self.stderr
    }

    pub fn exit_operation(&self) -> &Operation<i32, ()> {
        &self.exit
    }

    pub fn uptime_operation(&self) -> &Operation<(), f64> {
        &self.uptime
    }

    /// Restore every intercepted operation. Returns how many were restored.
    pub fn restore_all(&self) -> usize {
        [
            self.exit.restore(),
            self.stdout.write.restore(),
            self.stderr.write.restore(),
            self.uptime.restore(),
        ]
        .into_iter()
        .filter(|restored| *restored)
        .count()
    }
}
