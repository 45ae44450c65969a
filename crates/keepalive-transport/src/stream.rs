use std::io::{Read, Write};
use std::process::{ChildStdin, ChildStdout};

/// Readable end of a keepalive byte stream.
///
/// Wraps either this process's standard input or the stdout pipe of a
/// spawned child. Reads return whatever chunk the OS hands back; callers
/// must not assume chunks line up with anything.
pub struct ByteSource {
    inner: SourceInner,
}

enum SourceInner {
    Stdin(std::io::Stdin),
    Child(ChildStdout),
}

/// Writable end of a keepalive byte stream.
pub struct ByteSink {
    inner: SinkInner,
}

enum SinkInner {
    Stdout(std::io::Stdout),
    Child(ChildStdin),
}

/// Standard input and output of the current process.
///
/// This is the default pairing for the child side of a keepalive bridge.
/// Nothing else in the process should write to stdout while a channel owns
/// the sink, since stray bytes corrupt the frame stream.
pub fn stdio() -> (ByteSource, ByteSink) {
    (ByteSource::stdin(), ByteSink::stdout())
}

/// Tokio standard input and output of the current process.
#[cfg(feature = "async")]
pub fn async_stdio() -> (tokio::io::Stdin, tokio::io::Stdout) {
    (tokio::io::stdin(), tokio::io::stdout())
}

impl ByteSource {
    /// Source reading this process's standard input.
    pub fn stdin() -> Self {
        Self {
            inner: SourceInner::Stdin(std::io::stdin()),
        }
    }

    pub(crate) fn from_child(stdout: ChildStdout) -> Self {
        Self {
            inner: SourceInner::Child(stdout),
        }
    }

    fn kind(&self) -> &'static str {
        match &self.inner {
            SourceInner::Stdin(_) => "stdin",
            SourceInner::Child(_) => "child-stdout",
        }
    }
}

impl ByteSink {
    /// Sink writing this process's standard output.
    pub fn stdout() -> Self {
        Self {
            inner: SinkInner::Stdout(std::io::stdout()),
        }
    }

    pub(crate) fn from_child(stdin: ChildStdin) -> Self {
        Self {
            inner: SinkInner::Child(stdin),
        }
    }

    fn kind(&self) -> &'static str {
        match &self.inner {
            SinkInner::Stdout(_) => "stdout",
            SinkInner::Child(_) => "child-stdin",
        }
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SourceInner::Stdin(stdin) => stdin.lock().read(buf),
            SourceInner::Child(stdout) => stdout.read(buf),
        }
    }
}

impl Write for ByteSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SinkInner::Stdout(stdout) => stdout.lock().write(buf),
            SinkInner::Child(stdin) => stdin.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SinkInner::Stdout(stdout) => stdout.lock().flush(),
            SinkInner::Child(stdin) => stdin.flush(),
        }
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("type", &self.kind())
            .finish()
    }
}

impl std::fmt::Debug for ByteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSink").field("type", &self.kind()).finish()
    }
}
