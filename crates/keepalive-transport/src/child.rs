use std::ffi::OsStr;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::stream::{ByteSink, ByteSource};

/// A long-lived child process driven over its standard streams.
///
/// The child's stdin and stdout are piped and handed back as a
/// [`ByteSink`]/[`ByteSource`] pair; stderr is inherited so the child's logs
/// reach the parent's stderr untouched. A child still running when this
/// handle is dropped is killed and reaped.
pub struct ChildProcess {
    child: Child,
    program: String,
}

impl ChildProcess {
    /// Spawn `program` with `args`, piping stdin and stdout.
    ///
    /// Returns the process handle plus the source reading the child's stdout
    /// and the sink writing the child's stdin.
    pub fn spawn<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<(Self, ByteSource, ByteSink)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program_name = program.as_ref().to_string_lossy().into_owned();
        let mut child = Command::new(program.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::MissingPipe("stdout"))?;

        info!(program = %program_name, pid = child.id(), "spawned keepalive child");

        Ok((
            Self {
                child,
                program: program_name,
            },
            ByteSource::from_child(stdout),
            ByteSink::from_child(stdin),
        ))
    }

    /// OS process id of the child.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Program name the child was spawned from.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Exit status if the child has already exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the child exits.
    ///
    /// The child normally exits once its stdin is closed, so drop the
    /// [`ByteSink`] before calling this.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait()?;
        debug!(program = %self.program, %status, "keepalive child exited");
        Ok(status)
    }

    /// Kill the child and reap it.
    pub fn kill(&mut self) -> Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err.into()),
        }
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!(program = %self.program, pid = self.child.id(), "killing keepalive child on drop");
            if let Err(err) = self.kill() {
                warn!(program = %self.program, error = %err, "failed to kill keepalive child");
            }
        }
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .finish()
    }
}
