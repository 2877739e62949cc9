use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::instrument;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SPAWN_ATTEMPTS: u32 = 5;
// ETXTBSY: another thread forked while a freshly provisioned executable was
// still open for writing. The child closes the descriptor on exec, so a
// short retry is enough.
#[cfg(unix)]
const TEXT_FILE_BUSY: i32 = 26;

/// One run of the external renderer.
pub(crate) struct Invocation<'a> {
    pub(crate) executable: &'a Path,
    pub(crate) working_dir: &'a Path,
    pub(crate) args: Vec<OsString>,
    pub(crate) timeout: Option<Duration>,
}

impl Invocation<'_> {
    /// Run the renderer to completion and check that it produced `output`.
    ///
    /// Blocks until the process exits or the timeout expires, in which case
    /// the process is killed. Standard output and error are inherited.
    #[instrument(skip_all, fields(executable = %self.executable.display(), output = %output.display()))]
    pub(crate) fn run(self, output: &Path) -> Result<PathBuf> {
        let mut command = Command::new(self.executable);
        command.args(&self.args).current_dir(self.working_dir).stdin(Stdio::null());
        tracing::debug!(args = ?self.args, "Starting renderer");

        let started = Instant::now();
        let mut child = self.spawn(&mut command)?;
        let status = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout)?,
            None => child.wait().or_raise(|| ErrorKind::Io)?,
        };
        let elapsed = started.elapsed();

        if !status.success() {
            tracing::warn!(?status, ?elapsed, "Renderer failed");
            match status.code() {
                Some(code) => exn::bail!(ErrorKind::RendererFailed(code)),
                None => exn::bail!(ErrorKind::RendererKilled),
            }
        }
        if !output.is_file() {
            exn::bail!(ErrorKind::OutputMissing(output.to_path_buf()));
        }
        tracing::info!(?elapsed, "Renderer finished");
        Ok(output.to_path_buf())
    }

    fn spawn(&self, command: &mut Command) -> Result<Child> {
        let mut attempt = 1;
        loop {
            match command.spawn() {
                Ok(child) => return Ok(child),
                Err(e) if is_text_file_busy(&e) && attempt < SPAWN_ATTEMPTS => {
                    tracing::debug!(attempt, "Renderer executable busy; retrying");
                    sleep(Duration::from_millis(10 * u64::from(attempt)));
                    attempt += 1;
                },
                Err(e) => return Err(e).or_raise(|| ErrorKind::Spawn(self.executable.to_path_buf())),
            }
        }
    }
}

#[cfg(unix)]
fn is_text_file_busy(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(TEXT_FILE_BUSY)
}

#[cfg(not(unix))]
fn is_text_file_busy(_e: &std::io::Error) -> bool {
    false
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().or_raise(|| ErrorKind::Io)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            tracing::warn!(?timeout, pid = child.id(), "Renderer timed out; killing");
            // The process may exit on its own between the check and the kill.
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "Failed to kill renderer");
            }
            child.wait().or_raise(|| ErrorKind::Io)?;
            exn::bail!(ErrorKind::RendererTimeout);
        }
        sleep(POLL_INTERVAL);
    }
}
