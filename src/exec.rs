//! Runs button commands without blocking the event loop.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tempfile::Builder;
use tracing::{debug, warn};

/// Starts the command behind a button.
pub trait ActionExecutor {
    /// Returns whether the command could be started.
    fn execute(&mut self, command: &str, run_in_terminal: bool) -> bool;

    /// Collects finished commands. Called once per loop iteration.
    fn reap(&mut self) {}
}

/// Spawns `sh -c COMMAND`, or `$TERMINAL -e SCRIPT` for terminal buttons.
pub struct ShellExecutor {
    terminal: Option<String>,
    children: Vec<Child>,
}

impl ShellExecutor {
    /// Reads `$TERMINAL` from the environment.
    pub fn from_env() -> Self {
        Self::new(std::env::var("TERMINAL").ok())
    }

    pub fn new(terminal: Option<String>) -> Self {
        Self {
            terminal: terminal.filter(|value| !value.trim().is_empty()),
            children: Vec::new(),
        }
    }

    /// Reaps children that have exited. Never blocks.
    pub fn prune_exited(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), ?status, "command exited");
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!(pid = child.id(), error = ?err, "failed to poll command");
                false
            }
        });
    }

    pub fn running(&self) -> usize {
        self.children.len()
    }

    fn spawn(&mut self, command: &str, run_in_terminal: bool) -> Result<()> {
        let shell_line = match (&self.terminal, run_in_terminal) {
            (Some(terminal), true) => {
                debug!(terminal, "running command in terminal");
                let script = write_terminal_script(command)?;
                format!("{terminal} -e {}", script.display())
            }
            (None, true) => {
                debug!("$TERMINAL not set, running command directly");
                command.to_string()
            }
            (_, false) => command.to_string(),
        };
        let child = Command::new("sh")
            .arg("-c")
            .arg(&shell_line)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn `{shell_line}`"))?;
        debug!(pid = child.id(), "command started");
        self.children.push(child);
        Ok(())
    }
}

/// Writes an executable script that deletes itself before running `command`.
fn write_terminal_script(command: &str) -> Result<PathBuf> {
    let mut file = Builder::new()
        .prefix("labnag")
        .tempfile()
        .context("failed to create temp script")?;
    let path = file.path().to_path_buf();
    write!(file, "#!/bin/sh\nrm {}\n{}", path.display(), command)
        .context("failed to write temp script")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o700))
        .context("failed to make temp script executable")?;
    let (_, path) = file.keep().context("failed to persist temp script")?;
    debug!(path = %path.display(), "created temp script");
    Ok(path)
}

impl ActionExecutor for ShellExecutor {
    fn execute(&mut self, command: &str, run_in_terminal: bool) -> bool {
        self.prune_exited();
        match self.spawn(command, run_in_terminal) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = ?err, command, "failed to run button command");
                false
            }
        }
    }

    fn reap(&mut self) {
        self.prune_exited();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn terminal_script_removes_itself() {
        let path = write_terminal_script("echo hi").unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("#!/bin/sh\nrm "));
        assert!(body.ends_with("\necho hi"));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn children_are_reaped_without_blocking() {
        let mut executor = ShellExecutor::new(None);
        assert!(executor.execute("exit 0", false));
        assert_eq!(executor.running(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while executor.running() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
            executor.prune_exited();
        }
        assert_eq!(executor.running(), 0);
    }

    #[test]
    fn blank_terminal_is_ignored() {
        let executor = ShellExecutor::new(Some("  ".into()));
        assert!(executor.terminal.is_none());
    }
}
