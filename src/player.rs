//! Hands audio URLs to an external player. Nothing is decoded here.

use std::io;
use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

/// How to open an audio URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Launcher {
    /// A user-supplied command line; the URL is appended as the last argument
    Command(Vec<String>),
    /// The platform's default URL handler
    SystemOpener,
}

impl Launcher {
    /// Parse a command line such as `mpv --no-video`; blank means the system opener
    pub fn from_command_line(cmd: Option<&str>) -> Self {
        let parts: Vec<String> = cmd
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        if parts.is_empty() {
            Launcher::SystemOpener
        } else {
            Launcher::Command(parts)
        }
    }

    fn command_for(&self, url: &str) -> Command {
        match self {
            Launcher::Command(parts) => {
                let mut cmd = Command::new(&parts[0]);
                cmd.args(&parts[1..]).arg(url);
                cmd
            }
            Launcher::SystemOpener => system_opener(url),
        }
    }
}

/// Runs one player process at a time
#[derive(Debug)]
pub struct Player {
    launcher: Launcher,
    /// Last started process, reaped or killed before the next one starts
    current: Option<Child>,
}

impl Player {
    pub fn new(launcher: Launcher) -> Self {
        Self {
            launcher,
            current: None,
        }
    }

    pub fn from_command_line(cmd: Option<&str>) -> Self {
        Self::new(Launcher::from_command_line(cmd))
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Start playback without waiting; the child's output is discarded so it
    /// cannot draw over the terminal UI. A still-running previous player is
    /// stopped first.
    pub fn play(&mut self, url: &str) -> io::Result<()> {
        self.stop();
        let child = self
            .launcher
            .command_for(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        info!(pid = child.id(), %url, "player started");
        self.current = Some(child);
        Ok(())
    }

    /// Reap the last player, killing it if it is still running
    fn stop(&mut self) {
        let Some(mut child) = self.current.take() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => debug!(pid = child.id(), %status, "player already exited"),
            _ => {
                if let Err(e) = child.kill() {
                    warn!(pid = child.id(), error = %e, "could not stop player");
                }
                // Reap so no zombie is left behind
                let _ = child.wait();
                debug!(pid = child.id(), "player stopped");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(target_os = "macos")]
fn system_opener(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn system_opener(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(url);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_opener(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
