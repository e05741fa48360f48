//! Player child process
//!
//! The player reads key commands from stdin and exits when stdin closes, so the
//! pipe is held open until the process ends on its own or is quit over the bus.

use crate::args::build_args;
use async_trait::async_trait;
use omxctl_core::{ControlError, ExitSignal, LaunchRequest, PlayerLauncher, ProcessExit, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Launches omxplayer as a child process
#[derive(Debug, Clone)]
pub struct OmxProcessLauncher {
    program: PathBuf,
}

impl Default for OmxProcessLauncher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("omxplayer"),
        }
    }
}

impl OmxProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different player binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl PlayerLauncher for OmxProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<ExitSignal> {
        let args = build_args(&request.path, &request.options, &request.destination);
        info!("Launching {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ControlError::Launch(format!("{}: {}", self.program.display(), e)))?;

        let stdin = child.stdin.take();
        let pid = child.id();
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => ProcessExit {
                    code: status.code(),
                },
                Err(e) => {
                    warn!("Failed to wait for player {:?}: {}", pid, e);
                    ProcessExit::unknown()
                }
            };
            drop(stdin);
            debug!("Player {:?} exited with {:?}", pid, exit.code);
            let _ = sender.send(exit);
        });

        Ok(receiver)
    }
}
