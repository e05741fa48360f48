//! Test doubles for the bus channel and the process launcher
#![allow(dead_code)]

use async_trait::async_trait;
use omxctl_core::{
    Command, CommandChannel, ControllerConfig, Destination, ExitSignal, IpcFailure, LaunchRequest,
    PlayerLauncher, ProcessExit, Result, SessionController,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Media length reported by [`MockChannel`]
pub const MEDIA_DURATION: Duration = Duration::from_secs(60);

/// Scripted player on the bus
///
/// Positions advance with the (paused) tokio clock from the moment the mock was
/// created, so a playing session reports a steadily increasing position.
pub struct MockChannel {
    started: Instant,
    /// `getplaystatus` calls that still fail before the player "comes up"
    silent_polls: AtomicU32,
    fail_all: AtomicBool,
    /// Time each call takes before it answers
    latency: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockChannel {
    /// Must be called inside a runtime
    pub fn new() -> Arc<Self> {
        Self::with_silent_polls(0)
    }

    pub fn with_silent_polls(silent: u32) -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            silent_polls: AtomicU32::new(silent),
            fail_all: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Make every subsequent call fail
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_silent_polls(&self, silent: u32) {
        self.silent_polls.store(silent, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Wire form of every call seen so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls whose wire form starts with `name`
    pub fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.split(' ').next() == Some(name))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn take_silent_poll(&self) -> bool {
        self.silent_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CommandChannel for MockChannel {
    async fn invoke(
        &self,
        _destination: &Destination,
        command: &Command,
    ) -> std::result::Result<String, IpcFailure> {
        self.calls.lock().push(command.to_string());
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(IpcFailure::new(command.to_string(), "no reply"));
        }

        match command {
            Command::GetPlayStatus => {
                if self.take_silent_poll() {
                    Err(IpcFailure::new(command.to_string(), "service unknown"))
                } else {
                    Ok("Playing".to_string())
                }
            }
            Command::GetPosition => Ok(self.started.elapsed().as_micros().to_string()),
            Command::GetDuration => Ok(MEDIA_DURATION.as_micros().to_string()),
            Command::GetVolume => Ok("0.8".to_string()),
            _ => Ok(String::new()),
        }
    }
}

/// Launcher that never spawns anything
///
/// Keeps the exit sender of every launch so tests can simulate the process ending.
#[derive(Default)]
pub struct MockLauncher {
    fail: AtomicBool,
    requests: Mutex<Vec<LaunchRequest>>,
    exits: Mutex<Vec<oneshot::Sender<ProcessExit>>>,
}

impl MockLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().clone()
    }

    /// Signal exit of the most recently launched process
    pub fn exit(&self, exit: ProcessExit) -> bool {
        match self.exits.lock().pop() {
            Some(sender) => sender.send(exit).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl PlayerLauncher for MockLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<ExitSignal> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(omxctl_core::ControlError::Launch(
                "omxplayer: not found".to_string(),
            ));
        }
        self.requests.lock().push(request.clone());
        let (sender, receiver) = oneshot::channel();
        self.exits.lock().push(sender);
        Ok(receiver)
    }
}

pub fn controller(
    config: ControllerConfig,
    channel: &Arc<MockChannel>,
    launcher: &Arc<MockLauncher>,
) -> SessionController {
    SessionController::new(config, channel.clone(), launcher.clone())
}
