//! Session controller
//!
//! Owns one player session at a time: launch, startup confirmation, commands,
//! cached reads, progress reporting and lifecycle notifications.
//!
//! Mutating commands go through the [`RetryingExecutor`] and report exhaustion to
//! the caller. Reads come from the [`StateStore`] and never wait on the bus.
//! `stop` and `quit` always leave the controller looking stopped, whether or not
//! the player acknowledged them.

use crate::channel::CommandChannel;
use crate::command::{checked_micros, Command};
use crate::config::ControllerConfig;
use crate::confirm::{Confirmation, StartupConfirmation};
use crate::destination::Destination;
use crate::error::{ControlError, Result};
use crate::executor::RetryingExecutor;
use crate::launch::{ExitSignal, LaunchRequest, OpenOptions, PlayerLauncher, ProcessExit};
use crate::progress::{ProgressHandle, ProgressReporter, ProgressSnapshot};
use crate::reply::PlayStatus;
use crate::store::StateStore;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Lifecycle of the controller's current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    /// Player launched, waiting for it to answer on the bus
    Launching,
    /// Player answered; carries the last known play status
    Confirmed(PlayStatus),
    /// Player exited, or was stopped or quit
    Ended,
}

impl SessionState {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SessionState::Confirmed(_))
    }

    /// Launching or confirmed
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Launching | SessionState::Confirmed(_))
    }
}

type StartCallback = Arc<dyn Fn() + Send + Sync>;
type DoneCallback = Arc<dyn Fn(ProcessExit) + Send + Sync>;

#[derive(Default)]
struct SessionSlot {
    state: SessionState,
    /// Incremented by every `open`; identifies the session exit watchers belong to
    generation: u64,
    /// An `open` call is still running, even if its session already ended
    opening: bool,
    /// The last session ended because its process exited
    exited: bool,
}

#[derive(Default)]
struct Listeners {
    on_start: Vec<StartCallback>,
    on_done: Vec<DoneCallback>,
}

struct Shared {
    config: ControllerConfig,
    destination: Destination,
    channel: Arc<dyn CommandChannel>,
    launcher: Arc<dyn PlayerLauncher>,
    executor: Arc<RetryingExecutor>,
    store: StateStore,
    session: Mutex<SessionSlot>,
    progress: Mutex<Option<ProgressHandle>>,
    listeners: Mutex<Listeners>,
    /// Woken whenever a session ends, so a pending `open` stops polling
    ended: Notify,
}

impl Shared {
    fn state(&self) -> SessionState {
        self.session.lock().state
    }

    /// Claim the controller for a new session
    fn begin_session(&self) -> Result<u64> {
        let mut slot = self.session.lock();
        if slot.state.is_busy() || slot.opening {
            return Err(ControlError::SessionBusy);
        }
        slot.generation += 1;
        slot.state = SessionState::Launching;
        slot.opening = true;
        slot.exited = false;
        Ok(slot.generation)
    }

    /// Back to idle after a failed launch or confirmation
    fn abandon(&self, generation: u64) {
        {
            let mut slot = self.session.lock();
            if slot.generation != generation || slot.state != SessionState::Launching {
                return;
            }
            slot.state = SessionState::Idle;
        }
        self.store.reset_all();
    }

    /// Move a launching session to confirmed; false if it ended meanwhile
    fn confirm(&self, generation: u64, status: PlayStatus) -> bool {
        let mut slot = self.session.lock();
        if slot.generation != generation || slot.state != SessionState::Launching {
            return false;
        }
        slot.state = SessionState::Confirmed(status);
        true
    }

    fn set_status(&self, status: PlayStatus) {
        self.store.write_status(status);
        let mut slot = self.session.lock();
        if slot.state.is_confirmed() {
            slot.state = SessionState::Confirmed(status);
        }
    }

    fn cancel_progress(&self) {
        let handle = self.progress.lock().take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Tear down local session state after stop, quit or exit
    fn end_session(&self, exited: bool) {
        {
            let mut slot = self.session.lock();
            slot.state = SessionState::Ended;
            slot.exited = exited;
        }
        self.store.reset_all();
        self.cancel_progress();
        self.ended.notify_waiters();
    }

    /// Error for an `open` whose session ended before it was confirmed
    fn ended_error(&self) -> ControlError {
        if self.session.lock().exited {
            ControlError::ProcessExited
        } else {
            ControlError::SessionEnded
        }
    }

    fn handle_exit(&self, generation: u64, exit: ProcessExit) {
        info!(
            "Player on {} exited (code {:?})",
            self.destination, exit.code
        );
        let current = self.session.lock().generation == generation;
        if current {
            self.end_session(true);
        }
        let listeners = self.listeners.lock().on_done.clone();
        for listener in listeners {
            listener(exit);
        }
    }

    fn sample(&self) -> Option<ProgressSnapshot> {
        if !self.state().is_confirmed() {
            return None;
        }
        Some(self.store.snapshot())
    }
}

/// Marks the end of an `open` call, however it returns
struct OpenGuard<'a>(&'a Shared);

impl Drop for OpenGuard<'_> {
    fn drop(&mut self) {
        self.0.session.lock().opening = false;
    }
}

/// Controls one player instance on one bus destination
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Validate `config` and build a controller from it
    pub fn try_new(
        config: ControllerConfig,
        channel: Arc<dyn CommandChannel>,
        launcher: Arc<dyn PlayerLauncher>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, channel, launcher))
    }

    pub fn new(
        config: ControllerConfig,
        channel: Arc<dyn CommandChannel>,
        launcher: Arc<dyn PlayerLauncher>,
    ) -> Self {
        let destination = Destination::new(config.layer);
        let executor = Arc::new(RetryingExecutor::new(
            channel.clone(),
            destination.clone(),
            config.retry.clone(),
        ));
        let store = StateStore::new(executor.clone(), config.cache.clone());
        info!("Session controller for {}", destination);

        Self {
            shared: Arc::new(Shared {
                config,
                destination,
                channel,
                launcher,
                executor,
                store,
                session: Mutex::new(SessionSlot::default()),
                progress: Mutex::new(None),
                listeners: Mutex::new(Listeners::default()),
                ended: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn destination(&self) -> &Destination {
        &self.shared.destination
    }

    pub fn layer(&self) -> u32 {
        self.shared.destination.layer()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The cached state store of this controller
    pub fn store(&self) -> &StateStore {
        &self.shared.store
    }

    /// Launch a player for `path` and wait until it answers on the bus
    pub async fn open(
        &self,
        path: impl Into<PathBuf>,
        options: OpenOptions,
    ) -> Result<Confirmation> {
        let path = path.into();
        let shared = &self.shared;
        let generation = shared.begin_session()?;
        let _opening = OpenGuard(shared);
        let ended = shared.ended.notified();
        tokio::pin!(ended);
        ended.as_mut().enable();
        info!(
            "Opening {:?} on layer {} (hold mode: {})",
            path,
            self.layer(),
            options.hold_mode
        );

        shared.store.reset_all();
        shared.store.set_path(path.clone());

        let hold_mode = options.hold_mode;
        let request = LaunchRequest {
            path,
            options,
            destination: shared.destination.clone(),
        };
        let exit = match shared.launcher.launch(&request).await {
            Ok(exit) => exit,
            Err(e) => {
                warn!("Launch failed: {}", e);
                shared.abandon(generation);
                return Err(e);
            }
        };
        self.watch_exit(generation, exit);

        let mut confirmation = StartupConfirmation::new(shared.config.confirm.clone());
        let confirmed = tokio::select! {
            biased;
            _ = &mut ended => {
                debug!("Session on {} ended while waiting for startup", shared.destination);
                return Err(shared.ended_error());
            }
            result = confirmation.confirm_start(shared.channel.as_ref(), &shared.destination) => {
                match result {
                    Ok(confirmed) => confirmed,
                    Err(e) => {
                        shared.abandon(generation);
                        return Err(e);
                    }
                }
            }
        };

        let status = PlayStatus::from_reply(&confirmed.reply).unwrap_or(PlayStatus::Playing);
        if !shared.confirm(generation, status) {
            return Err(shared.ended_error());
        }
        shared.store.write_status(status);
        shared.store.prime();

        if hold_mode {
            debug!("Hold mode: pausing and hiding");
            if let Err(e) = self.pause().await {
                warn!("Hold mode pause failed: {}", e);
            }
            if let Err(e) = self.set_visibility(false).await {
                warn!("Hold mode hide failed: {}", e);
            }
        }

        let listeners = shared.listeners.lock().on_start.clone();
        for listener in listeners {
            listener();
        }
        Ok(confirmed)
    }

    fn watch_exit(&self, generation: u64, exit: ExitSignal) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let exit = exit.await.unwrap_or_else(|_| ProcessExit::unknown());
            if let Some(shared) = weak.upgrade() {
                shared.handle_exit(generation, exit);
            }
        });
    }

    /// Start playback
    pub async fn resume(&self) -> Result<()> {
        self.shared.executor.execute(&Command::Play).await?;
        self.shared.set_status(PlayStatus::Playing);
        Ok(())
    }

    /// Pause playback
    pub async fn pause(&self) -> Result<()> {
        self.shared.executor.execute(&Command::Pause).await?;
        self.shared.set_status(PlayStatus::Paused);
        Ok(())
    }

    /// Toggle between playing and paused
    pub async fn toggle_play(&self) -> Result<()> {
        self.shared.executor.execute(&Command::TogglePlay).await?;
        if let Some(status) = self.shared.store.toggle_status() {
            self.shared.set_status(status);
        }
        Ok(())
    }

    /// Stop playback; local state is reset even if the player does not answer
    pub async fn stop(&self) -> Result<()> {
        self.terminate(Command::Stop).await
    }

    /// Quit the player; local state is reset even if the player does not answer
    pub async fn quit(&self) -> Result<()> {
        self.terminate(Command::Quit).await
    }

    async fn terminate(&self, command: Command) -> Result<()> {
        let result = self.shared.executor.execute(&command).await;
        self.shared.end_session(false);
        match &result {
            Ok(_) => info!("Sent {} to {}", command, self.shared.destination),
            Err(e) => warn!(
                "{} on {} failed, session reset anyway: {}",
                command, self.shared.destination, e
            ),
        }
        result.map(|_| ())
    }

    /// Seek relative to the current position; negative offsets jump back
    pub async fn seek(&self, offset_secs: f64) -> Result<()> {
        let Some(micros) = checked_micros(offset_secs) else {
            return Err(ControlError::InvalidParameter(format!(
                "seek offset must be a finite number of seconds that fits in microseconds, got {}",
                offset_secs
            )));
        };
        self.shared.executor.execute(&Command::Seek { micros }).await?;
        self.shared.store.shift_position(offset_secs);
        Ok(())
    }

    /// Jump to an absolute position; positions past the end stop the player
    pub async fn set_position(&self, position_secs: f64) -> Result<()> {
        let micros = checked_micros(position_secs)
            .filter(|_| position_secs >= 0.0)
            .ok_or_else(|| {
                ControlError::InvalidParameter(format!(
                    "position must be a non-negative number of seconds that fits in microseconds, got {}",
                    position_secs
                ))
            })?;
        self.shared
            .executor
            .execute(&Command::SetPosition { micros })
            .await?;
        self.shared
            .store
            .write_position(Duration::from_micros(micros.unsigned_abs()));
        Ok(())
    }

    /// Set the volume; values outside the open interval (0, 1) are ignored
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        if !(volume > 0.0 && volume < 1.0) {
            debug!("Ignoring out-of-range volume {}", volume);
            return Ok(());
        }
        self.shared
            .executor
            .execute(&Command::SetVolume(volume))
            .await?;
        self.shared.store.write_volume(volume);
        Ok(())
    }

    /// Show or hide the video layer
    pub async fn set_visibility(&self, visible: bool) -> Result<()> {
        self.shared
            .executor
            .execute(&Command::visibility(visible))
            .await
            .map(|_| ())
    }

    /// Set the video alpha (0 transparent, 255 opaque)
    pub async fn set_alpha(&self, alpha: u8) -> Result<()> {
        self.shared
            .executor
            .execute(&Command::SetAlpha(alpha))
            .await
            .map(|_| ())
    }

    /// Current position (extrapolated while playing)
    pub fn position(&self) -> Duration {
        self.shared.store.position()
    }

    pub fn duration(&self) -> Duration {
        self.shared.store.duration()
    }

    pub fn status(&self) -> PlayStatus {
        self.shared.store.status()
    }

    pub fn volume(&self) -> f64 {
        self.shared.store.volume()
    }

    /// Media path of the current session
    pub fn path(&self) -> Option<PathBuf> {
        self.shared.store.path()
    }

    /// Receive progress snapshots while a session is confirmed
    ///
    /// Replaces any earlier subscription. `None` uses the configured interval.
    pub fn on_progress<F>(&self, interval: Option<Duration>, callback: F) -> ProgressHandle
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        self.shared.cancel_progress();

        let interval = interval
            .filter(|interval| !interval.is_zero())
            .unwrap_or_else(|| self.shared.config.progress_interval());
        let weak = Arc::downgrade(&self.shared);
        let reporter = ProgressReporter::new(move || weak.upgrade().and_then(|s| s.sample()));

        info!(
            "Progress handler for layer {} every {:?}",
            self.layer(),
            interval
        );
        let handle = reporter.subscribe(interval, callback);
        *self.shared.progress.lock() = Some(handle.clone());
        handle
    }

    /// Cancel the progress subscription, if any
    pub fn cancel_progress(&self) {
        self.shared.cancel_progress();
    }

    /// Called once per confirmed session start
    pub fn on_start<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.listeners.lock().on_start.push(Arc::new(callback));
    }

    /// Called once per player process exit
    pub fn on_done<F>(&self, callback: F)
    where
        F: Fn(ProcessExit) + Send + Sync + 'static,
    {
        self.shared.listeners.lock().on_done.push(Arc::new(callback));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shared.cancel_progress();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_predicates() {
        assert!(!SessionState::Idle.is_busy());
        assert!(SessionState::Launching.is_busy());
        assert!(!SessionState::Launching.is_confirmed());
        assert!(SessionState::Confirmed(PlayStatus::Paused).is_confirmed());
        assert!(!SessionState::Ended.is_busy());
    }
}
