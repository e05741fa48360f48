//! Cached state store
//!
//! Reads never wait for the player. A read that finds its field stale schedules
//! a background refresh through the [`RetryingExecutor`] and returns the
//! last-known value right away. At most one refresh per field is in flight. A
//! refresh that lands after [`StateStore::reset_all`] or after a direct write to
//! its field is discarded.

use crate::cache::{CachedState, Field};
use crate::command::Command;
use crate::config::CacheConfig;
use crate::executor::RetryingExecutor;
use crate::progress::ProgressSnapshot;
use crate::reply::{self, PlayStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct StoreInner {
    state: CachedState,
    /// Token of the refresh in flight per field
    refreshing: HashMap<Field, u64>,
    next_token: u64,
}

impl StoreInner {
    /// A direct write supersedes any refresh in flight for the field
    fn supersede(&mut self, field: Field) -> &mut CachedState {
        self.refreshing.remove(&field);
        &mut self.state
    }
}

/// Shared cache of one session's playback state
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<StoreInner>>,
    executor: Arc<RetryingExecutor>,
    config: CacheConfig,
}

impl StateStore {
    pub fn new(executor: Arc<RetryingExecutor>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: CachedState::default(),
                refreshing: HashMap::new(),
                next_token: 0,
            })),
            executor,
            config,
        }
    }

    /// Copy of the raw cached state, without applying read rules
    pub fn state(&self) -> CachedState {
        self.inner.lock().state.clone()
    }

    /// Replace everything with fresh invalid defaults
    pub fn reset_all(&self) {
        let mut inner = self.inner.lock();
        inner.state = CachedState::default();
        inner.refreshing.clear();
    }

    /// Media path of the current session
    pub fn path(&self) -> Option<PathBuf> {
        self.inner.lock().state.path.value().clone()
    }

    pub fn set_path(&self, path: PathBuf) {
        self.inner.lock().state.path.write(Some(path), Instant::now());
    }

    /// Current position, extrapolated while playing
    pub fn position(&self) -> Duration {
        self.read(&[Field::Position, Field::Status], |state, now| {
            state.extrapolated_position(now)
        })
    }

    pub fn status(&self) -> PlayStatus {
        self.read(&[Field::Status], |state, _| *state.status.value())
    }

    /// Media duration; zero until the player reports a plausible value
    pub fn duration(&self) -> Duration {
        self.read(&[Field::Duration], |state, _| *state.duration.value())
    }

    pub fn volume(&self) -> f64 {
        self.read(&[Field::Volume], |state, _| *state.volume.value())
    }

    /// Status, position and duration gathered under one lock
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.read(
            &[Field::Status, Field::Position, Field::Duration],
            |state, now| ProgressSnapshot {
                position: state.extrapolated_position(now),
                duration: *state.duration.value(),
                status: *state.status.value(),
            },
        )
    }

    /// Record a verified play status
    pub fn write_status(&self, status: PlayStatus) {
        self.inner
            .lock()
            .supersede(Field::Status)
            .status
            .write(status, Instant::now());
    }

    /// Record a verified position
    pub fn write_position(&self, position: Duration) {
        self.inner
            .lock()
            .supersede(Field::Position)
            .position
            .write(position, Instant::now());
    }

    /// Record a verified volume
    pub fn write_volume(&self, volume: f64) {
        self.inner
            .lock()
            .supersede(Field::Volume)
            .volume
            .write(volume, Instant::now());
    }

    /// Shift the position by a relative seek, clamped to `[0, duration]`
    ///
    /// A target that is not a representable duration invalidates the position
    /// so the next read asks the player.
    pub fn shift_position(&self, offset_secs: f64) {
        let mut inner = self.inner.lock();
        let state = inner.supersede(Field::Position);
        let now = Instant::now();
        let current = state.extrapolated_position(now).as_secs_f64();
        let mut target = (current + offset_secs).max(0.0);
        if let Some(duration) = state.known_duration() {
            target = target.min(duration.as_secs_f64());
        }
        match Duration::try_from_secs_f64(target) {
            Ok(target) => state.position.write(target, now),
            Err(_) => {
                debug!("Seek target {} s out of range, position invalidated", target);
                state.position.invalidate();
            }
        }
    }

    /// Flip a trusted status and return it, or drop an untrusted one
    pub fn toggle_status(&self) -> Option<PlayStatus> {
        let mut inner = self.inner.lock();
        let status = &mut inner.supersede(Field::Status).status;
        if status.is_valid() {
            let toggled = status.value().toggled();
            status.write(toggled, Instant::now());
            Some(toggled)
        } else {
            status.invalidate();
            None
        }
    }

    pub fn invalidate(&self, field: Field) {
        let mut inner = self.inner.lock();
        let state = &mut inner.state;
        match field {
            Field::Path => state.path.invalidate(),
            Field::Position => state.position.invalidate(),
            Field::Status => state.status.invalidate(),
            Field::Duration => state.duration.invalidate(),
            Field::Volume => state.volume.invalidate(),
        }
    }

    /// Schedule refreshes of the fields the player reports once it is up
    pub fn prime(&self) {
        for field in [Field::Position, Field::Duration, Field::Volume] {
            self.invalidate(field);
        }
        self.refresh(&[Field::Position, Field::Duration, Field::Volume]);
    }

    /// Read under the lock after applying staleness rules, then refresh what expired
    fn read<T>(&self, fields: &[Field], read: impl FnOnce(&CachedState, Instant) -> T) -> T {
        let now = Instant::now();
        let (value, stale) = {
            let mut inner = self.inner.lock();
            let stale: Vec<Field> = fields
                .iter()
                .copied()
                .filter(|field| inner.state.expire(*field, now, &self.config))
                .collect();
            (read(&inner.state, now), stale)
        };
        self.refresh(&stale);
        value
    }

    /// Start background refreshes for fields that have none in flight
    fn refresh(&self, fields: &[Field]) {
        if fields.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime available, serving stale {:?}", fields);
            return;
        };

        for field in fields {
            let Some(command) = refresh_command(*field) else {
                continue;
            };
            let token = {
                let mut inner = self.inner.lock();
                if inner.refreshing.contains_key(field) {
                    continue;
                }
                let token = inner.next_token;
                inner.next_token += 1;
                inner.refreshing.insert(*field, token);
                token
            };

            let store = self.clone();
            let field = *field;
            handle.spawn(async move {
                let reply = store.executor.execute(&command).await;
                store.apply_refresh(field, token, reply);
            });
        }
    }

    fn apply_refresh(&self, field: Field, token: u64, reply: crate::error::Result<String>) {
        let mut inner = self.inner.lock();
        if inner.refreshing.get(&field) != Some(&token) {
            debug!("Dropping superseded {:?} refresh", field);
            return;
        }
        inner.refreshing.remove(&field);

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Refresh of {:?} failed, serving stale value: {}", field, e);
                return;
            }
        };

        let now = Instant::now();
        let state = &mut inner.state;
        let decoded = match field {
            Field::Position => reply::parse_micros(&reply).map(|v| state.position.write(v, now)),
            Field::Status => PlayStatus::from_reply(&reply).map(|v| state.status.write(v, now)),
            Field::Duration => reply::parse_micros(&reply).map(|v| {
                if v.is_zero() {
                    state.duration.write_unverified(v, now);
                } else {
                    state.duration.write(v, now);
                }
            }),
            Field::Volume => reply::parse_volume(&reply).map(|v| state.volume.write(v, now)),
            Field::Path => Ok(()),
        };
        if let Err(e) = decoded {
            debug!("Ignoring {:?} refresh reply: {}", field, e);
        }
    }
}

fn refresh_command(field: Field) -> Option<Command> {
    match field {
        Field::Position => Some(Command::GetPosition),
        Field::Status => Some(Command::GetPlayStatus),
        Field::Duration => Some(Command::GetDuration),
        Field::Volume => Some(Command::GetVolume),
        Field::Path => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::CommandChannel;
    use crate::config::RetryPolicy;
    use crate::destination::Destination;
    use crate::error::IpcFailure;
    use async_trait::async_trait;

    /// Answers every query with a fixed reply and records the commands it saw
    struct FixedChannel {
        reply: std::result::Result<String, IpcFailure>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandChannel for FixedChannel {
        async fn invoke(
            &self,
            _destination: &Destination,
            command: &Command,
        ) -> std::result::Result<String, IpcFailure> {
            self.seen.lock().push(command.to_string());
            self.reply.clone()
        }
    }

    fn store_with(reply: std::result::Result<String, IpcFailure>) -> (StateStore, Arc<FixedChannel>) {
        let channel = Arc::new(FixedChannel {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let executor = Arc::new(RetryingExecutor::new(
            channel.clone(),
            Destination::default(),
            RetryPolicy::default(),
        ));
        (StateStore::new(executor, CacheConfig::default()), channel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_returns_last_known_value() {
        let (store, channel) = store_with(Ok("Paused".to_string()));
        store.write_status(PlayStatus::Playing);

        tokio::time::advance(Duration::from_millis(2500)).await;
        assert_eq!(store.status(), PlayStatus::Playing);
        assert!(!store.state().status.is_valid());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.status(), PlayStatus::Paused);
        assert_eq!(channel.seen.lock().as_slice(), ["getplaystatus"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_refresh_in_flight_per_field() {
        let (store, channel) = store_with(Ok("60000000".to_string()));

        for _ in 0..5 {
            assert_eq!(store.duration(), Duration::ZERO);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.duration(), Duration::from_secs(60));
        assert_eq!(channel.seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_value() {
        let (store, channel) = store_with(Err(IpcFailure::new("getvolume", "no reply")));

        assert_eq!(store.volume(), 0.0);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.volume(), 0.0);
        assert!(!store.state().volume.is_valid());
        // 3 attempts for the first refresh, and the second read started another
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(channel.seen.lock().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_reset_is_discarded() {
        let (store, _channel) = store_with(Ok("5000000".to_string()));

        store.position();
        store.reset_all();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.state(), CachedState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_write_supersedes_refresh() {
        let (store, _channel) = store_with(Ok("5000000".to_string()));

        store.position();
        store.write_position(Duration::from_secs(42));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(*store.state().position.value(), Duration::from_secs(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shift_past_representable_range_invalidates() {
        let (store, _channel) = store_with(Ok("Playing".to_string()));
        store.write_status(PlayStatus::Playing);
        store.write_position(Duration::from_secs(3));

        store.shift_position(1e20);
        store.shift_position(f64::INFINITY);

        let state = store.state();
        assert!(!state.position.is_valid());
        assert_eq!(*state.position.value(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_reply_stays_invalid() {
        let (store, _channel) = store_with(Ok("0".to_string()));

        store.duration();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let state = store.state();
        assert!(!state.duration.is_valid());
        assert!(state.duration.captured_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shift_position_clamps() {
        let (store, _channel) = store_with(Ok("Paused".to_string()));
        store.write_status(PlayStatus::Paused);
        store.write_position(Duration::from_secs(3));

        store.shift_position(-10.0);
        assert_eq!(*store.state().position.value(), Duration::ZERO);

        store.shift_position(2.5);
        assert_eq!(*store.state().position.value(), Duration::from_millis(2500));
    }

    #[test]
    fn test_read_outside_runtime_skips_refresh() {
        let (store, channel) = store_with(Ok("Playing".to_string()));
        assert_eq!(store.status(), PlayStatus::Paused);
        assert!(channel.seen.lock().is_empty());
    }
}
