//! Cached playback state
//!
//! Each field remembers when it was captured and whether it is still trusted.
//! Freshness is checked when a field is read, never when it is written: a read
//! past the field's TTL marks it invalid, and an invalid field asks the owner to
//! refresh it while the last-known value is still returned.

use crate::config::CacheConfig;
use crate::reply::PlayStatus;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Cached state fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Path,
    Position,
    Status,
    Duration,
    Volume,
}

/// A cached value with capture time and validity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedField<T> {
    value: T,
    captured_at: Option<Instant>,
    valid: bool,
}

impl<T> CachedField<T> {
    /// Last-known value, trusted or not
    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the value was last written (None until the first write)
    pub fn captured_at(&self) -> Option<Instant> {
        self.captured_at
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Store a verified value
    pub fn write(&mut self, value: T, now: Instant) {
        self.value = value;
        self.captured_at = Some(now);
        self.valid = true;
    }

    /// Store a value that must be re-polled before it is trusted
    pub fn write_unverified(&mut self, value: T, now: Instant) {
        self.value = value;
        self.captured_at = Some(now);
        self.valid = false;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Apply the TTL and report whether the field needs a refresh
    pub fn expire(&mut self, now: Instant, ttl: Option<Duration>) -> bool {
        if let (Some(ttl), Some(captured_at)) = (ttl, self.captured_at) {
            if now.saturating_duration_since(captured_at) > ttl {
                self.valid = false;
            }
        }
        !self.valid
    }
}

/// Playback state of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedState {
    pub path: CachedField<Option<PathBuf>>,
    pub position: CachedField<Duration>,
    pub status: CachedField<PlayStatus>,
    pub duration: CachedField<Duration>,
    pub volume: CachedField<f64>,
}

impl CachedState {
    /// TTL of a field; `None` means valid until reset or invalidated
    pub fn ttl(field: Field, config: &CacheConfig) -> Option<Duration> {
        match field {
            Field::Position => Some(config.position_ttl()),
            Field::Status => Some(config.status_ttl()),
            Field::Path | Field::Duration | Field::Volume => None,
        }
    }

    /// Apply read-time staleness rules to a field; true when it needs a refresh
    pub fn expire(&mut self, field: Field, now: Instant, config: &CacheConfig) -> bool {
        let ttl = Self::ttl(field, config);
        match field {
            // Path is never re-polled
            Field::Path => false,
            Field::Position => self.position.expire(now, ttl),
            Field::Status => self.status.expire(now, ttl),
            Field::Duration => {
                if self.duration.value.is_zero() {
                    self.duration.invalidate();
                }
                self.duration.expire(now, ttl)
            }
            Field::Volume => self.volume.expire(now, ttl),
        }
    }

    /// Known media duration (zero while the player is still loading)
    pub fn known_duration(&self) -> Option<Duration> {
        let duration = self.duration.value;
        (!duration.is_zero()).then_some(duration)
    }

    /// Position as reported to callers
    ///
    /// While playing, the last capture is advanced by the time elapsed since it
    /// was taken, capped at the known duration. While paused, or before any
    /// capture, the raw cached value is returned.
    pub fn extrapolated_position(&self, now: Instant) -> Duration {
        let position = self.position.value;
        let Some(captured_at) = self.position.captured_at else {
            return position;
        };
        if !self.status.value.is_playing() {
            return position;
        }
        let advanced = position.saturating_add(now.saturating_duration_since(captured_at));
        match self.known_duration() {
            Some(duration) => advanced.min(duration),
            None => advanced,
        }
    }
}
