//! Controller configuration
//!
//! All timing constants of the control core live here. Every section has a
//! `Default`, so a TOML file only needs the keys it changes.

use crate::command::CommandKind;
use crate::error::{ControlError, Result};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Startup confirmation polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Delay between play-status polls (ms)
    pub interval_ms: u64,
    /// Polls before giving up
    pub max_attempts: u32,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10,
            max_attempts: 300,
        }
    }
}

impl ConfirmConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Cache time-to-live settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub position_ttl_ms: u64,
    pub status_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            position_ttl_ms: 2000,
            status_ttl_ms: 2000,
        }
    }
}

impl CacheConfig {
    pub fn position_ttl(&self) -> Duration {
        Duration::from_millis(self.position_ttl_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }
}

/// Retry budgets per command kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts for play, pause, stop and quit
    pub lifecycle_attempts: u32,
    /// Attempts for toggleplay, seek, setposition and setvolume
    pub adjust_attempts: u32,
    /// Attempts for visibility, alpha and cache refresh queries
    pub default_attempts: u32,
    /// Pause between attempts (ms); 0 retries immediately
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            lifecycle_attempts: 3,
            adjust_attempts: 4,
            default_attempts: 3,
            delay_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Maximum attempts for a command kind
    pub fn max_attempts(&self, kind: CommandKind) -> u32 {
        match kind {
            CommandKind::Play | CommandKind::Pause | CommandKind::Stop | CommandKind::Quit => {
                self.lifecycle_attempts
            }
            CommandKind::TogglePlay
            | CommandKind::Seek
            | CommandKind::SetPosition
            | CommandKind::SetVolume => self.adjust_attempts,
            CommandKind::Visibility | CommandKind::Alpha | CommandKind::Query => {
                self.default_attempts
            }
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Session controller configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Player layer; also selects the bus destination
    pub layer: Option<u32>,
    /// Default progress reporting interval (ms)
    pub progress_interval_ms: Option<u64>,
    pub confirm: ConfirmConfig,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub log: LogConfig,
}

impl ControllerConfig {
    /// Progress interval used when none is configured
    pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Reject settings that would stall timers or disable commands
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == Some(0) {
            return Err(ControlError::Config(
                "progress_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.confirm.interval_ms == 0 {
            return Err(ControlError::Config(
                "confirm.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.confirm.max_attempts == 0 {
            return Err(ControlError::Config(
                "confirm.max_attempts must be greater than 0".to_string(),
            ));
        }
        let retry = &self.retry;
        if retry.lifecycle_attempts == 0 || retry.adjust_attempts == 0 || retry.default_attempts == 0
        {
            return Err(ControlError::Config(
                "retry attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the player layer
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Set the default progress interval, rounded up to whole milliseconds
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = Some(ceil_millis(interval));
        self
    }

    /// Set the confirmation polling parameters, the interval rounded up to whole milliseconds
    pub fn with_confirm(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.confirm = ConfirmConfig {
            interval_ms: ceil_millis(interval),
            max_attempts,
        };
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(
            self.progress_interval_ms
                .unwrap_or(Self::DEFAULT_PROGRESS_INTERVAL_MS),
        )
    }
}

/// Milliseconds in `duration`, rounding any remainder up and saturating at `u64::MAX`
fn ceil_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis() + u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}
