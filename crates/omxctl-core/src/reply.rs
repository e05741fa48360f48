//! Decoding of query replies
//!
//! The player answers time queries in integer microseconds, status queries with a
//! line containing `Playing` or `Paused`, and volume queries with a float.

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback status reported by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayStatus {
    Playing,
    #[default]
    Paused,
}

impl PlayStatus {
    /// Decode a `getplaystatus` reply
    pub fn from_reply(reply: &str) -> Result<Self> {
        if reply.contains("Playing") {
            Ok(PlayStatus::Playing)
        } else if reply.contains("Paused") {
            Ok(PlayStatus::Paused)
        } else {
            Err(ControlError::InvalidReply(format!(
                "unknown play status: {:?}",
                reply.trim()
            )))
        }
    }

    /// Whether the player is playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayStatus::Playing)
    }

    /// The opposite status
    pub fn toggled(&self) -> Self {
        match self {
            PlayStatus::Playing => PlayStatus::Paused,
            PlayStatus::Paused => PlayStatus::Playing,
        }
    }
}

/// Decode a microsecond reply (`getposition`, `getduration`); negatives clamp to zero
pub fn parse_micros(reply: &str) -> Result<Duration> {
    let micros: i64 = reply
        .trim()
        .parse()
        .map_err(|_| ControlError::InvalidReply(format!("not a time value: {:?}", reply.trim())))?;
    Ok(Duration::from_micros(micros.max(0) as u64))
}

/// Decode a `getvolume` reply, clamped to 0.0-1.0
pub fn parse_volume(reply: &str) -> Result<f64> {
    let volume: f64 = reply
        .trim()
        .parse()
        .map_err(|_| ControlError::InvalidReply(format!("not a volume: {:?}", reply.trim())))?;
    if !volume.is_finite() {
        return Err(ControlError::InvalidReply(format!(
            "not a volume: {:?}",
            reply.trim()
        )));
    }
    Ok(volume.clamp(0.0, 1.0))
}
