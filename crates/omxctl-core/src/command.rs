//! Bus commands understood by the player
//!
//! Every [`Command`] has a wire form (`seek 1500000`, `getplaystatus`, ...) and
//! belongs to a [`CommandKind`], which selects its retry budget and its in-flight
//! lane in the executor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Retry class of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Play,
    Pause,
    Stop,
    Quit,
    TogglePlay,
    Seek,
    SetPosition,
    SetVolume,
    /// Hide/unhide video
    Visibility,
    Alpha,
    /// State queries issued by cache refreshes
    Query,
}

impl CommandKind {
    /// Every kind, in declaration order
    pub const ALL: [CommandKind; 11] = [
        CommandKind::Play,
        CommandKind::Pause,
        CommandKind::Stop,
        CommandKind::Quit,
        CommandKind::TogglePlay,
        CommandKind::Seek,
        CommandKind::SetPosition,
        CommandKind::SetVolume,
        CommandKind::Visibility,
        CommandKind::Alpha,
        CommandKind::Query,
    ];

    /// Short lowercase name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Play => "play",
            CommandKind::Pause => "pause",
            CommandKind::Stop => "stop",
            CommandKind::Quit => "quit",
            CommandKind::TogglePlay => "toggleplay",
            CommandKind::Seek => "seek",
            CommandKind::SetPosition => "setposition",
            CommandKind::SetVolume => "setvolume",
            CommandKind::Visibility => "visibility",
            CommandKind::Alpha => "alpha",
            CommandKind::Query => "query",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A command sent over the control bus
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Quit,
    TogglePlay,
    /// Relative seek in microseconds (negative jumps back)
    Seek { micros: i64 },
    /// Absolute position in microseconds
    SetPosition { micros: i64 },
    /// Volume in 0.0-1.0
    SetVolume(f64),
    HideVideo,
    UnhideVideo,
    /// Video alpha (0-255)
    SetAlpha(u8),
    GetPosition,
    GetPlayStatus,
    GetDuration,
    GetVolume,
}

impl Command {
    /// Relative seek from an offset in seconds
    pub fn seek_seconds(offset: f64) -> Self {
        Command::Seek {
            micros: seconds_to_micros(offset),
        }
    }

    /// Absolute position from seconds
    pub fn position_seconds(position: f64) -> Self {
        Command::SetPosition {
            micros: seconds_to_micros(position),
        }
    }

    /// Visibility command for the requested state
    pub fn visibility(visible: bool) -> Self {
        if visible {
            Command::UnhideVideo
        } else {
            Command::HideVideo
        }
    }

    /// Bus command name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Quit => "quit",
            Command::TogglePlay => "toggleplay",
            Command::Seek { .. } => "seek",
            Command::SetPosition { .. } => "setposition",
            Command::SetVolume(_) => "setvolume",
            Command::HideVideo => "hidevideo",
            Command::UnhideVideo => "unhidevideo",
            Command::SetAlpha(_) => "setalpha",
            Command::GetPosition => "getposition",
            Command::GetPlayStatus => "getplaystatus",
            Command::GetDuration => "getduration",
            Command::GetVolume => "getvolume",
        }
    }

    /// Argument text, if the command carries one
    pub fn args(&self) -> Option<String> {
        match self {
            Command::Seek { micros } | Command::SetPosition { micros } => Some(micros.to_string()),
            Command::SetVolume(volume) => Some(volume.to_string()),
            Command::SetAlpha(alpha) => Some(alpha.to_string()),
            _ => None,
        }
    }

    /// Retry class of this command
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Play => CommandKind::Play,
            Command::Pause => CommandKind::Pause,
            Command::Stop => CommandKind::Stop,
            Command::Quit => CommandKind::Quit,
            Command::TogglePlay => CommandKind::TogglePlay,
            Command::Seek { .. } => CommandKind::Seek,
            Command::SetPosition { .. } => CommandKind::SetPosition,
            Command::SetVolume(_) => CommandKind::SetVolume,
            Command::HideVideo | Command::UnhideVideo => CommandKind::Visibility,
            Command::SetAlpha(_) => CommandKind::Alpha,
            Command::GetPosition
            | Command::GetPlayStatus
            | Command::GetDuration
            | Command::GetVolume => CommandKind::Query,
        }
    }

    /// Whether this is a read-only state query
    pub fn is_query(&self) -> bool {
        self.kind() == CommandKind::Query
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.args() {
            Some(args) => write!(f, "{} {}", self.name(), args),
            None => f.write_str(self.name()),
        }
    }
}

/// Saturating conversion; callers validate with [`checked_micros`] first
fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}

/// Whole microseconds for `seconds`, or `None` if it is not finite or overflows the wire format
pub fn checked_micros(seconds: f64) -> Option<i64> {
    let micros = (seconds * 1_000_000.0).round();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound must be exclusive
    (micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64)
        .then_some(micros as i64)
}
