//! Player launch seam
//!
//! Spawning the player and feeding its input belong to a collaborator. The
//! controller hands it a [`LaunchRequest`] and gets back a one-shot signal that
//! fires when the process exits.

use crate::destination::Destination;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Audio routing of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutput {
    Hdmi,
    Local,
    Both,
}

impl AudioOutput {
    /// Argument value understood by the player
    pub fn as_arg(&self) -> &'static str {
        match self {
            AudioOutput::Hdmi => "hdmi",
            AudioOutput::Local => "local",
            AudioOutput::Both => "both",
        }
    }
}

/// Video aspect handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectMode {
    Letterbox,
    Fill,
    Stretch,
}

impl AspectMode {
    /// Argument value understood by the player
    pub fn as_arg(&self) -> &'static str {
        match self {
            AspectMode::Letterbox => "letterbox",
            AspectMode::Fill => "fill",
            AspectMode::Stretch => "stretch",
        }
    }
}

/// Per-session playback options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub audio_output: Option<AudioOutput>,
    /// Draw a black background behind the video
    pub black_background: bool,
    pub disable_keys: bool,
    /// Suppress the on-screen display
    pub disable_osd: bool,
    pub disable_ghost_box: bool,
    pub loop_playback: bool,
    pub subtitle_path: Option<PathBuf>,
    /// Start offset, passed through verbatim (`hh:mm:ss` or seconds)
    pub start_at: Option<String>,
    pub aspect_mode: Option<AspectMode>,
    /// Start paused, hidden and fully transparent, for preloading
    pub hold_mode: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            audio_output: None,
            black_background: true,
            disable_keys: false,
            disable_osd: false,
            disable_ghost_box: false,
            loop_playback: false,
            subtitle_path: None,
            start_at: None,
            aspect_mode: None,
            hold_mode: false,
        }
    }
}

impl OpenOptions {
    /// Route audio to an output
    pub fn with_audio_output(mut self, output: AudioOutput) -> Self {
        self.audio_output = Some(output);
        self
    }

    /// Start in hold mode
    pub fn with_hold_mode(mut self, hold: bool) -> Self {
        self.hold_mode = hold;
        self
    }

    /// Loop the media
    pub fn with_loop(mut self, enable: bool) -> Self {
        self.loop_playback = enable;
        self
    }

    /// Show subtitles from a file
    pub fn with_subtitles(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle_path = Some(path.into());
        self
    }

    /// Start at an offset
    pub fn with_start_at(mut self, start_at: impl Into<String>) -> Self {
        self.start_at = Some(start_at.into());
        self
    }
}

/// Everything the launcher needs to start one session
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub path: PathBuf,
    pub options: OpenOptions,
    pub destination: Destination,
}

/// How the player process ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, when the process exited normally
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Exit with a known code
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Exit whose status was not observed
    pub fn unknown() -> Self {
        Self { code: None }
    }

    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Fires once when the launched process exits; a dropped sender also counts as exit
pub type ExitSignal = oneshot::Receiver<ProcessExit>;

/// Starts a player process for a session
#[async_trait]
pub trait PlayerLauncher: Send + Sync {
    /// Launch the player and hand it the media; returns once input is handed off
    async fn launch(&self, request: &LaunchRequest) -> Result<ExitSignal>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_options_default() {
        let options = OpenOptions::default();
        assert!(options.black_background);
        assert!(!options.hold_mode);
        assert!(options.audio_output.is_none());
    }

    #[test]
    fn test_open_options_deserialize_partial() {
        let options: OpenOptions =
            toml::from_str("audio_output = \"hdmi\"\nhold_mode = true\n").unwrap();
        assert_eq!(options.audio_output, Some(AudioOutput::Hdmi));
        assert!(options.hold_mode);
        assert!(options.black_background);
    }
}
