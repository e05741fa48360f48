//! omxplayer command line

use omxctl_core::{Destination, OpenOptions};
use std::path::Path;

/// Build the player arguments for one session
///
/// The media path comes first. Optional flags follow in a fixed order, and the
/// bus name is always passed so the controller can find the instance.
pub fn build_args(path: &Path, options: &OpenOptions, destination: &Destination) -> Vec<String> {
    let mut args = vec![path.to_string_lossy().into_owned()];

    if let Some(output) = options.audio_output {
        args.push("-o".to_string());
        args.push(output.as_arg().to_string());
    }
    if options.black_background {
        args.push("-b".to_string());
    }
    if options.disable_keys {
        args.push("--no-keys".to_string());
    }
    if options.disable_osd {
        args.push("--no-osd".to_string());
    }
    if options.disable_ghost_box {
        args.push("--no-ghost-box".to_string());
    }
    if options.loop_playback {
        args.push("--loop".to_string());
    }
    if let Some(subtitles) = options
        .subtitle_path
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
    {
        args.push("--subtitles".to_string());
        args.push(subtitles.to_string_lossy().into_owned());
    }
    if let Some(start_at) = options.start_at.as_ref().filter(|s| !s.is_empty()) {
        args.push("--pos".to_string());
        args.push(start_at.clone());
    }
    if let Some(layer) = destination.configured_layer() {
        args.push("--layer".to_string());
        args.push(layer.to_string());
    }
    if options.hold_mode {
        args.push("--alpha".to_string());
        args.push("0".to_string());
    }

    args.push("--dbus_name".to_string());
    args.push(destination.bus_name().to_string());

    if let Some(mode) = options.aspect_mode {
        args.push("--aspect-mode".to_string());
        args.push(mode.as_arg().to_string());
    }
    args
}
