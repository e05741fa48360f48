//! OmxCtl Launch - omxplayer process launcher
//!
//! Implements the core's [`PlayerLauncher`](omxctl_core::PlayerLauncher) by spawning
//! the real player binary with arguments derived from the session's
//! [`OpenOptions`](omxctl_core::OpenOptions).

/// Player command line construction
pub mod args;
/// Child process management
pub mod process;

pub use args::build_args;
pub use process::OmxProcessLauncher;
