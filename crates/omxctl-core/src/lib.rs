//! OmxCtl Core - Stateful control of an external omxplayer process
//!
//! This crate drives a long-running player process over its control bus and
//! exposes a simplified command/query API to a host application:
//! - **Executor**: bounded retry of commands over an unreliable IPC channel
//! - **Store**: cached playback state with per-field TTL and background refresh
//! - **Confirmation**: startup polling until the player answers on the bus
//! - **Progress**: cancellable periodic position/duration/status snapshots
//! - **Controller**: session lifecycle (open, pause, seek, stop, ...)
//!
//! The bus transport and the process launch are collaborators, reached through the
//! [`CommandChannel`] and [`PlayerLauncher`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use omxctl_core::{
//!     CommandChannel, ControllerConfig, OpenOptions, PlayerLauncher, SessionController,
//! };
//!
//! async fn play(channel: Arc<dyn CommandChannel>, launcher: Arc<dyn PlayerLauncher>) {
//!     let controller = SessionController::new(ControllerConfig::default(), channel, launcher);
//!     controller.on_progress(None, |snapshot| println!("{}", snapshot.position_ms()));
//!     if controller.open("clip.mp4", OpenOptions::default()).await.is_ok() {
//!         let _ = controller.set_volume(0.5).await;
//!     }
//! }
//! ```

#![allow(missing_docs)]

/// In-memory playback state with TTL rules
pub mod cache;
/// Command channel collaborator seam
pub mod channel;
/// Bus commands and their retry classes
pub mod command;
/// Controller configuration
pub mod config;
/// Startup confirmation polling
pub mod confirm;
/// Session controller
pub mod controller;
/// Typed bus destination
pub mod destination;
/// Error types
pub mod error;
/// Retrying command executor
pub mod executor;
/// Player launch collaborator seam
pub mod launch;
/// Tracing subscriber setup
pub mod logging;
/// Progress reporting
pub mod progress;
/// Reply decoding
pub mod reply;
/// Cached state store with background refresh
pub mod store;

// Re-exports
pub use cache::{CachedField, CachedState, Field};
pub use channel::CommandChannel;
pub use command::{Command, CommandKind};
pub use config::{CacheConfig, ConfirmConfig, ControllerConfig, RetryPolicy};
pub use confirm::{ConfirmState, Confirmation, StartupConfirmation};
pub use controller::{SessionController, SessionState};
pub use destination::Destination;
pub use error::{ControlError, IpcFailure, Result};
pub use executor::RetryingExecutor;
pub use launch::{
    AspectMode, AudioOutput, ExitSignal, LaunchRequest, OpenOptions, PlayerLauncher, ProcessExit,
};
pub use logging::LogConfig;
pub use progress::{ProgressHandle, ProgressReporter, ProgressSnapshot};
pub use reply::PlayStatus;
pub use store::StateStore;
