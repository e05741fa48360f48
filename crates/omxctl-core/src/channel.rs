//! Command channel seam
//!
//! The channel is the request/response primitive used to reach the player's
//! control bus. Implementations own the transport (a D-Bus helper script, a
//! native bus connection, a test double); the core only sees text or failure.

use crate::command::Command;
use crate::destination::Destination;
use crate::error::IpcFailure;
use async_trait::async_trait;

/// Request/response access to a player's control bus
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Send one command to `destination` and return the raw reply text
    async fn invoke(
        &self,
        destination: &Destination,
        command: &Command,
    ) -> Result<String, IpcFailure>;
}

