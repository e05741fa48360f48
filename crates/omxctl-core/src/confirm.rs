//! Startup confirmation
//!
//! After launch the player needs a moment before it registers on the bus. The
//! confirmation polls `getplaystatus` at a fixed interval, straight on the
//! channel (it has its own, larger, attempt bound), until any reply arrives.

use crate::channel::CommandChannel;
use crate::command::Command;
use crate::config::ConfirmConfig;
use crate::destination::Destination;
use crate::error::{ControlError, Result};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Progress of one confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmState {
    NotStarted,
    Polling { attempt: u32 },
    Confirmed { attempts: u32, elapsed: Duration },
    Failed { attempts: u32 },
}

/// Outcome of a successful confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Polls issued, including the successful one
    pub attempts: u32,
    /// Wall-clock time from entry to the successful reply
    pub elapsed: Duration,
    /// Raw reply of the successful poll
    pub reply: String,
}

/// Single-use startup confirmation for one session
pub struct StartupConfirmation {
    config: ConfirmConfig,
    state: ConfirmState,
}

impl StartupConfirmation {
    pub fn new(config: ConfirmConfig) -> Self {
        Self {
            config,
            state: ConfirmState::NotStarted,
        }
    }

    pub fn state(&self) -> &ConfirmState {
        &self.state
    }

    /// Poll until the player answers or the attempt bound is reached
    ///
    /// The first poll is issued one interval after entry. Any reply counts as
    /// confirmation; its content is not inspected here.
    pub async fn confirm_start(
        &mut self,
        channel: &dyn CommandChannel,
        destination: &Destination,
    ) -> Result<Confirmation> {
        if self.state != ConfirmState::NotStarted {
            return Err(ControlError::SessionBusy);
        }

        let max_attempts = self.config.max_attempts;
        let period = self.config.interval().max(Duration::from_millis(1));
        let start = Instant::now();
        let mut ticker = tokio::time::interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=max_attempts {
            ticker.tick().await;
            self.state = ConfirmState::Polling { attempt };

            match channel.invoke(destination, &Command::GetPlayStatus).await {
                Ok(reply) => {
                    let elapsed = start.elapsed();
                    info!(
                        "Player on {} confirmed after {} attempts ({:?}): {}",
                        destination,
                        attempt,
                        elapsed,
                        reply.trim()
                    );
                    self.state = ConfirmState::Confirmed {
                        attempts: attempt,
                        elapsed,
                    };
                    return Ok(Confirmation {
                        attempts: attempt,
                        elapsed,
                        reply,
                    });
                }
                Err(e) => debug!("Startup poll {} on {} failed: {}", attempt, destination, e),
            }
        }

        warn!(
            "Player on {} did not answer after {} attempts",
            destination, max_attempts
        );
        self.state = ConfirmState::Failed {
            attempts: max_attempts,
        };
        Err(ControlError::StartupTimeout {
            attempts: max_attempts,
        })
    }
}
