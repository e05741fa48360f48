//! Retrying command executor
//!
//! The control bus is reached through a shell-mediated helper, so a single
//! dropped call is common. The executor retries a failed command with identical
//! arguments up to the budget of its [`CommandKind`] and then gives up with
//! [`ControlError::IpcExhausted`]. Commands of the same kind never overlap: a
//! second call waits until the first one's retry sequence has finished.

use crate::channel::CommandChannel;
use crate::command::{Command, CommandKind};
use crate::config::RetryPolicy;
use crate::destination::Destination;
use crate::error::{ControlError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Executes bus commands with a bounded retry budget per command kind
pub struct RetryingExecutor {
    channel: Arc<dyn CommandChannel>,
    destination: Destination,
    policy: RetryPolicy,
    /// Consecutive failures of the sequence in flight, per kind
    counters: Mutex<HashMap<CommandKind, u32>>,
    /// One in-flight lane per kind
    lanes: HashMap<CommandKind, Arc<tokio::sync::Mutex<()>>>,
}

impl RetryingExecutor {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        destination: Destination,
        policy: RetryPolicy,
    ) -> Self {
        let lanes = CommandKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(tokio::sync::Mutex::new(()))))
            .collect();

        Self {
            channel,
            destination,
            policy,
            counters: Mutex::new(HashMap::new()),
            lanes,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Failures recorded for the sequence currently in flight (0 when idle)
    pub fn failures(&self, kind: CommandKind) -> u32 {
        self.counters.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Send a command, retrying transient failures within its budget
    ///
    /// Every call starts a fresh sequence, including after an earlier call was
    /// dropped mid-sequence.
    pub async fn execute(&self, command: &Command) -> Result<String> {
        let kind = command.kind();
        let max_attempts = self.policy.max_attempts(kind).max(1);

        let lane = self.lanes.get(&kind).cloned().unwrap_or_default();
        let _in_flight = lane.lock().await;
        let _sequence = Sequence::start(&self.counters, kind);

        loop {
            let failure = match self.channel.invoke(&self.destination, command).await {
                Ok(reply) => return Ok(reply),
                Err(failure) => failure,
            };

            let attempts = {
                let mut counters = self.counters.lock();
                let count = counters.entry(kind).or_insert(0);
                *count += 1;
                *count
            };

            if attempts >= max_attempts {
                warn!(
                    "Giving up on '{}' to {} after {} attempts: {}",
                    command, self.destination, attempts, failure
                );
                return Err(ControlError::IpcExhausted { kind, attempts });
            }

            debug!(
                "Retrying '{}' ({}/{}): {}",
                command, attempts, max_attempts, failure
            );
            let delay = self.policy.delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Owns a kind's failure counter for one sequence; clears it however the sequence ends
struct Sequence<'a> {
    counters: &'a Mutex<HashMap<CommandKind, u32>>,
    kind: CommandKind,
}

impl<'a> Sequence<'a> {
    fn start(counters: &'a Mutex<HashMap<CommandKind, u32>>, kind: CommandKind) -> Self {
        counters.lock().remove(&kind);
        Self { counters, kind }
    }
}

impl Drop for Sequence<'_> {
    fn drop(&mut self) {
        self.counters.lock().remove(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IpcFailure;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then answers "ok"
    struct FlakyChannel {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakyChannel {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl CommandChannel for FlakyChannel {
        async fn invoke(
            &self,
            _destination: &Destination,
            command: &Command,
        ) -> std::result::Result<String, IpcFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(IpcFailure::new(command.to_string(), "no reply"));
            }
            Ok("ok".to_string())
        }
    }

    fn executor(channel: Arc<FlakyChannel>) -> RetryingExecutor {
        RetryingExecutor::new(channel, Destination::default(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let channel = FlakyChannel::new(2);
        let executor = executor(channel.clone());

        let reply = executor.execute(&Command::Pause).await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(channel.calls.load(Ordering::SeqCst), 3);
        assert_eq!(executor.failures(CommandKind::Pause), 0);
    }

    #[tokio::test]
    async fn test_budget_depends_on_kind() {
        let channel = FlakyChannel::new(u32::MAX);
        let executor = executor(channel.clone());

        let result = executor.execute(&Command::Stop).await;
        assert!(matches!(
            result,
            Err(ControlError::IpcExhausted {
                kind: CommandKind::Stop,
                attempts: 3
            })
        ));
        assert_eq!(channel.calls.load(Ordering::SeqCst), 3);

        let result = executor.execute(&Command::seek_seconds(5.0)).await;
        assert!(matches!(
            result,
            Err(ControlError::IpcExhausted {
                kind: CommandKind::Seek,
                attempts: 4
            })
        ));
        assert_eq!(channel.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_between_attempts() {
        let channel = FlakyChannel::new(2);
        let policy = RetryPolicy {
            delay_ms: 50,
            ..Default::default()
        };
        let executor = RetryingExecutor::new(channel.clone(), Destination::default(), policy);

        let start = tokio::time::Instant::now();
        executor.execute(&Command::Play).await.unwrap();
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(100));
    }
}
