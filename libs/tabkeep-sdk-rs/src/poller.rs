//! Post-checkout reconciliation poller.
//!
//! After the user is sent to checkout, the extension cannot know when the
//! provider's webhook has landed. The poller reads `/api/status` with
//! exponential backoff until the account reports Pro or the budget runs out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tabkeep_types::StatusResponse;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::TabkeepError;

/// Backoff schedule for the poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub max_elapsed: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(15),
            multiplier: 1.5,
            max_interval: Duration::from_secs(5 * 60),
            max_attempts: 40,
            max_elapsed: Duration::from_secs(10 * 60),
        }
    }
}

/// Where the poller reads entitlement snapshots from.
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn fetch(&self, user: &str) -> Result<StatusResponse, TabkeepError>;
}

#[cfg(feature = "client")]
#[async_trait]
impl EntitlementSource for crate::client::TabkeepClient {
    async fn fetch(&self, user: &str) -> Result<StatusResponse, TabkeepError> {
        self.status(user).await
    }
}

/// Callbacks fired when the poller stops on its own.
pub trait ReconciliationListener: Send + Sync {
    /// Pro was observed. Called at most once per poller.
    fn on_activated(&self, status: &StatusResponse);

    /// The budget ran out without seeing Pro; the UI should ask for a manual refresh.
    fn on_exhausted(&self, attempts: u32);
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    Activated(StatusResponse),
    Exhausted { attempts: u32 },
    Cancelled,
}

#[derive(Debug)]
enum Command {
    CheckNow,
    Cancel,
}

/// Control handle for a running poller.
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<Command>,
    checking: Arc<AtomicBool>,
    task: JoinHandle<PollOutcome>,
}

impl PollerHandle {
    /// Reset the backoff and check immediately.
    ///
    /// If a check is already in flight the request is folded into it: the
    /// reset is applied once that check returns a non-Pro result.
    pub fn check_now(&self) {
        // A closed channel means the poller already finished
        let _ = self.commands.send(Command::CheckNow);
    }

    /// Stop polling. Any in-flight request is dropped.
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }

    /// True while a status request is outstanding.
    pub fn is_checking(&self) -> bool {
        self.checking.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poller to stop and return why it stopped.
    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation poller task failed");
                PollOutcome::Cancelled
            }
        }
    }
}

pub struct ReconciliationPoller<S> {
    source: Arc<S>,
    user: String,
    config: PollerConfig,
}

impl<S: EntitlementSource + 'static> ReconciliationPoller<S> {
    pub fn new(source: Arc<S>, user: impl Into<String>) -> Self {
        Self::with_config(source, user, PollerConfig::default())
    }

    pub fn with_config(source: Arc<S>, user: impl Into<String>, config: PollerConfig) -> Self {
        Self {
            source,
            user: user.into(),
            config,
        }
    }

    /// Start polling on the current tokio runtime.
    pub fn spawn(self, listener: Arc<dyn ReconciliationListener>) -> PollerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let checking = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(self.run(listener, rx, checking.clone()));

        PollerHandle {
            commands: tx,
            checking,
            task,
        }
    }

    async fn run(
        self,
        listener: Arc<dyn ReconciliationListener>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        checking: Arc<AtomicBool>,
    ) -> PollOutcome {
        let mut interval = self.config.initial_interval;
        let mut attempts: u32 = 0;
        let mut started = Instant::now();
        let mut immediate = false;

        tracing::info!(user = %self.user, "Starting reconciliation poller");

        loop {
            if !immediate {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    cmd = commands.recv() => match cmd {
                        Some(Command::CheckNow) => {
                            attempts = 0;
                            interval = self.config.initial_interval;
                            started = Instant::now();
                        }
                        Some(Command::Cancel) | None => {
                            tracing::info!(user = %self.user, "Reconciliation poller cancelled");
                            return PollOutcome::Cancelled;
                        }
                    }
                }
            }
            immediate = false;

            checking.store(true, Ordering::SeqCst);
            let mut reset_requested = false;
            let fetch = self.source.fetch(&self.user);
            tokio::pin!(fetch);

            let result = loop {
                tokio::select! {
                    result = &mut fetch => break result,
                    cmd = commands.recv() => match cmd {
                        Some(Command::CheckNow) => reset_requested = true,
                        Some(Command::Cancel) | None => {
                            checking.store(false, Ordering::SeqCst);
                            tracing::info!(user = %self.user, "Reconciliation poller cancelled mid-check");
                            return PollOutcome::Cancelled;
                        }
                    }
                }
            };
            checking.store(false, Ordering::SeqCst);
            attempts += 1;

            match result {
                Ok(status) if status.is_pro => {
                    tracing::info!(user = %self.user, attempts, "Pro entitlement observed");
                    listener.on_activated(&status);
                    return PollOutcome::Activated(status);
                }
                Ok(status) => {
                    tracing::debug!(
                        user = %self.user,
                        attempts,
                        degraded = status.degraded,
                        "Entitlement not active yet"
                    );
                }
                Err(e) => {
                    tracing::warn!(user = %self.user, attempts, error = %e, "Status check failed");
                }
            }

            if reset_requested {
                attempts = 0;
                interval = self.config.initial_interval;
                started = Instant::now();
                immediate = true;
                continue;
            }

            if attempts >= self.config.max_attempts || started.elapsed() >= self.config.max_elapsed {
                tracing::warn!(user = %self.user, attempts, "Reconciliation budget exhausted");
                listener.on_exhausted(attempts);
                return PollOutcome::Exhausted { attempts };
            }

            interval = interval
                .mul_f64(self.config.multiplier)
                .min(self.config.max_interval);
        }
    }
}
