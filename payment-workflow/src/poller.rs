//! Cancellable status polling for payment sessions
//!
//! A poller is a single spawned task owned through its [`PollerHandle`].
//! It queries the session status on a fixed interval until the backend
//! reports a terminal state or the client-side timeout cap elapses,
//! whichever comes first, and fires its callback exactly once.

use std::sync::Arc;
use std::time::Duration;

use billing_client::{PaymentsApi, SessionStatus, SessionStatusResponse};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Status poller configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between consecutive status queries
    pub interval: Duration,
    /// Client-side cap on the whole wait, independent of any
    /// server-declared session expiry
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Outcome of a polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Paid,
    Expired,
    Failed,
    /// Client-side timeout cap elapsed before the backend reported a
    /// terminal state
    Timeout,
}

impl TerminalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Paid)
    }
}

/// Fired exactly once per polling run, with the final status payload when
/// the backend provided one
pub type TerminalCallback =
    Box<dyn FnOnce(TerminalStatus, Option<SessionStatusResponse>) + Send + 'static>;

/// Owning handle for a running poller task.
///
/// `stop()` is idempotent: any number of calls, before or after the task
/// finishes, is safe and leaves no timer running. Dropping the handle has
/// the same effect, so a torn-down owner cannot orphan the task.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Spawn a polling task for `session_id`.
    ///
    /// A transport failure on an individual poll is logged and retried on
    /// the next tick; a single flaky request is not a failed session. A
    /// rejected credential is terminal, reported as `Failed`.
    pub fn start(
        api: Arc<dyn PaymentsApi>,
        session_id: String,
        config: PollerConfig,
        on_terminal: TerminalCallback,
    ) -> PollerHandle {
        let task = tokio::spawn(async move {
            let deadline = tokio::time::sleep(config.timeout);
            tokio::pin!(deadline);
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut deadline => {
                        info!(session_id = %session_id, "payment session polling timed out");
                        on_terminal(TerminalStatus::Timeout, None);
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                match api.session_status(&session_id).await {
                    Ok(response) => match response.status {
                        SessionStatus::Paid => {
                            info!(session_id = %session_id, "payment confirmed");
                            on_terminal(TerminalStatus::Paid, Some(response));
                            return;
                        }
                        SessionStatus::Expired => {
                            info!(session_id = %session_id, "payment session expired");
                            on_terminal(TerminalStatus::Expired, Some(response));
                            return;
                        }
                        SessionStatus::Failed => {
                            warn!(session_id = %session_id, "payment session failed");
                            on_terminal(TerminalStatus::Failed, Some(response));
                            return;
                        }
                        SessionStatus::Waiting | SessionStatus::Creating => {
                            debug!(session_id = %session_id, status = ?response.status, "still waiting");
                        }
                    },
                    Err(err) if err.is_auth() => {
                        warn!(
                            session_id = %session_id,
                            error = %err,
                            "credential rejected while polling, giving up"
                        );
                        on_terminal(TerminalStatus::Failed, None);
                        return;
                    }
                    Err(err) => {
                        warn!(
                            session_id = %session_id,
                            error = %err,
                            "status poll failed, will retry"
                        );
                    }
                }
            }
        });

        PollerHandle { task }
    }
}
