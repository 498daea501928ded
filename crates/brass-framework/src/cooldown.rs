//! Per-command, per-user cooldown windows.
//!
//! The tracker stores one expiry instant per `(command, user)` pair. An entry
//! only exists while its window is open:
//!
//! - the first invocation opens a window and is allowed;
//! - invocations inside the window are denied and never extend it;
//! - the first invocation after the window opens a fresh one.
//!
//! Stale entries are removed by the [`ExpiryScheduler`], a background task
//! fed over a channel. Removal compares the stored expiry against the
//! scheduled one, so a cleanup that lost a race with a newer window is a
//! no-op. Without a scheduler the tracker still behaves correctly; entries are
//! just overwritten lazily.
//!
//! All timestamps are [`tokio::time::Instant`], so tests can pause the clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, trace};

type Windows = HashMap<String, HashMap<String, Instant>>;

/// Longest delay handed to the [`DelayQueue`], which rejects deadlines more
/// than about 2.18 years out. Later expiries are re-queued in hops.
const MAX_QUEUE_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Stand-in expiry for windows too long to add to an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// A cleanup request sent to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Expiry {
    command: String,
    user: String,
    at: Instant,
}

/// Converts a cooldown setting in seconds into a window.
///
/// Missing, zero, negative and non-finite values disable the cooldown.
pub fn window_from_secs(seconds: Option<f64>) -> Option<Duration> {
    let seconds = seconds?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Rounds a remaining duration to a tenth of a second.
pub fn round_to_tenths(remaining: Duration) -> f64 {
    (remaining.as_secs_f64() * 10.0).round() / 10.0
}

/// Tracks open cooldown windows. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct CooldownTracker {
    windows: Arc<Mutex<Windows>>,
    scheduler: Option<mpsc::UnboundedSender<Expiry>>,
}

impl CooldownTracker {
    /// Creates a tracker without background cleanup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker and spawns its [`ExpiryScheduler`] on the current runtime.
    ///
    /// The scheduler stops when `shutdown` is cancelled or every tracker
    /// clone has been dropped.
    pub fn with_scheduler(shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let windows = Arc::new(Mutex::new(Windows::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = ExpiryScheduler {
            windows: Arc::clone(&windows),
            requests: rx,
            queue: DelayQueue::new(),
            shutdown,
        };
        let handle = tokio::spawn(scheduler.run());
        (
            Self {
                windows,
                scheduler: Some(tx),
            },
            handle,
        )
    }

    /// Tries to open a window for `(command, user)`.
    ///
    /// Returns the time left when a window is already open. A `None` or empty
    /// window always succeeds and records nothing.
    pub fn acquire(
        &self,
        command: &str,
        user: &str,
        window: Option<Duration>,
    ) -> Result<(), Duration> {
        let Some(window) = window.filter(|window| !window.is_zero()) else {
            return Ok(());
        };

        let now = Instant::now();
        let expires_at = now
            .checked_add(window)
            .unwrap_or_else(|| now + FAR_FUTURE);
        {
            let mut windows = self.windows.lock();
            let users = windows.entry(command.to_string()).or_default();
            if let Some(&open_until) = users.get(user) {
                if now < open_until {
                    return Err(open_until - now);
                }
            }
            users.insert(user.to_string(), expires_at);
        }

        if let Some(scheduler) = &self.scheduler {
            let request = Expiry {
                command: command.to_string(),
                user: user.to_string(),
                at: expires_at,
            };
            if scheduler.send(request).is_err() {
                debug!(command, user, "Cooldown scheduler stopped; entry will be replaced lazily");
            }
        }
        Ok(())
    }

    /// Checks and, when allowed, opens a window. Window given in seconds.
    pub fn check(&self, command: &str, user: &str, window_secs: Option<f64>) -> bool {
        self.acquire(command, user, window_from_secs(window_secs))
            .is_ok()
    }

    /// Seconds left in the open window, rounded to 0.1. `0.0` when none is open.
    pub fn remaining_seconds(&self, command: &str, user: &str) -> f64 {
        self.remaining(command, user)
            .map(round_to_tenths)
            .unwrap_or(0.0)
    }

    /// Time left in the open window, if any.
    pub fn remaining(&self, command: &str, user: &str) -> Option<Duration> {
        let now = Instant::now();
        let windows = self.windows.lock();
        let open_until = *windows.get(command)?.get(user)?;
        (now < open_until).then(|| open_until - now)
    }

    /// Returns `true` if an entry is stored for `(command, user)`, expired or not.
    pub fn has_entry(&self, command: &str, user: &str) -> bool {
        self.windows
            .lock()
            .get(command)
            .is_some_and(|users| users.contains_key(user))
    }

    /// Number of commands with at least one stored entry.
    pub fn tracked_commands(&self) -> usize {
        self.windows.lock().len()
    }
}

impl std::fmt::Debug for CooldownTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownTracker")
            .field("tracked_commands", &self.tracked_commands())
            .field("scheduled_cleanup", &self.scheduler.is_some())
            .finish()
    }
}

/// Removes `(command, user)` if it still expires at `at`.
///
/// Drops the command's map when it becomes empty. Returns whether anything
/// was removed.
fn remove_if_current(windows: &Mutex<Windows>, expiry: &Expiry) -> bool {
    let mut windows = windows.lock();
    let Some(users) = windows.get_mut(&expiry.command) else {
        return false;
    };
    if users.get(&expiry.user) != Some(&expiry.at) {
        return false;
    }
    users.remove(&expiry.user);
    if users.is_empty() {
        windows.remove(&expiry.command);
    }
    true
}

// =============================================================================
// ExpiryScheduler
// =============================================================================

/// Background task that deletes windows once they close.
pub struct ExpiryScheduler {
    windows: Arc<Mutex<Windows>>,
    requests: mpsc::UnboundedReceiver<Expiry>,
    queue: DelayQueue<Expiry>,
    shutdown: CancellationToken,
}

impl ExpiryScheduler {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = self.requests.recv() => match request {
                    Some(expiry) => self.schedule(expiry),
                    None => break,
                },
                Some(expired) = self.queue.next(), if !self.queue.is_empty() => {
                    let expiry = expired.into_inner();
                    if expiry.at > Instant::now() {
                        self.schedule(expiry);
                    } else if remove_if_current(&self.windows, &expiry) {
                        trace!(command = %expiry.command, user = %expiry.user, "Cooldown window closed");
                    }
                }
            }
        }
        debug!(pending = self.queue.len(), "Cooldown scheduler stopped");
    }

    /// Queues `expiry`, capping the delay at [`MAX_QUEUE_DELAY`].
    fn schedule(&mut self, expiry: Expiry) {
        let delay = expiry.at.saturating_duration_since(Instant::now());
        if delay > MAX_QUEUE_DELAY {
            trace!(command = %expiry.command, user = %expiry.user, "Cooldown cleanup re-queued in hops");
        }
        self.queue.insert(expiry, delay.min(MAX_QUEUE_DELAY));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> Option<Duration> {
        Some(Duration::from_secs(value))
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_lifecycle() {
        let tracker = CooldownTracker::new();

        assert!(tracker.acquire("ping", "u1", secs(5)).is_ok());

        tokio::time::advance(Duration::from_secs(2)).await;
        let remaining = tracker.acquire("ping", "u1", secs(5)).unwrap_err();
        assert_eq!(round_to_tenths(remaining), 3.0);
        assert_eq!(tracker.remaining_seconds("ping", "u1"), 3.0);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(tracker.acquire("ping", "u1", secs(5)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_attempts_do_not_extend_window() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("ping", "u1", Some(5.0)));

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(!tracker.check("ping", "u1", Some(5.0)));
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(tracker.check("ping", "u1", Some(5.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_are_per_user_and_per_command() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("ping", "u1", Some(5.0)));
        assert!(tracker.check("ping", "u2", Some(5.0)));
        assert!(tracker.check("help", "u1", Some(5.0)));
        assert!(!tracker.check("ping", "u1", Some(5.0)));
    }

    #[tokio::test]
    async fn test_absent_or_zero_window_records_nothing() {
        let tracker = CooldownTracker::new();
        for _ in 0..3 {
            assert!(tracker.check("ping", "u1", None));
            assert!(tracker.check("ping", "u1", Some(0.0)));
            assert!(tracker.check("ping", "u1", Some(-1.0)));
        }
        assert!(!tracker.has_entry("ping", "u1"));
        assert_eq!(tracker.tracked_commands(), 0);
        assert_eq!(tracker.remaining_seconds("ping", "u1"), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_removes_expired_entries() {
        let shutdown = CancellationToken::new();
        let (tracker, handle) = CooldownTracker::with_scheduler(shutdown.clone());

        assert!(tracker.check("ping", "u1", Some(5.0)));
        assert!(tracker.check("ping", "u2", Some(10.0)));

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert!(!tracker.has_entry("ping", "u1"));
        assert!(tracker.has_entry("ping", "u2"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(tracker.tracked_commands(), 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_window_does_not_stop_cleanup() {
        let shutdown = CancellationToken::new();
        let (tracker, handle) = CooldownTracker::with_scheduler(shutdown.clone());

        assert!(tracker.check("report", "u1", Some(1.0e8)));
        assert!(tracker.check("ping", "u2", Some(1.0)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        assert!(!tracker.has_entry("ping", "u2"));
        assert!(tracker.has_entry("report", "u1"));
        assert!(!tracker.check("report", "u1", Some(1.0e8)));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_window_is_enforced() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("report", "u1", Some(1.0e18)));
        assert!(!tracker.check("report", "u1", Some(1.0e18)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cleanup_keeps_newer_window() {
        let tracker = CooldownTracker::new();
        assert!(tracker.acquire("ping", "u1", secs(5)).is_ok());
        let first = Expiry {
            command: "ping".into(),
            user: "u1".into(),
            at: Instant::now() + Duration::from_secs(5),
        };

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(tracker.acquire("ping", "u1", secs(5)).is_ok());

        assert!(!remove_if_current(&tracker.windows, &first));
        assert!(tracker.has_entry("ping", "u1"));
    }

    #[test]
    fn test_window_from_secs() {
        assert_eq!(window_from_secs(Some(1.5)), Some(Duration::from_millis(1500)));
        assert_eq!(window_from_secs(Some(0.0)), None);
        assert_eq!(window_from_secs(Some(f64::NAN)), None);
        assert_eq!(window_from_secs(None), None);
    }
}
