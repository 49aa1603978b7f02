//! Implicit wait bound for element lookups.
//!
//! Lookups retry on a fixed poll interval until something matches or the
//! bound elapses. Time is read from `tokio::time` so paused-clock tests
//! advance instantly.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default implicit wait bound (10 seconds)
pub const DEFAULT_IMPLICIT_WAIT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_IMPLICIT_WAIT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Start a deadline using these options
    #[must_use]
    pub fn start(&self) -> Deadline {
        Deadline::new(*self)
    }
}

// =============================================================================
// DEADLINE
// =============================================================================

/// A running wait: counts attempts and decides whether another one fits.
///
/// ```ignore
/// let mut deadline = options.start();
/// loop {
///     if let Some(found) = probe().await? {
///         return Ok(found);
///     }
///     if !deadline.next_attempt().await {
///         return Err(deadline.expired(selector));
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Deadline {
    options: WaitOptions,
    started: Instant,
    attempts: usize,
}

impl Deadline {
    /// Start counting now
    #[must_use]
    pub fn new(options: WaitOptions) -> Self {
        Self {
            options,
            started: Instant::now(),
            attempts: 0,
        }
    }

    /// Record a failed attempt; sleep and return `true` if the bound leaves
    /// room for another one, `false` once it has elapsed.
    ///
    /// The sleep is clamped to the time remaining, so the overall wait never
    /// exceeds the bound by more than the cost of the final probe.
    pub async fn next_attempt(&mut self) -> bool {
        self.attempts += 1;
        let timeout = self.options.timeout();
        let elapsed = self.started.elapsed();
        if elapsed >= timeout {
            return false;
        }
        let remaining = timeout - elapsed;
        tokio::time::sleep(self.options.poll_interval().min(remaining)).await;
        true
    }

    /// Failed attempts recorded so far
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Time since the deadline started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in whole milliseconds, for error reporting
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}
