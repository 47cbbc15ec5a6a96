//! Timeout values for bounded send/receive operations.
//!
//! A [`Timeout`] wraps `Option<Duration>` with the same convention socket
//! options use elsewhere in this workspace:
//!
//! - `None`: block until the operation succeeds ([`Timeout::BLOCK`])
//! - `Some(Duration::ZERO)`: try exactly once ([`Timeout::NO_BLOCK`])
//! - `Some(duration)`: keep trying for up to `duration`
//!
//! Elapsed time is always measured with [`Instant`], never the wall clock.

use std::fmt;
use std::time::{Duration, Instant};

/// Budget for one bounded send or receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeout(Option<Duration>);

impl Timeout {
    /// Make exactly one attempt.
    pub const NO_BLOCK: Self = Self(Some(Duration::ZERO));

    /// Keep trying with no time ceiling.
    pub const BLOCK: Self = Self(None);

    /// Bounded timeout of `ms` milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Some(Duration::from_millis(ms)))
    }

    /// The finite duration, or `None` for [`Timeout::BLOCK`].
    #[inline]
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_no_block(&self) -> bool {
        matches!(self.0, Some(d) if d.is_zero())
    }

    #[inline]
    #[must_use]
    pub const fn is_block(&self) -> bool {
        self.0.is_none()
    }

    /// Start measuring this timeout from now.
    #[must_use]
    pub fn start(self) -> Deadline {
        Deadline {
            started: Instant::now(),
            timeout: self,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self(Some(d))
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        Self(d)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => write!(f, "infinite"),
            Some(d) if d.is_zero() => write!(f, "no-block"),
            Some(d) => write!(f, "{d:?}"),
        }
    }
}

/// A [`Timeout`] anchored at the instant an operation began.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Timeout,
}

impl Deadline {
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Timeout {
        self.timeout
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once elapsed time has reached the budget. Never true for `BLOCK`.
    #[must_use]
    pub fn expired(&self) -> bool {
        match self.timeout.0 {
            None => false,
            Some(limit) => self.elapsed() >= limit,
        }
    }

    /// Time left before expiry, `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .0
            .map(|limit| limit.saturating_sub(self.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(Timeout::NO_BLOCK.is_no_block());
        assert!(!Timeout::NO_BLOCK.is_block());
        assert!(Timeout::BLOCK.is_block());
        assert_eq!(Timeout::BLOCK.duration(), None);
        assert_eq!(Timeout::from(Duration::ZERO), Timeout::NO_BLOCK);
        assert_eq!(Timeout::from_millis(5).duration(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Timeout::BLOCK.to_string(), "infinite");
        assert_eq!(Timeout::NO_BLOCK.to_string(), "no-block");
        assert_eq!(Timeout::from_millis(100).to_string(), "100ms");
    }

    #[test]
    fn test_deadline_expiry() {
        let deadline = Timeout::NO_BLOCK.start();
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));

        let deadline = Timeout::BLOCK.start();
        assert!(!deadline.expired());
        assert_eq!(deadline.remaining(), None);

        let deadline = Timeout::from_millis(10).start();
        std::thread::sleep(Duration::from_millis(15));
        assert!(deadline.expired());
    }
}
