//! Endpoint configuration options
//!
//! Tunables that are not part of the connection address: how the bounded
//! retry loop polls, how deep transport queues may grow, and how large a
//! received message may be.

use std::time::Duration;

use crate::config::ConnectionInfo;
use crate::error::Result;

/// Default delay between failed non-blocking attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default high water mark (messages).
pub const DEFAULT_HWM: usize = 1000;

/// Default cap on frames in one received message.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Default cap on payload bytes in one received message (256 MiB).
pub const DEFAULT_MAX_MSG_SIZE: usize = 256 * 1024 * 1024;

/// Endpoint options.
///
/// # Examples
///
/// ```
/// use ipm_core::options::EndpointOptions;
/// use std::time::Duration;
///
/// let opts = EndpointOptions::default()
///     .with_poll_interval(Duration::from_micros(200))
///     .with_max_poll_interval(Duration::from_millis(5))
///     .with_send_hwm(64);
///
/// assert_eq!(opts.send_hwm, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Delay after the first failed attempt.
    ///
    /// Trades latency against CPU usage. `Duration::ZERO` re-attempts
    /// immediately (yielding the thread in between).
    pub poll_interval: Duration,

    /// Upper bound for the backoff delay.
    ///
    /// - Equal to or below `poll_interval` (default): fixed interval
    /// - Above: the delay doubles after every failed attempt up to this value
    pub max_poll_interval: Duration,

    /// High water mark for sending (messages queued per peer). Zero means
    /// no limit.
    pub send_hwm: usize,

    /// High water mark for receiving (messages queued locally). Zero means
    /// no limit.
    pub recv_hwm: usize,

    /// Time pending outgoing messages may linger after the endpoint is dropped
    pub linger: Duration,

    /// Maximum frames accepted in one received message
    pub max_frames: usize,

    /// Maximum payload bytes accepted in one received message
    pub max_msg_size: usize,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_interval: DEFAULT_POLL_INTERVAL,
            send_hwm: DEFAULT_HWM,
            recv_hwm: DEFAULT_HWM,
            linger: Duration::ZERO,
            max_frames: DEFAULT_MAX_FRAMES,
            max_msg_size: DEFAULT_MAX_MSG_SIZE,
        }
    }
}

impl EndpointOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_poll_interval(mut self, interval: Duration) -> Self {
        self.max_poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm;
        self
    }

    #[must_use]
    pub const fn with_recv_hwm(mut self, hwm: usize) -> Self {
        self.recv_hwm = hwm;
        self
    }

    #[must_use]
    pub const fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    #[must_use]
    pub const fn with_max_frames(mut self, max: usize) -> Self {
        self.max_frames = max;
        self
    }

    #[must_use]
    pub const fn with_max_msg_size(mut self, max: usize) -> Self {
        self.max_msg_size = max;
        self
    }

    /// Apply the transport-specific overrides found in `info`.
    ///
    /// Recognized fields: `send_hwm`, `recv_hwm`, `linger_ms`.
    pub fn merged_with(&self, info: &ConnectionInfo) -> Result<Self> {
        let mut opts = self.clone();
        if let Some(hwm) = info.get::<usize>("send_hwm")? {
            opts.send_hwm = hwm;
        }
        if let Some(hwm) = info.get::<usize>("recv_hwm")? {
            opts.recv_hwm = hwm;
        }
        if let Some(ms) = info.get::<u64>("linger_ms")? {
            opts.linger = Duration::from_millis(ms);
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = EndpointOptions::default();
        assert_eq!(opts.poll_interval, Duration::from_millis(1));
        assert_eq!(opts.max_poll_interval, opts.poll_interval);
        assert_eq!(opts.send_hwm, 1000);
        assert_eq!(opts.recv_hwm, 1000);
        assert_eq!(opts.linger, Duration::ZERO);
        assert_eq!(opts.max_frames, 1024);
    }

    #[test]
    fn test_connection_info_overrides() {
        let info = ConnectionInfo::new("inproc://x")
            .with_field("send_hwm", 2)
            .with_field("linger_ms", 250);

        let opts = EndpointOptions::default().merged_with(&info).unwrap();
        assert_eq!(opts.send_hwm, 2);
        assert_eq!(opts.recv_hwm, DEFAULT_HWM);
        assert_eq!(opts.linger, Duration::from_millis(250));
    }
}
