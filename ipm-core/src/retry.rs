//! Bounded retry engine.
//!
//! Turns the single-shot, non-blocking primitives of a transport into
//! operations that block for at most a caller-supplied [`Timeout`]:
//!
//! - [`send_with_retry`] re-attempts a whole framed message until the
//!   transport takes its first frame, then pushes the rest.
//! - [`recv_with_retry`] polls for the first frame of a message, then reads
//!   the remaining frames without consulting the timeout again.
//!
//! Between failed attempts the calling thread sleeps according to a
//! [`Backoff`]; that sleep is the only suspension point and is clipped to the
//! remaining budget. [`Timeout::NO_BLOCK`] makes exactly one attempt.

use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::codec::{self, FrameAssembler};
use crate::error::{IpmError, Result};
use crate::message::Response;
use crate::options::EndpointOptions;
use crate::timeout::{Deadline, Timeout};
use crate::transport::{RecvTransport, SendTransport};

/// Delay schedule between failed attempts, taken from [`EndpointOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub max_frames: usize,
    pub max_msg_size: usize,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_options(options: &EndpointOptions) -> Self {
        Self {
            poll_interval: options.poll_interval,
            max_poll_interval: options.max_poll_interval,
            max_frames: options.max_frames,
            max_msg_size: options.max_msg_size,
        }
    }

    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.poll_interval, self.max_poll_interval)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&EndpointOptions::default())
    }
}

/// Exponential backoff state for one bounded operation.
///
/// # Example
///
/// ```rust
/// use ipm_core::retry::Backoff;
/// use std::time::Duration;
///
/// let mut backoff = Backoff::new(Duration::from_millis(1), Duration::from_millis(4));
///
/// assert_eq!(backoff.next_delay(), Duration::from_millis(1));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(2));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(4));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(4));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    base_interval: Duration,
    max_interval: Duration,
    attempt: u32,
    current_interval: Duration,
}

impl Backoff {
    #[must_use]
    pub const fn new(base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            base_interval,
            max_interval,
            attempt: 0,
            current_interval: base_interval,
        }
    }

    /// Delay to wait before the next attempt.
    ///
    /// Doubles on every call until it reaches the max interval. A max at or
    /// below the base keeps the delay fixed.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_interval;

        self.attempt = self.attempt.saturating_add(1);
        let grown = self
            .base_interval
            .checked_mul(1_u32 << self.attempt.min(10))
            .unwrap_or(Duration::MAX);
        self.current_interval = grown.min(self.max_interval).max(self.base_interval);

        delay
    }

    /// Number of delays handed out so far.
    #[inline]
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

fn pause(backoff: &mut Backoff, deadline: &Deadline) {
    let delay = backoff.next_delay();
    let delay = deadline.remaining().map_or(delay, |left| delay.min(left));
    if delay.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(delay);
    }
}

/// Send one logical message (metadata frame plus payload frames) within `timeout`.
///
/// # Errors
///
/// - [`IpmError::SendTimeoutExpired`] if no attempt succeeded in time
/// - any hard error the transport reports
pub fn send_with_retry<T>(
    transport: &mut T,
    metadata: &str,
    parts: &[&[u8]],
    timeout: Timeout,
    policy: &RetryPolicy,
) -> Result<()>
where
    T: SendTransport + ?Sized,
{
    let deadline = timeout.start();
    let mut backoff = policy.backoff();

    loop {
        if try_send_unit(transport, metadata, parts)? {
            trace!(
                "[IPM] sent {} payload frame(s) on \"{}\" after {} retries",
                parts.len(),
                metadata,
                backoff.attempt()
            );
            return Ok(());
        }

        if deadline.expired() {
            trace!(
                "[IPM] send on \"{}\" timed out after {:?}",
                metadata,
                deadline.elapsed()
            );
            return Err(IpmError::SendTimeoutExpired(timeout));
        }

        pause(&mut backoff, &deadline);
    }
}

/// One attempt at the whole unit. `Ok(false)` means the transport refused the
/// first frame and nothing was queued.
fn try_send_unit<T>(transport: &mut T, metadata: &str, parts: &[&[u8]]) -> Result<bool>
where
    T: SendTransport + ?Sized,
{
    let mut frames = codec::encode(metadata, parts);
    let Some((first, more)) = frames.next() else {
        return Ok(true);
    };

    if !transport.try_send_frame(first, more)? {
        return Ok(false);
    }

    for (frame, more) in frames {
        let mut warned = false;
        // The first frame is queued; the transport owes us the rest of the message.
        while !transport.try_send_frame(frame, more)? {
            if !warned {
                warn!("[IPM] transport refused a continuation frame, spinning until accepted");
                warned = true;
            }
            thread::yield_now();
        }
    }

    Ok(true)
}

/// Receive one complete logical message within `timeout`.
///
/// # Errors
///
/// - [`IpmError::ReceiveTimeoutExpired`] if no first frame arrived in time
/// - [`IpmError::TornMessage`] if the transport delivered part of a message
/// - [`IpmError::TooManyFrames`] / [`IpmError::MessageTooLarge`] for oversize messages
/// - any hard error the transport reports
pub fn recv_with_retry<T>(transport: &mut T, timeout: Timeout, policy: &RetryPolicy) -> Result<Response>
where
    T: RecvTransport + ?Sized,
{
    let deadline = timeout.start();
    let mut backoff = policy.backoff();

    loop {
        if let Some(first) = transport.try_recv_frame()? {
            let mut assembler = FrameAssembler::new(policy.max_frames, policy.max_msg_size);
            let mut frame = first;
            // Atomic delivery: the rest of the message is already here.
            loop {
                if let Some(response) = assembler.push_frame(frame.data, frame.more)? {
                    trace!(
                        "[IPM] received {} bytes on \"{}\" after {} retries",
                        response.data.len(),
                        response.metadata,
                        backoff.attempt()
                    );
                    return Ok(response);
                }
                frame = match transport.try_recv_frame()? {
                    Some(next) => next,
                    None => {
                        warn!("[IPM] transport delivered a partial multi-frame message");
                        return Err(IpmError::torn(
                            "continuation frame missing after the first frame was observed",
                        ));
                    }
                };
            }
        }

        if deadline.expired() {
            return Err(IpmError::ReceiveTimeoutExpired(timeout));
        }

        pause(&mut backoff, &deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionInfo;
    use crate::transport::Frame;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::time::Instant;

    /// Refuses the first `refuse` first-frames, records everything accepted.
    #[derive(Default)]
    struct FlakySink {
        refuse: usize,
        attempts: usize,
        accepted: Vec<(Vec<u8>, bool)>,
    }

    impl SendTransport for FlakySink {
        fn connect(&mut self, _: &ConnectionInfo, _: &EndpointOptions) -> Result<()> {
            Ok(())
        }

        fn try_send_frame(&mut self, frame: &[u8], more: bool) -> Result<bool> {
            let starts_message = self.accepted.last().map_or(true, |(_, more)| !more);
            if starts_message {
                self.attempts += 1;
                if self.refuse > 0 {
                    self.refuse -= 1;
                    return Ok(false);
                }
            }
            self.accepted.push((frame.to_vec(), more));
            Ok(true)
        }
    }

    #[derive(Default)]
    struct ScriptedSource {
        frames: VecDeque<Frame>,
        polls: usize,
    }

    impl RecvTransport for ScriptedSource {
        fn connect(&mut self, _: &ConnectionInfo, _: &EndpointOptions) -> Result<()> {
            Ok(())
        }

        fn try_recv_frame(&mut self) -> Result<Option<Frame>> {
            self.polls += 1;
            Ok(self.frames.pop_front())
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::from_options(
            &EndpointOptions::default().with_poll_interval(Duration::from_micros(100)),
        )
    }

    #[test]
    fn test_backoff_fixed_by_default() {
        let mut backoff = RetryPolicy::default().backoff();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
        assert_eq!(backoff.attempt(), 2);
    }

    #[test]
    fn test_backoff_zero_interval_stays_zero() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_backoff_saturates_on_huge_intervals() {
        let huge = Duration::from_secs(u64::MAX / 2 + 1);
        let mut backoff = Backoff::new(huge, Duration::MAX);
        assert_eq!(backoff.next_delay(), huge);
        assert_eq!(backoff.next_delay(), Duration::MAX);
        assert_eq!(backoff.next_delay(), Duration::MAX);

        let mut backoff = Backoff::new(Duration::MAX, Duration::MAX);
        for _ in 0..20 {
            assert_eq!(backoff.next_delay(), Duration::MAX);
        }
    }

    #[test]
    fn test_backoff_attempt_count_saturates() {
        let mut backoff = Backoff::new(Duration::from_millis(1), Duration::from_millis(4));
        backoff.attempt = u32::MAX - 1;
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), u32::MAX);
        assert_eq!(backoff.next_delay(), Duration::from_millis(4));
    }

    #[test]
    fn test_send_frames_in_order() {
        let mut sink = FlakySink::default();
        let parts: [&[u8]; 2] = [b"T", b"Ee"];
        send_with_retry(&mut sink, "meta", &parts, Timeout::NO_BLOCK, &fast_policy()).unwrap();

        assert_eq!(
            sink.accepted,
            vec![
                (b"meta".to_vec(), true),
                (b"T".to_vec(), true),
                (b"Ee".to_vec(), false)
            ]
        );
    }

    #[test]
    fn test_no_block_makes_exactly_one_attempt() {
        let mut sink = FlakySink {
            refuse: 1,
            ..Default::default()
        };
        let parts: [&[u8]; 1] = [b"x"];
        let err = send_with_retry(&mut sink, "", &parts, Timeout::NO_BLOCK, &fast_policy())
            .unwrap_err();

        assert!(matches!(err, IpmError::SendTimeoutExpired(t) if t == Timeout::NO_BLOCK));
        assert_eq!(sink.attempts, 1);
        assert!(sink.accepted.is_empty());
    }

    #[test]
    fn test_send_retries_until_accepted() {
        let mut sink = FlakySink {
            refuse: 3,
            ..Default::default()
        };
        let parts: [&[u8]; 1] = [b"x"];
        send_with_retry(&mut sink, "", &parts, Timeout::from_millis(1000), &fast_policy())
            .unwrap();

        assert_eq!(sink.attempts, 4);
        assert_eq!(sink.accepted.len(), 2);
    }

    #[test]
    fn test_block_forever_keeps_trying() {
        let mut sink = FlakySink {
            refuse: 20,
            ..Default::default()
        };
        let parts: [&[u8]; 1] = [b"x"];
        send_with_retry(&mut sink, "", &parts, Timeout::BLOCK, &fast_policy()).unwrap();
        assert_eq!(sink.attempts, 21);
    }

    #[test]
    fn test_send_timeout_is_bounded() {
        let mut sink = FlakySink {
            refuse: usize::MAX,
            ..Default::default()
        };
        let parts: [&[u8]; 1] = [b"x"];
        let started = Instant::now();
        let err = send_with_retry(&mut sink, "", &parts, Timeout::from_millis(30), &fast_policy())
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(sink.attempts > 1);
    }

    #[test]
    fn test_receive_two_frames() {
        let mut source = ScriptedSource::default();
        source.frames.push_back(Frame::new(Bytes::from_static(b"topicA"), true));
        source.frames.push_back(Frame::new(Bytes::from_static(b"TEST"), false));

        let msg = recv_with_retry(&mut source, Timeout::NO_BLOCK, &fast_policy()).unwrap();
        assert_eq!(&msg.data[..], b"TEST");
        assert_eq!(msg.metadata, "topicA");
    }

    #[test]
    fn test_receive_timeout_on_empty_source() {
        let mut source = ScriptedSource::default();
        let err = recv_with_retry(&mut source, Timeout::from_millis(20), &fast_policy())
            .unwrap_err();

        assert!(matches!(err, IpmError::ReceiveTimeoutExpired(_)));
        assert!(source.polls > 1);

        let mut source = ScriptedSource::default();
        let err = recv_with_retry(&mut source, Timeout::NO_BLOCK, &fast_policy()).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(source.polls, 1);
    }

    #[test]
    fn test_receive_partial_message_is_torn() {
        let mut source = ScriptedSource::default();
        source.frames.push_back(Frame::new(Bytes::from_static(b"topic"), true));

        let err = recv_with_retry(&mut source, Timeout::BLOCK, &fast_policy()).unwrap_err();
        assert!(matches!(err, IpmError::TornMessage(_)));
    }
}
