//! Two-frame message framing.
//!
//! On the wire a logical message is:
//!
//! ```text
//! [ metadata/topic (MORE) ][ payload ]
//! [ metadata/topic (MORE) ][ part 1 (MORE) ] ... [ part N ]     (multipart)
//! ```
//!
//! Topic filtering transports only ever inspect the first frame.

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;

use crate::error::{IpmError, Result};
use crate::message::Response;

/// Outgoing frames for one message, in order, with their MORE flags.
///
/// # Examples
///
/// ```
/// use ipm_core::codec::encode;
///
/// let parts: [&[u8]; 2] = [b"ab", b"c"];
/// let frames: Vec<_> = encode("topic", &parts).collect();
///
/// assert_eq!(frames, vec![
///     (&b"topic"[..], true),
///     (&b"ab"[..], true),
///     (&b"c"[..], false),
/// ]);
/// ```
pub fn encode<'a>(
    metadata: &'a str,
    parts: &'a [&'a [u8]],
) -> impl Iterator<Item = (&'a [u8], bool)> + 'a {
    let last = parts.len();
    std::iter::once((metadata.as_bytes(), last > 0)).chain(
        parts
            .iter()
            .enumerate()
            .map(move |(i, part)| (*part, i + 1 < last)),
    )
}

/// Collects incoming frames until a complete message is formed.
///
/// Invariants:
/// - Frames are appended in-order
/// - A message completes when `more == false`
/// - Limits are enforced eagerly; a violating message is drained, not returned
///
/// Owned by a single receive loop, not shared.
#[derive(Debug)]
pub struct FrameAssembler {
    frames: SmallVec<[Bytes; 2]>,
    byte_count: usize,
    frame_count: usize,
    overflow: Option<IpmError>,

    max_frames: usize,
    max_bytes: usize,
}

impl FrameAssembler {
    pub fn new(max_frames: usize, max_bytes: usize) -> Self {
        Self {
            frames: SmallVec::new(),
            byte_count: 0,
            frame_count: 0,
            overflow: None,
            max_frames,
            max_bytes,
        }
    }

    /// Push a frame.
    ///
    /// Returns:
    /// - `Ok(None)` if the message is not complete
    /// - `Ok(Some(Response))` once the last frame arrived
    /// - `Err(_)` on the last frame of a message that broke the limits or
    ///   carried no payload frame
    pub fn push_frame(&mut self, data: Bytes, more: bool) -> Result<Option<Response>> {
        self.frame_count += 1;

        if self.overflow.is_none() {
            // The metadata frame does not count against the payload budget.
            let is_payload = self.frame_count > 1;
            if self.frame_count > self.max_frames {
                self.overflow = Some(IpmError::TooManyFrames {
                    count: self.frame_count,
                    max: self.max_frames,
                });
            } else if is_payload && self.byte_count + data.len() > self.max_bytes {
                self.overflow = Some(IpmError::MessageTooLarge {
                    size: self.byte_count + data.len(),
                    max: self.max_bytes,
                });
            } else {
                if is_payload {
                    self.byte_count += data.len();
                }
                self.frames.push(data);
            }
        }

        if more {
            return Ok(None);
        }

        let overflow = self.overflow.take();
        let frames = std::mem::take(&mut self.frames);
        self.reset();

        match overflow {
            Some(err) => Err(err),
            None => decode(frames).map(Some),
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.frames.clear();
        self.frame_count = 0;
        self.byte_count = 0;
    }
}

fn decode(frames: SmallVec<[Bytes; 2]>) -> Result<Response> {
    let mut frames = frames.into_iter();
    let metadata = frames
        .next()
        .map(|f| String::from_utf8_lossy(&f).into_owned())
        .unwrap_or_default();

    let data = match (frames.next(), frames.len()) {
        (None, _) => {
            return Err(IpmError::torn(format!(
                "message with metadata \"{metadata}\" has no payload frame"
            )))
        }
        // Single payload frame: hand the buffer over without copying
        (Some(payload), 0) => payload,
        (Some(first), _) => {
            let rest: SmallVec<[Bytes; 2]> = frames.collect();
            let total = first.len() + rest.iter().map(Bytes::len).sum::<usize>();
            let mut buf = BytesMut::with_capacity(total);
            buf.extend_from_slice(&first);
            for part in &rest {
                buf.extend_from_slice(part);
            }
            buf.freeze()
        }
    };

    Ok(Response { data, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> FrameAssembler {
        FrameAssembler::new(16, 64)
    }

    #[test]
    fn test_encode_single_payload() {
        let parts: [&[u8]; 1] = [b"TEST"];
        let frames: Vec<_> = encode("", &parts).collect();
        assert_eq!(frames, vec![(&b""[..], true), (&b"TEST"[..], false)]);
    }

    #[test]
    fn test_two_frame_message() {
        let mut asm = assembler();
        assert!(asm.push_frame(Bytes::from_static(b"topicA"), true).unwrap().is_none());

        let msg = asm
            .push_frame(Bytes::from_static(b"TEST"), false)
            .unwrap()
            .unwrap();
        assert_eq!(msg.metadata, "topicA");
        assert_eq!(&msg.data[..], b"TEST");
    }

    #[test]
    fn test_multipart_payload_is_concatenated() {
        let mut asm = assembler();
        asm.push_frame(Bytes::from_static(b"m"), true).unwrap();
        asm.push_frame(Bytes::from_static(b"T"), true).unwrap();
        asm.push_frame(Bytes::from_static(b"Ee"), true).unwrap();
        let msg = asm.push_frame(Bytes::from_static(b"S"), false).unwrap().unwrap();
        assert_eq!(&msg.data[..], b"TEeS");
        assert_eq!(msg.metadata, "m");
    }

    #[test]
    fn test_metadata_only_is_torn() {
        let mut asm = assembler();
        let err = asm.push_frame(Bytes::from_static(b"lonely"), false).unwrap_err();
        assert!(matches!(err, IpmError::TornMessage(_)));

        // The assembler recovers for the next message
        asm.push_frame(Bytes::from_static(b""), true).unwrap();
        assert!(asm.push_frame(Bytes::from_static(b"x"), false).unwrap().is_some());
    }

    #[test]
    fn test_too_large_message_is_drained() {
        let mut asm = FrameAssembler::new(16, 4);
        asm.push_frame(Bytes::from_static(b"topic-longer-than-limit"), true)
            .unwrap();
        asm.push_frame(Bytes::from_static(b"abc"), true).unwrap();
        asm.push_frame(Bytes::from_static(b"de"), true).unwrap();
        let err = asm.push_frame(Bytes::from_static(b"f"), false).unwrap_err();
        assert!(matches!(err, IpmError::MessageTooLarge { size: 5, max: 4 }));

        asm.push_frame(Bytes::from_static(b"t"), true).unwrap();
        let msg = asm.push_frame(Bytes::from_static(b"ok"), false).unwrap().unwrap();
        assert_eq!(&msg.data[..], b"ok");
    }

    #[test]
    fn test_too_many_frames() {
        let mut asm = FrameAssembler::new(2, 64);
        asm.push_frame(Bytes::from_static(b"t"), true).unwrap();
        asm.push_frame(Bytes::from_static(b"a"), true).unwrap();
        let err = asm.push_frame(Bytes::from_static(b"b"), false).unwrap_err();
        assert!(matches!(err, IpmError::TooManyFrames { count: 3, max: 2 }));
    }

    #[test]
    fn test_non_utf8_metadata_is_lossy() {
        let mut asm = assembler();
        asm.push_frame(Bytes::from_static(&[0x66, 0xff]), true).unwrap();
        let msg = asm.push_frame(Bytes::from_static(b"x"), false).unwrap().unwrap();
        assert_eq!(msg.metadata, "f\u{fffd}");
    }
}
