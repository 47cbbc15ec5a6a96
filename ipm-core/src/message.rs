//! Message value types.
//!
//! Outgoing payloads are borrowed [`Fragment`]s; incoming messages are owned
//! [`Response`]s. Payload length is always authoritative: there is no
//! terminator convention on either side.

use bytes::Bytes;

/// One outgoing payload buffer.
///
/// A fragment pairs an optional buffer with a declared length, so callers that
/// hand over buffers from foreign code can express "no buffer" explicitly.
/// Sending a bufferless fragment with a nonzero length is rejected with
/// [`IpmError::NullPointerPassedToSend`](crate::error::IpmError::NullPointerPassedToSend).
///
/// # Examples
///
/// ```
/// use ipm_core::message::Fragment;
///
/// let data = b"TEST".to_vec();
/// let whole = Fragment::from(&data[..]);
/// assert_eq!(whole.len(), 4);
///
/// let head = Fragment::truncated(&data, 2);
/// assert_eq!(head.as_bytes(), Some(&b"TE"[..]));
///
/// let missing = Fragment::null(10);
/// assert!(missing.is_null());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    data: Option<&'a [u8]>,
    len: usize,
}

impl<'a> Fragment<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data: Some(data),
            len: data.len(),
        }
    }

    /// The first `len` bytes of `data` (all of it if `len` is larger).
    #[must_use]
    pub fn truncated(data: &'a [u8], len: usize) -> Self {
        Self::new(&data[..len.min(data.len())])
    }

    /// A fragment with no buffer behind it.
    #[must_use]
    pub const fn null(len: usize) -> Self {
        Self { data: None, len }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when there is no buffer but bytes were declared.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.data.is_none() && self.len != 0
    }

    /// The payload, `None` when there is no buffer.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.data {
            Some(data) => Some(data),
            None if self.len == 0 => Some(&[]),
            None => None,
        }
    }
}

impl<'a> From<&'a [u8]> for Fragment<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Fragment<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Self::new(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Fragment<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl<'a> From<&'a str> for Fragment<'a> {
    fn from(data: &'a str) -> Self {
        Self::new(data.as_bytes())
    }
}

/// A received message: payload plus its metadata/topic string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub data: Bytes,
    pub metadata: String,
}

impl Response {
    pub fn new(data: impl Into<Bytes>, metadata: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            metadata: metadata.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_lengths() {
        let f = Fragment::from(b"TEST");
        assert_eq!(f.len(), 4);
        assert!(!f.is_null());
        assert_eq!(f.as_bytes(), Some(&b"TEST"[..]));

        let f = Fragment::truncated(b"TEST", 0);
        assert!(f.is_empty());
        assert!(!f.is_null());

        let f = Fragment::truncated(b"TEST", 99);
        assert_eq!(f.len(), 4);
    }

    #[test]
    fn test_null_fragment() {
        let f = Fragment::null(10);
        assert!(f.is_null());
        assert_eq!(f.as_bytes(), None);

        // Nothing declared, nothing missing
        let f = Fragment::null(0);
        assert!(!f.is_null());
        assert!(f.is_empty());
        assert_eq!(f.as_bytes(), Some(&[][..]));
    }

    #[test]
    fn test_response() {
        let r = Response::new(vec![1u8, 2, 3], "topic");
        assert_eq!(r.len(), 3);
        assert_eq!(r.metadata, "topic");
        assert!(Response::default().is_empty());
    }
}
