//! Line type shared between the dispatcher and every subscriber
//!
//! A `Line` is cheap to clone: the underlying `Bytes` is reference-counted,
//! so fanning one line out to many subscribers never copies its content.

use bytes::{BufMut, Bytes, BytesMut};

/// One newline-delimited record produced by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Payload followed by a single `\n`
    framed: Bytes,
}

impl Line {
    /// Build a line from a payload that does not contain the terminator
    pub fn new(payload: impl AsRef<[u8]>) -> Self {
        let payload = payload.as_ref();
        let mut buf = BytesMut::with_capacity(payload.len() + 1);
        buf.put_slice(payload);
        buf.put_u8(b'\n');
        Self {
            framed: buf.freeze(),
        }
    }

    /// Payload without the terminator
    pub fn payload(&self) -> &[u8] {
        &self.framed[..self.framed.len() - 1]
    }

    /// Payload followed by `\n`, as written to clients and to the device
    pub fn framed(&self) -> &Bytes {
        &self.framed
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.framed.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lossy UTF-8 view of the payload, for logging
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.payload())
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing() {
        let line = Line::new("temp=21.5");
        assert_eq!(line.payload(), b"temp=21.5");
        assert_eq!(&line.framed()[..], b"temp=21.5\n");
        assert_eq!(line.len(), 9);
    }

    #[test]
    fn test_empty_line() {
        let line = Line::new("");
        assert!(line.is_empty());
        assert_eq!(&line.framed()[..], b"\n");
    }

    #[test]
    fn test_clone_shares_storage() {
        let line = Line::from("shared");
        let copy = line.clone();
        assert_eq!(line.framed().as_ptr(), copy.framed().as_ptr());
    }
}
