//! Blocking framing, used by `authd-helper`: the helper has exactly one duty
//! at a time, so a blocking read is the simplest correct implementation,
//! just as the source this protocol is grounded on (`SafeDataStream`) is
//! blocking throughout.

use std::io::{Read, Write};

use crate::error::ProtocolError;
use crate::message::FramedMessage;
use crate::wire::{decode_payload, encode_payload};

/// One end of the framed channel over a blocking duplex stream `S`.
///
/// `send`/`receive` each reuse an internal buffer that `clear` resets
/// between messages, so a long-lived `Framed` does not grow unboundedly
/// allocating a fresh `Vec` per message.
pub struct Framed<S> {
    stream: S,
    buf: Vec<u8>,
}

impl<S> Framed<S> {
    pub fn new(stream: S) -> Self {
        Framed {
            stream,
            buf: Vec::new(),
        }
    }

    /// Drops any buffered bytes from the previous message. Safe to call
    /// unconditionally between `send`/`receive` calls.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<S: Write> Framed<S> {
    /// Buffers the whole payload, then writes the `u32` length prefix
    /// followed by the payload in one shot.
    pub fn send(&mut self, msg: &FramedMessage) -> Result<(), ProtocolError> {
        self.clear();
        encode_payload(msg, &mut self.buf);
        let len = self.buf.len() as u32;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(&self.buf)?;
        Ok(())
    }
}

impl<S: Read> Framed<S> {
    /// Reads exactly one message, looping over partial reads for both the
    /// length prefix and the payload. Never exposes a partially-received
    /// message to the caller.
    pub fn receive(&mut self) -> Result<FramedMessage, ProtocolError> {
        let len = self.read_u32_exact()?;
        self.buf.clear();
        self.buf.resize(len as usize, 0);
        self.read_exact_looping(len as usize)?;
        if self.buf.len() < 4 {
            return Err(ProtocolError::Malformed("frame shorter than a tag".into()));
        }
        let tag = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        decode_payload(tag, &self.buf[4..])
    }

    fn read_u32_exact(&mut self) -> Result<u32, ProtocolError> {
        let mut header = [0u8; 4];
        let mut have = 0;
        while have < header.len() {
            let n = self.stream.read(&mut header[have..])?;
            if n == 0 {
                return Err(ProtocolError::ChannelClosed);
            }
            have += n;
        }
        Ok(u32::from_be_bytes(header))
    }

    fn read_exact_looping(&mut self, len: usize) -> Result<(), ProtocolError> {
        let mut have = 0;
        while have < len {
            let n = self.stream.read(&mut self.buf[have..len])?;
            if n == 0 {
                return Err(ProtocolError::ChannelClosed);
            }
            have += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A reader that yields its bytes a few at a time, to exercise the
    /// partial-read loops in both `read_u32_exact` and
    /// `read_exact_looping`.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let remaining = self.data.len() - self.pos;
            let n = remaining.min(self.chunk).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_then_receive_round_trips() {
        let stream = Cursor::new(Vec::new());
        let mut framed = Framed::new(stream);
        framed
            .send(&FramedMessage::RequestDisplay)
            .unwrap();
        framed.stream.set_position(0);
        let msg = framed.receive().unwrap();
        assert_eq!(msg, FramedMessage::RequestDisplay);
    }

    #[test]
    fn two_messages_back_to_back_do_not_cross_contaminate() {
        let mut data = Vec::new();
        {
            let mut w = Framed::new(Cursor::new(&mut data));
            w.send(&FramedMessage::RequestSessionId).unwrap();
            w.send(&FramedMessage::SessionId { id: 7 }).unwrap();
        }
        let mut r = Framed::new(Cursor::new(data));
        assert_eq!(r.receive().unwrap(), FramedMessage::RequestSessionId);
        assert_eq!(r.receive().unwrap(), FramedMessage::SessionId { id: 7 });
    }

    #[test]
    fn partial_reads_are_looped_over() {
        let mut data = Vec::new();
        {
            let mut w = Framed::new(Cursor::new(&mut data));
            w.send(&FramedMessage::Display { name: ":0".into() }).unwrap();
        }
        let trickle = Trickle {
            data,
            pos: 0,
            chunk: 3,
        };
        let mut framed = Framed::new(trickle);
        let msg = framed.receive().unwrap();
        assert_eq!(msg, FramedMessage::Display { name: ":0".into() });
    }

    #[test]
    fn eof_before_header_is_channel_closed() {
        let stream = Cursor::new(Vec::<u8>::new());
        let mut framed = Framed::new(stream);
        let err = framed.receive().unwrap_err();
        assert!(matches!(err, ProtocolError::ChannelClosed));
    }
}
