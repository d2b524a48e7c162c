//! Field-level binary encoding shared by the blocking and async framing
//! layers. Every message is `u32 length` followed by `length` bytes of
//! payload; the payload's first four bytes are the tag (big-endian), and
//! the rest is the message's fields in the fixed order below.
//!
//! Field encodings (all big-endian):
//! - `u32`/`i32`: four bytes, fixed width.
//! - `string`: `u32` byte length, then the UTF-8 bytes (no NUL terminator).
//! - `bool`: one byte, `0` or `1`.
//! - `list of string`: `u32` count, then that many encoded strings.

use crate::error::ProtocolError;
use crate::message::{tags, FramedMessage};

/// Appends the wire encoding of `msg`'s tag and fields to `buf`.
pub fn encode_payload(msg: &FramedMessage, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&msg.tag().to_be_bytes());
    match msg {
        FramedMessage::Start {
            user,
            session,
            password,
            passwordless,
        } => {
            put_str(buf, user);
            put_str(buf, session);
            put_str(buf, password);
            put_bool(buf, *passwordless);
        }
        FramedMessage::End => {}
        FramedMessage::LoginSucceeded { session_name, user } => {
            put_str(buf, session_name);
            put_str(buf, user);
        }
        FramedMessage::LoginFailed => {}
        FramedMessage::RequestEnv { user } => put_str(buf, user),
        FramedMessage::Env { vars } => put_str_list(buf, vars),
        FramedMessage::RequestSessionId => {}
        FramedMessage::SessionId { id } => buf.extend_from_slice(&id.to_be_bytes()),
        FramedMessage::RequestCookieLink { path, user } => {
            put_str(buf, path);
            put_str(buf, user);
        }
        FramedMessage::CookieLink => {}
        FramedMessage::RequestDisplay => {}
        FramedMessage::Display { name } => put_str(buf, name),
    }
}

/// Parses a payload (tag already consumed by the caller) into the message
/// that tag identifies.
pub fn decode_payload(tag: u32, body: &[u8]) -> Result<FramedMessage, ProtocolError> {
    let mut r = Reader::new(body);
    let msg = match tag {
        tags::START => FramedMessage::Start {
            user: r.string()?,
            session: r.string()?,
            password: r.string()?,
            passwordless: r.boolean()?,
        },
        tags::END => FramedMessage::End,
        tags::LOGIN_SUCCEEDED => FramedMessage::LoginSucceeded {
            session_name: r.string()?,
            user: r.string()?,
        },
        tags::LOGIN_FAILED => FramedMessage::LoginFailed,
        tags::REQUEST_ENV => FramedMessage::RequestEnv { user: r.string()? },
        tags::ENV => FramedMessage::Env { vars: r.string_list()? },
        tags::REQUEST_SESSION_ID => FramedMessage::RequestSessionId,
        tags::SESSION_ID => FramedMessage::SessionId { id: r.i32()? },
        tags::REQUEST_COOKIE_LINK => FramedMessage::RequestCookieLink {
            path: r.string()?,
            user: r.string()?,
        },
        tags::COOKIE_LINK => FramedMessage::CookieLink,
        tags::REQUEST_DISPLAY => FramedMessage::RequestDisplay,
        tags::DISPLAY => FramedMessage::Display { name: r.string()? },
        other => return Err(ProtocolError::UnknownTag(other)),
    };
    Ok(msg)
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_bool(buf: &mut Vec<u8>, b: bool) {
    buf.push(if b { 1 } else { 0 });
}

fn put_str_list(buf: &mut Vec<u8>, items: &[String]) {
    buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
    for item in items {
        put_str(buf, item);
    }
}

struct Reader<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(body: &'a [u8]) -> Self {
        Reader { body, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.pos + n > self.body.len() {
            return Err(ProtocolError::Malformed(format!(
                "expected {} more bytes, have {}",
                n,
                self.body.len() - self.pos
            )));
        }
        let s = &self.body[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn boolean(&mut self) -> Result<bool, ProtocolError> {
        let b = self.take(1)?[0];
        match b {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::Malformed(format!("invalid bool byte: {}", other))),
        }
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn string_list(&mut self) -> Result<Vec<String>, ProtocolError> {
        let count = self.u32()? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.string()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: FramedMessage) {
        let mut buf = Vec::new();
        encode_payload(&msg, &mut buf);
        let tag = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let decoded = decode_payload(tag, &buf[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn every_variant_round_trips() {
        roundtrip(FramedMessage::Start {
            user: "alice".into(),
            session: "plasma.desktop".into(),
            password: "hunter2".into(),
            passwordless: false,
        });
        roundtrip(FramedMessage::End);
        roundtrip(FramedMessage::LoginSucceeded {
            session_name: "Session7".into(),
            user: "alice".into(),
        });
        roundtrip(FramedMessage::LoginFailed);
        roundtrip(FramedMessage::RequestEnv { user: "alice".into() });
        roundtrip(FramedMessage::Env {
            vars: vec!["HOME=/home/alice".into(), "SHELL=/bin/bash".into()],
        });
        roundtrip(FramedMessage::RequestSessionId);
        roundtrip(FramedMessage::SessionId { id: 7 });
        roundtrip(FramedMessage::RequestCookieLink {
            path: "/home/alice/.Xauthority".into(),
            user: "alice".into(),
        });
        roundtrip(FramedMessage::CookieLink);
        roundtrip(FramedMessage::RequestDisplay);
        roundtrip(FramedMessage::Display { name: ":0".into() });
    }

    #[test]
    fn empty_string_and_list_round_trip() {
        roundtrip(FramedMessage::RequestEnv { user: String::new() });
        roundtrip(FramedMessage::Env { vars: vec![] });
    }

    #[test]
    fn unknown_tag_is_reported() {
        let err = decode_payload(999, &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTag(999)));
    }

    #[test]
    fn truncated_body_is_malformed_not_panicking() {
        // SessionId needs 4 bytes for `id`; give it one.
        let err = decode_payload(tags::SESSION_ID, &[0]).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
