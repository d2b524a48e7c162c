//! Issues the helper's `Request*` messages over the framed channel and
//! blocks for the matching reply. Out-of-order handling per the documented
//! defensive path: a mismatched tag is logged and treated as a failure for
//! the pending request (an empty environment for `RequestEnv`, since that
//! has a sensible degraded value; an error for everything else).
//!
//! Generic over the writer half so tests can drive it over an in-memory
//! buffer instead of real stdio.

use std::io::Write;
use std::sync::mpsc::Receiver;

use authproto::sync::Framed;
use authproto::FramedMessage;

use authd_launch::{BrokerHandle, LaunchError};

use crate::events::HelperEvent;

pub struct ChannelBrokerHandle<'a, W: Write> {
    writer: &'a mut Framed<W>,
    inbound: &'a Receiver<HelperEvent>,
}

impl<'a, W: Write> ChannelBrokerHandle<'a, W> {
    pub fn new(writer: &'a mut Framed<W>, inbound: &'a Receiver<HelperEvent>) -> Self {
        ChannelBrokerHandle { writer, inbound }
    }

    fn send(&mut self, msg: &FramedMessage) -> Result<(), LaunchError> {
        self.writer
            .send(msg)
            .map_err(|e| LaunchError::Broker(e.to_string()))
    }

    /// Blocks for the next message from the broker, surfacing a closed
    /// channel as an error. A session-exit notification cannot occur here
    /// (no session is running yet while a `Request*` is outstanding), so it
    /// is logged and skipped rather than treated as the reply.
    fn next_message(&mut self) -> Result<FramedMessage, LaunchError> {
        loop {
            match self.inbound.recv() {
                Ok(HelperEvent::Message(msg)) => return Ok(msg),
                Ok(HelperEvent::ChannelClosed) => {
                    return Err(LaunchError::Broker("broker channel closed".to_string()))
                }
                Ok(HelperEvent::SessionExited) => {
                    log::warn!("session-exit event arrived while awaiting a broker reply");
                }
                Err(_) => return Err(LaunchError::Broker("broker channel closed".to_string())),
            }
        }
    }
}

impl<'a, W: Write> BrokerHandle for ChannelBrokerHandle<'a, W> {
    fn request_session_id(&mut self) -> Result<i32, LaunchError> {
        self.send(&FramedMessage::RequestSessionId)?;
        match self.next_message()? {
            FramedMessage::SessionId { id } => Ok(id),
            other => {
                log::warn!("expected SessionID, got out-of-order message {:?}", other);
                Err(LaunchError::Broker("out-of-order reply while awaiting SessionID".to_string()))
            }
        }
    }

    fn request_cookie_link(&mut self, path: &str, user: &str) -> Result<(), LaunchError> {
        self.send(&FramedMessage::RequestCookieLink {
            path: path.to_string(),
            user: user.to_string(),
        })?;
        match self.next_message()? {
            FramedMessage::CookieLink => Ok(()),
            other => {
                log::warn!("expected CookieLink, got out-of-order message {:?}", other);
                Err(LaunchError::CookieLinkRejected)
            }
        }
    }

    fn request_env(&mut self, user: &str) -> Result<Vec<(String, String)>, LaunchError> {
        self.send(&FramedMessage::RequestEnv { user: user.to_string() })?;
        match self.next_message()? {
            FramedMessage::Env { vars } => Ok(split_name_value(vars)),
            other => {
                log::warn!(
                    "expected Env, got out-of-order message {:?}; continuing with an empty environment",
                    other
                );
                Ok(Vec::new())
            }
        }
    }

    fn request_display(&mut self) -> Result<String, LaunchError> {
        self.send(&FramedMessage::RequestDisplay)?;
        match self.next_message()? {
            FramedMessage::Display { name } => Ok(name),
            other => {
                log::warn!("expected Display, got out-of-order message {:?}", other);
                Err(LaunchError::Broker("out-of-order reply while awaiting Display".to_string()))
            }
        }
    }
}

fn split_name_value(vars: Vec<String>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|entry| {
            let eq = entry.find('=')?;
            Some((entry[..eq].to_string(), entry[eq + 1..].to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    fn handle(buf: &mut Framed<Cursor<Vec<u8>>>, rx: &Receiver<HelperEvent>) -> ChannelBrokerHandle<'_, Cursor<Vec<u8>>> {
        ChannelBrokerHandle::new(buf, rx)
    }

    #[test]
    fn request_display_sends_and_decodes_the_matching_reply() {
        let (tx, rx) = mpsc::channel();
        tx.send(HelperEvent::Message(FramedMessage::Display { name: ":1".into() })).unwrap();

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let display = handle(&mut writer, &rx).request_display().unwrap();

        assert_eq!(display, ":1");
    }

    #[test]
    fn request_env_splits_name_value_pairs() {
        let (tx, rx) = mpsc::channel();
        tx.send(HelperEvent::Message(FramedMessage::Env {
            vars: vec!["HOME=/home/alice".to_string(), "SHELL=/bin/sh".to_string()],
        }))
        .unwrap();

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let env = handle(&mut writer, &rx).request_env("alice").unwrap();

        assert_eq!(
            env,
            vec![
                ("HOME".to_string(), "/home/alice".to_string()),
                ("SHELL".to_string(), "/bin/sh".to_string()),
            ]
        );
    }

    #[test]
    fn out_of_order_reply_to_request_env_degrades_to_empty() {
        let (tx, rx) = mpsc::channel();
        tx.send(HelperEvent::Message(FramedMessage::SessionId { id: 3 })).unwrap();

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let env = handle(&mut writer, &rx).request_env("alice").unwrap();

        assert!(env.is_empty());
    }

    #[test]
    fn out_of_order_reply_to_request_display_is_an_error() {
        let (tx, rx) = mpsc::channel();
        tx.send(HelperEvent::Message(FramedMessage::SessionId { id: 3 })).unwrap();

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let result = handle(&mut writer, &rx).request_display();

        assert!(result.is_err());
    }

    #[test]
    fn a_stray_session_exit_event_is_skipped_while_awaiting_a_reply() {
        let (tx, rx) = mpsc::channel();
        tx.send(HelperEvent::SessionExited).unwrap();
        tx.send(HelperEvent::Message(FramedMessage::SessionId { id: 5 })).unwrap();

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let id = handle(&mut writer, &rx).request_session_id().unwrap();

        assert_eq!(id, 5);
    }

    #[test]
    fn closed_channel_fails_the_pending_request() {
        let (tx, rx) = mpsc::channel();
        drop(tx);

        let mut writer = Framed::new(Cursor::new(Vec::new()));
        let result = handle(&mut writer, &rx).request_session_id();

        assert!(result.is_err());
    }
}
