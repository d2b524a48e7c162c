//! Owns the helper's side of the framed channel, answers its requests, and
//! routes `LoginSucceeded`/`LoginFailed` back to whoever called `start`.
//! Generic over the transport so the dispatcher can be driven by a real
//! child process's stdio or, in tests, by an in-memory duplex pair.

use authproto::{FramedMessage, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;

use crate::config::Config;
use crate::display::DisplayContext;
use crate::error::BrokerError;
use crate::login_service::LoginServiceClient;
use crate::registry::{SessionRecord, SessionRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Succeeded(SessionRecord),
    Failed,
}

pub struct Broker<R, W, L> {
    reader: R,
    writer: W,
    display: DisplayContext,
    registry: SessionRegistry,
    login_service: L,
    config: Config,
    pending_login: Option<oneshot::Sender<LoginOutcome>>,
    current_session: Option<String>,
    last_allocated_id: Option<i32>,
}

impl<R, W, L> Broker<R, W, L>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    L: LoginServiceClient,
{
    pub fn new(reader: R, writer: W, display: DisplayContext, login_service: L, config: Config) -> Self {
        Broker {
            reader,
            writer,
            display,
            registry: SessionRegistry::new(),
            login_service,
            config,
            pending_login: None,
            current_session: None,
            last_allocated_id: None,
        }
    }

    /// Sends `Start` and records `reply` so the eventual `LoginSucceeded`
    /// or `LoginFailed` can be routed back to the caller.
    pub async fn start(
        &mut self,
        user: &str,
        session: &str,
        password: &str,
        passwordless: bool,
        reply: oneshot::Sender<LoginOutcome>,
    ) -> Result<(), BrokerError> {
        self.pending_login = Some(reply);
        authproto::nonblocking::send(
            &mut self.writer,
            &FramedMessage::Start {
                user: user.to_string(),
                session: session.to_string(),
                password: password.to_string(),
                passwordless,
            },
        )
        .await?;
        Ok(())
    }

    /// Sends `End` and unregisters the current session, if any.
    pub async fn stop(&mut self) -> Result<(), BrokerError> {
        authproto::nonblocking::send(&mut self.writer, &FramedMessage::End).await?;
        if let Some(name) = self.current_session.take() {
            self.login_service.remove_session(&name);
            self.registry.remove(&name);
        }
        Ok(())
    }

    /// Services exactly one message from the helper. `Ok(false)` means the
    /// channel is done — either the helper exited, or the broker itself
    /// refused a request and is closing its end — and the caller should
    /// stop driving the loop and treat any in-flight login as failed.
    pub async fn dispatch_one(&mut self) -> Result<bool, BrokerError> {
        let msg = match authproto::nonblocking::receive(&mut self.reader).await {
            Ok(m) => m,
            Err(ProtocolError::ChannelClosed) => {
                if let Some(tx) = self.pending_login.take() {
                    let _ = tx.send(LoginOutcome::Failed);
                }
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        self.handle(msg).await
    }

    /// Returns `Ok(false)` when the channel should be torn down instead of
    /// answered — a materialize-cookie refusal must never reach the helper
    /// as a `CookieLink` reply, since that would let the session proceed
    /// with a missing or wrongly-owned cookie file.
    async fn handle(&mut self, msg: FramedMessage) -> Result<bool, BrokerError> {
        match msg {
            FramedMessage::RequestEnv { user } => {
                log::debug!("RequestEnv({})", user);
                let vars = self.display.session_env_lines();
                authproto::nonblocking::send(&mut self.writer, &FramedMessage::Env { vars }).await?;
            }
            FramedMessage::RequestSessionId => {
                let id = self.registry.allocate_id();
                self.last_allocated_id = Some(id);
                authproto::nonblocking::send(&mut self.writer, &FramedMessage::SessionId { id }).await?;
            }
            FramedMessage::RequestCookieLink { path, user } => {
                let materialized = match users::get_user_by_name(&user) {
                    Some(pw) => self
                        .display
                        .materialize_cookie(&path, pw.uid(), pw.primary_group_id())
                        .map_err(|e| e.to_string()),
                    None => Err(format!("unknown user {}", user)),
                };
                match materialized {
                    Ok(()) => {
                        authproto::nonblocking::send(&mut self.writer, &FramedMessage::CookieLink).await?;
                    }
                    Err(e) => {
                        log::error!("refusing cookie link at {} for {}: {}", path, user, e);
                        if let Some(tx) = self.pending_login.take() {
                            let _ = tx.send(LoginOutcome::Failed);
                        }
                        return Ok(false);
                    }
                }
            }
            FramedMessage::RequestDisplay => {
                authproto::nonblocking::send(
                    &mut self.writer,
                    &FramedMessage::Display { name: self.display.name.clone() },
                )
                .await?;
            }
            FramedMessage::LoginFailed => {
                if let Some(tx) = self.pending_login.take() {
                    let _ = tx.send(LoginOutcome::Failed);
                }
            }
            FramedMessage::LoginSucceeded { session_name, user } => {
                let id = self.last_allocated_id.take().unwrap_or(0);
                let record = SessionRecord {
                    id,
                    name: session_name.clone(),
                    seat_name: self.config.seat.clone(),
                    user_name: user.clone(),
                };
                self.login_service
                    .add_session(&record.name, &record.seat_name, &record.user_name);
                self.registry.insert(record.clone());
                self.current_session = Some(session_name);
                if let Some(tx) = self.pending_login.take() {
                    let _ = tx.send(LoginOutcome::Succeeded(record));
                }
            }
            other => log::warn!("unhandled message from helper: {:?}", other),
        }
        Ok(true)
    }
}
