//! The authenticator helper: a short-lived child spawned once per display,
//! driving the credential engine and the session launcher in lockstep over
//! the framed channel it inherits as stdin/stdout.
//!
//! Grounded on `auth/Method.cpp`'s `doStart`/`stop`: parse the session
//! descriptor before touching the provider, run the credential ordering
//! contract up through `acctMgmt`, resolve identity and compose the
//! environment, then establish/open/reinitialize credentials and fork.
//! Every exit path — success, failure, or `End` — tears the credential
//! transaction down through `CredentialEngine`'s `Drop`.

mod broker_handle;
mod config;
mod error;
mod events;

use std::sync::mpsc;
use std::time::{Duration, Instant};

use authd_cred::{CredAction, CredentialEngine};
use authd_launch::{BrokerHandle, LaunchConfig, PreparedLaunch, SessionDescriptor, SessionLauncher};
use authproto::{sync::Framed, FramedMessage};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use broker_handle::ChannelBrokerHandle;
use config::Config;
use error::HelperError;
use events::HelperEvent;

const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// A session that succeeded and is currently running: the credential
/// transaction (torn down on `Drop`) and the child's pid.
///
/// `'static` because `LoginConverse` owns its username/password outright —
/// the conversation callback never borrows from the caller.
struct ActiveSession {
    engine: CredentialEngine<'static>,
    pid: i32,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::load(&args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let launcher = SessionLauncher::new(LaunchConfig {
        sessions_dir: config.sessions_dir.clone(),
        session_command: config.session_command.clone(),
        default_path: config.default_path.clone(),
        seat: config.seat.clone(),
        testing_mode: config.testing_mode,
    });

    let (tx, rx) = mpsc::channel();
    events::spawn_reader(tx.clone());

    let mut writer = Framed::new(std::io::stdout());
    let mut current: Option<ActiveSession> = None;

    loop {
        let event = match rx.recv() {
            Ok(e) => e,
            Err(_) => break,
        };

        match event {
            HelperEvent::ChannelClosed => {
                log::info!("broker channel closed, exiting");
                break;
            }
            HelperEvent::SessionExited => {
                if let Some(session) = current.take() {
                    log::info!("session process {} exited on its own", session.pid);
                    drop(session.engine);
                }
            }
            HelperEvent::Message(FramedMessage::Start {
                user,
                session,
                password,
                passwordless,
            }) => {
                if current.is_some() {
                    log::warn!("Start received while a session is already active; rejecting");
                    let _ = writer.send(&FramedMessage::LoginFailed);
                    continue;
                }

                let outcome = handle_start(&config, &launcher, &mut writer, &rx, &user, &session, &password, passwordless);

                match outcome {
                    Ok((engine, pid, session_name, mapped_user)) => {
                        events::spawn_waiter(pid, tx.clone());
                        current = Some(ActiveSession { engine, pid });
                        let _ = writer.send(&FramedMessage::LoginSucceeded {
                            session_name,
                            user: mapped_user,
                        });
                    }
                    Err(e) => {
                        log::warn!("login failed for {}: {}", user, e);
                        let _ = writer.send(&FramedMessage::LoginFailed);
                    }
                }
            }
            HelperEvent::Message(FramedMessage::End) => {
                if let Some(session) = current.take() {
                    terminate_and_wait(session.pid, &rx);
                    drop(session.engine);
                } else {
                    log::debug!("End received with no active session");
                }
            }
            HelperEvent::Message(other) => {
                log::warn!("unexpected message from broker: {:?}", other);
            }
        }
    }
}

/// Runs one `Start` attempt to completion: descriptor parse, the credential
/// ordering contract through `acctMgmt`, environment composition, then
/// `setCred`/`openSession`/`setCred` and the fork/exec. On any failure the
/// partially-built `CredentialEngine` (if any) is simply dropped by the
/// caller's `?`, which runs its teardown.
#[allow(clippy::too_many_arguments)]
fn handle_start(
    config: &Config,
    launcher: &SessionLauncher,
    writer: &mut Framed<std::io::Stdout>,
    rx: &mpsc::Receiver<HelperEvent>,
    user: &str,
    session: &str,
    password: &str,
    passwordless: bool,
) -> Result<(CredentialEngine<'static>, i32, String, String), HelperError> {
    // Scenario: an empty Exec= line fails the attempt before the provider
    // is ever touched.
    SessionDescriptor::parse(session, &config.sessions_dir)?;

    let mut engine = CredentialEngine::begin(&config.service_name, user, password, passwordless)?;

    let mut broker = ChannelBrokerHandle::new(writer, rx);
    let display = broker.request_display()?;
    engine.set_tty(&display)?;
    engine.set_x_display(&display)?;
    engine.set_user(user)?;
    engine.authenticate()?;

    let mapped_user = engine.get_user()?.unwrap_or_else(|| user.to_string());
    engine.acct_mgmt()?;

    let provider_env = engine.env();
    let prepared: PreparedLaunch = launcher.prepare(&mapped_user, session, provider_env, &mut broker)?;
    engine.put_env(&prepared.environment)?;

    engine.set_cred(CredAction::Establish)?;
    engine.open_session()?;
    engine.set_cred(CredAction::Reinitialize)?;

    let launched = launcher.spawn(&prepared)?;
    let session_name = prepared.session_name.clone();

    Ok((engine, launched.pid(), session_name, mapped_user))
}

/// `End` handling: SIGTERM, then SIGKILL after the grace period, observed
/// through the dedicated waiter thread's `SessionExited` event rather than
/// calling `waitpid` here directly (only one thread ever reaps a pid).
fn terminate_and_wait(pid: i32, rx: &mpsc::Receiver<HelperEvent>) {
    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        log::warn!("SIGTERM to {} failed: {}", pid, e);
    }

    let deadline = Instant::now() + TERMINATE_GRACE;
    let mut killed = false;
    loop {
        let now = Instant::now();
        if !killed && now >= deadline {
            if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGKILL) {
                log::warn!("SIGKILL to {} failed: {}", pid, e);
            }
            killed = true;
        }
        let wait_for = if killed {
            Duration::from_secs(30)
        } else {
            deadline.saturating_duration_since(now).max(Duration::from_millis(20))
        };
        match rx.recv_timeout(wait_for) {
            Ok(HelperEvent::SessionExited) => return,
            Ok(HelperEvent::ChannelClosed) => return,
            Ok(HelperEvent::Message(msg)) => {
                log::warn!("message {:?} arrived while tearing down a session, ignoring", msg);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}
