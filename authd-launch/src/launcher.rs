//! Converts an authenticated `(user, sessionDescriptor)` into a running,
//! privilege-dropped process, per the ten-step algorithm this is grounded
//! on (`auth/Method.cpp`'s `doStart`, `auth/Session.cpp`'s
//! `setupChildProcess`).

use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use nix::unistd::{chdir, execve, fork, initgroups, setgid, setsid, setuid, ForkResult, Gid, Pid, Uid};

use crate::broker_handle::BrokerHandle;
use crate::descriptor::SessionDescriptor;
use crate::environment::compose;
use crate::error::LaunchError;
use crate::identity::UserIdentity;

/// Process-wide configuration the launcher needs; owned by the binary that
/// embeds it and loaded once at startup.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub sessions_dir: PathBuf,
    pub session_command: String,
    pub default_path: String,
    pub seat: String,
    /// When true, the privilege-transition step (step 7) is skipped. For
    /// tests only.
    pub testing_mode: bool,
}

/// Everything resolved before the fork, returned to the caller so it can
/// feed the composed environment back into the credential engine's
/// `putEnv` before the actual fork/exec happens.
pub struct PreparedLaunch {
    pub descriptor: SessionDescriptor,
    pub identity: UserIdentity,
    pub session_name: String,
    pub environment: Vec<(String, String)>,
}

/// A process-handle the launcher owns exclusively: the session's pid.
/// Waiting for and cancelling it is the helper's job (it already reaps
/// through its waiter thread and runs its own SIGTERM/SIGKILL grace period
/// on `End`), so this stays a thin handle rather than duplicating that.
pub struct LaunchedSession {
    pid: Pid,
}

impl LaunchedSession {
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }
}

pub struct SessionLauncher {
    config: LaunchConfig,
}

impl SessionLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        SessionLauncher { config }
    }

    /// Steps 1-6: parse the descriptor, resolve identity, talk to the
    /// broker for env/session-id/cookie-link/display, and compose the
    /// final environment. Does not fork.
    pub fn prepare(
        &self,
        user: &str,
        session: &str,
        provider_env: Vec<(String, String)>,
        broker: &mut impl BrokerHandle,
    ) -> Result<PreparedLaunch, LaunchError> {
        let descriptor = SessionDescriptor::parse(session, &self.config.sessions_dir)?;
        let identity = UserIdentity::resolve(user)?;

        let broker_env = broker.request_env(&identity.name)?;
        let session_id = broker.request_session_id()?;
        let session_name = format!("Session{}", session_id);

        let cookie_path = format!("{}/.Xauthority", identity.home_dir);
        broker.request_cookie_link(&cookie_path, &identity.name)?;

        let display = broker.request_display()?;

        let environment = compose(
            provider_env,
            broker_env,
            &identity,
            &descriptor,
            &display,
            &self.config.default_path,
            &self.config.seat,
            None,
        );

        Ok(PreparedLaunch {
            descriptor,
            identity,
            session_name,
            environment,
        })
    }

    /// Steps 6-8: redirect stderr, fork, drop privileges in the child in
    /// the mandated order, and exec. The parent returns immediately with a
    /// handle to the child.
    pub fn spawn(&self, prepared: &PreparedLaunch) -> Result<LaunchedSession, LaunchError> {
        let identity = &prepared.identity;
        let error_log = format!("{}/.xsession-errors", identity.home_dir);

        let uid = Uid::from_raw(identity.uid);
        let gid = Gid::from_raw(identity.gid);
        let user_c = CString::new(identity.name.as_str())?;
        let home_c = CString::new(identity.home_dir.as_str())?;

        let program_c = CString::new(self.config.session_command.as_str())?;
        let arg_c = CString::new(prepared.descriptor.command.as_str())?;
        let env_c: Vec<CString> = prepared
            .environment
            .iter()
            .map(|(k, v)| CString::new(format!("{}={}", k, v)))
            .collect::<Result<_, _>>()?;

        let testing_mode = self.config.testing_mode;

        match fork().map_err(|e| LaunchError::SpawnFailed(format!("fork: {}", e)))? {
            ForkResult::Parent { child, .. } => Ok(LaunchedSession { pid: child }),
            ForkResult::Child => {
                if !testing_mode {
                    if let Err(e) = initgroups(&user_c, gid) {
                        die(&format!("unable to initialize user groups: {}", e));
                    }
                    if let Err(e) = setsid() {
                        die(&format!("unable to create a new session: {}", e));
                    }
                    if let Err(e) = setgid(gid) {
                        die(&format!("unable to set group id: {}", e));
                    }
                    if let Err(e) = setuid(uid) {
                        die(&format!("unable to set user id: {}", e));
                    }
                    if let Err(e) = chdir(home_c.as_c_str()) {
                        die(&format!("unable to change to home directory: {}", e));
                    }
                }

                if let Ok(file) = OpenOptions::new().create(true).append(true).open(&error_log) {
                    unsafe { libc::dup2(file.as_raw_fd(), libc::STDERR_FILENO) };
                }

                let argv = [program_c.clone(), arg_c];
                match execve(&program_c, &argv, &env_c) {
                    Ok(_) => unreachable!("execve only returns on failure"),
                    Err(e) => die(&format!("unable to exec session command: {}", e)),
                }
            }
        }
    }
}

/// The one deliberate bypass of the `log` facade: by the time privilege
/// transition fails, `.xsession-errors` redirection may already be active
/// and the parent's log sink is not guaranteed reachable, so the failing
/// child writes directly to its inherited stderr before exiting.
fn die(message: &str) -> ! {
    eprintln!("authd-launch: {}", message);
    std::process::exit(libc::EXIT_FAILURE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeBroker {
        calls: RefCell<Vec<&'static str>>,
        session_id: i32,
        display: String,
        reject_cookie: bool,
    }

    impl BrokerHandle for FakeBroker {
        fn request_session_id(&mut self) -> Result<i32, LaunchError> {
            self.calls.borrow_mut().push("request_session_id");
            Ok(self.session_id)
        }

        fn request_cookie_link(&mut self, _path: &str, _user: &str) -> Result<(), LaunchError> {
            self.calls.borrow_mut().push("request_cookie_link");
            if self.reject_cookie {
                Err(LaunchError::CookieLinkRejected)
            } else {
                Ok(())
            }
        }

        fn request_env(&mut self, _user: &str) -> Result<Vec<(String, String)>, LaunchError> {
            self.calls.borrow_mut().push("request_env");
            Ok(vec![])
        }

        fn request_display(&mut self) -> Result<String, LaunchError> {
            self.calls.borrow_mut().push("request_display");
            Ok(self.display.clone())
        }
    }

    fn launcher() -> SessionLauncher {
        SessionLauncher::new(LaunchConfig {
            sessions_dir: std::env::temp_dir(),
            session_command: "/bin/sh".to_string(),
            default_path: "/usr/bin:/bin".to_string(),
            seat: "seat0".to_string(),
            testing_mode: true,
        })
    }

    #[test]
    fn prepare_queries_broker_in_the_documented_order() {
        let mut broker = FakeBroker {
            calls: RefCell::new(vec![]),
            session_id: 7,
            display: ":0".to_string(),
            reject_cookie: false,
        };
        let result = launcher().prepare("root", "xterm", vec![], &mut broker);
        assert!(result.is_ok());
        assert_eq!(
            *broker.calls.borrow(),
            vec![
                "request_env",
                "request_session_id",
                "request_cookie_link",
                "request_display"
            ]
        );
        let prepared = result.unwrap();
        assert_eq!(prepared.session_name, "Session7");
    }

    #[test]
    fn rejected_cookie_link_fails_the_prepare() {
        let mut broker = FakeBroker {
            calls: RefCell::new(vec![]),
            session_id: 1,
            display: ":0".to_string(),
            reject_cookie: true,
        };
        let result = launcher().prepare("root", "xterm", vec![], &mut broker);
        assert!(matches!(result, Err(LaunchError::CookieLinkRejected)));
    }

    #[test]
    fn unknown_session_command_fails_before_any_broker_call() {
        let mut broker = FakeBroker {
            calls: RefCell::new(vec![]),
            session_id: 1,
            display: ":0".to_string(),
            reject_cookie: false,
        };
        let dir = std::env::temp_dir().join("authd-launch-test-missing-desktop");
        let l = SessionLauncher::new(LaunchConfig {
            sessions_dir: dir,
            session_command: "/bin/sh".to_string(),
            default_path: "/usr/bin".to_string(),
            seat: "seat0".to_string(),
            testing_mode: true,
        });
        let result = l.prepare("root", "broken.desktop", vec![], &mut broker);
        assert!(matches!(result, Err(LaunchError::ConfigMissing)));
        assert!(broker.calls.borrow().is_empty());
    }
}
