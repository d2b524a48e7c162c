//! The launcher's channel back up to the broker, replacing the source's
//! process-wide `AuthenticatorApp::instance()` singleton with an explicit
//! parameter. Implemented over the framed channel by `authd-helper`; a test
//! double backs the unit tests in this crate.

use crate::error::LaunchError;

pub trait BrokerHandle {
    /// `RequestSessionID` — a process-wide monotone counter on the broker
    /// side.
    fn request_session_id(&mut self) -> Result<i32, LaunchError>;

    /// `RequestCookieLink` — asks the broker to materialize its magic
    /// cookie at `path` and chown it to `user`.
    fn request_cookie_link(&mut self, path: &str, user: &str) -> Result<(), LaunchError>;

    /// `RequestEnv` — the display's current session environment, as
    /// assembled by the broker.
    fn request_env(&mut self, user: &str) -> Result<Vec<(String, String)>, LaunchError>;

    /// `RequestDisplay` — the current display's name.
    fn request_display(&mut self) -> Result<String, LaunchError>;
}
