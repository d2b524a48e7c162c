//! The contract toward the external login-service bus (out of scope here:
//! only `AddSession`/`RemoveSession`/`seatPath`/`sessionPath` are modeled,
//! not the real D-Bus transport).

pub trait LoginServiceClient {
    fn add_session(&mut self, session_name: &str, seat_name: &str, user_name: &str);
    fn remove_session(&mut self, session_name: &str);
    fn seat_path(&self, seat_name: &str) -> String;
    fn session_path(&self, session_name: &str) -> String;
}

/// The shipped implementation: logs every call instead of dialing the real
/// bus. Good enough to exercise registration parity in tests and to run
/// the broker standalone without a functioning login1/logind.
#[derive(Debug, Default)]
pub struct LoggingLoginServiceClient;

impl LoginServiceClient for LoggingLoginServiceClient {
    fn add_session(&mut self, session_name: &str, seat_name: &str, user_name: &str) {
        log::info!(
            "login service: AddSession({}, {}, {})",
            session_name,
            seat_name,
            user_name
        );
    }

    fn remove_session(&mut self, session_name: &str) {
        log::info!("login service: RemoveSession({})", session_name);
    }

    fn seat_path(&self, seat_name: &str) -> String {
        format!("/org/freedesktop/DisplayManager/{}", seat_name)
    }

    fn session_path(&self, session_name: &str) -> String {
        format!("/org/freedesktop/DisplayManager/{}", session_name)
    }
}
