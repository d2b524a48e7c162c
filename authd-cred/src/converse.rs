use zeroize::Zeroizing;

/// What the credential provider's conversation callback is allowed to ask
/// for, and how we answer it. The PAM FFI glue in [`crate::pam::ffi`] is the
/// only caller; this trait exists so that boundary can be tested without a
/// real PAM stack.
pub trait Converse {
    /// An echo-off prompt (conventionally: "Password:"). Implementations
    /// hand back the buffered secret and must not be callable twice in a
    /// row with the same secret still present.
    fn prompt_blind(&self, msg: &str) -> Result<String, ConverseError>;

    /// An echo-on prompt (conventionally: "Login:"). Some PAM modules ask
    /// for the user name back even though the caller already supplied it.
    fn prompt_echo(&self, msg: &str) -> Result<String, ConverseError>;

    /// An informational message to surface to the log, not to the user.
    fn info(&self, msg: &str) -> Result<(), ConverseError>;

    /// An error message to surface to the log.
    fn error(&self, msg: &str) -> Result<(), ConverseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverseError;

/// The conversation context bound to one login attempt: the username and
/// password as supplied in the `Start` message, each handed out exactly
/// once and zeroized immediately after.
///
/// Under `passwordless`, every real prompt (echo-on or echo-off) fails the
/// conversation; only informational/error messages are accepted, per the
/// credential engine's authentication contract.
pub struct LoginConverse {
    user: std::cell::RefCell<Option<Zeroizing<String>>>,
    password: std::cell::RefCell<Option<Zeroizing<String>>>,
    passwordless: bool,
}

impl LoginConverse {
    pub fn new(user: impl Into<String>, password: impl Into<String>, passwordless: bool) -> Self {
        LoginConverse {
            user: std::cell::RefCell::new(Some(Zeroizing::new(user.into()))),
            password: std::cell::RefCell::new(Some(Zeroizing::new(password.into()))),
            passwordless,
        }
    }
}

impl Converse for LoginConverse {
    fn prompt_blind(&self, _msg: &str) -> Result<String, ConverseError> {
        if self.passwordless {
            return Err(ConverseError);
        }
        self.password.borrow_mut().take().map(|p| p.to_string()).ok_or(ConverseError)
    }

    fn prompt_echo(&self, _msg: &str) -> Result<String, ConverseError> {
        if self.passwordless {
            return Err(ConverseError);
        }
        self.user.borrow_mut().take().map(|u| u.to_string()).ok_or(ConverseError)
    }

    fn info(&self, msg: &str) -> Result<(), ConverseError> {
        log::info!("credential provider: {}", msg);
        Ok(())
    }

    fn error(&self, msg: &str) -> Result<(), ConverseError> {
        log::warn!("credential provider: {}", msg);
        Ok(())
    }
}
