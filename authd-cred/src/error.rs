/// Failures from the credential engine. Every variant here is fatal to the
/// *current* login attempt but not to the helper process: the caller
/// converts any of these into `LoginFailed` on the wire and keeps running.
#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
    #[error("unknown user")]
    UserUnknown,

    #[error("authentication rejected")]
    AuthRejected,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid C string: {0}")]
    Nul(String),
}

impl From<std::ffi::NulError> for AuthError {
    fn from(e: std::ffi::NulError) -> Self {
        AuthError::Nul(e.to_string())
    }
}
