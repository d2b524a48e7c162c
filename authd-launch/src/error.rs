#[derive(thiserror::Error, Debug, Clone)]
pub enum LaunchError {
    #[error("session descriptor names no command")]
    ConfigMissing,

    #[error("unknown user")]
    UserUnknown,

    #[error("broker refused to link the authority cookie")]
    CookieLinkRejected,

    #[error("failed to drop privileges: {0}")]
    PrivilegeDropFailed(String),

    #[error("failed to start session process: {0}")]
    SpawnFailed(String),

    #[error("broker request failed: {0}")]
    Broker(String),
}

impl From<std::ffi::NulError> for LaunchError {
    fn from(e: std::ffi::NulError) -> Self {
        LaunchError::SpawnFailed(format!("invalid C string: {}", e))
    }
}
