#[derive(thiserror::Error, Debug)]
pub enum HelperError {
    #[error("credential engine: {0}")]
    Auth(#[from] authd_cred::AuthError),

    #[error("session launcher: {0}")]
    Launch(#[from] authd_launch::LaunchError),

    #[error("protocol error: {0}")]
    Protocol(#[from] authproto::ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("broker channel closed")]
    ChannelClosed,
}
