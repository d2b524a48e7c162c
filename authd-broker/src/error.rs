#[derive(thiserror::Error, Debug)]
pub enum BrokerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] authproto::ProtocolError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn helper process: {0}")]
    SpawnFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}
