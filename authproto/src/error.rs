use std::io;

/// Everything that can go wrong turning bytes into a [`crate::FramedMessage`]
/// or back, short of the transport itself going away (see `ChannelClosed`,
/// which callers synthesize from an `io::ErrorKind::UnexpectedEof`).
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("the peer went away")]
    ChannelClosed,

    #[error("unknown message tag: {0}")]
    UnknownTag(u32),

    #[error("malformed message body: {0}")]
    Malformed(String),

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
}

impl From<std::string::FromUtf8Error> for ProtocolError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        ProtocolError::InvalidUtf8
    }
}
