//! The framed wire protocol between the session broker and its
//! authenticator helper: a closed set of messages (see [`message`]), a
//! length-prefixed binary codec (see [`wire`]), and two framing front ends —
//! a blocking one for the single-threaded helper ([`sync`]) and an async one
//! for the broker's readiness loop ([`nonblocking`]).

pub mod message;

#[cfg(feature = "codec")]
pub mod error;
#[cfg(feature = "codec")]
pub mod wire;

#[cfg(feature = "sync-codec")]
pub mod sync;

#[cfg(feature = "tokio-codec")]
pub mod nonblocking;

pub use message::FramedMessage;

#[cfg(feature = "codec")]
pub use error::ProtocolError;
