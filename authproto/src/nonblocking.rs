//! Async framing, used by `authd-broker`: the broker never blocks waiting on
//! the helper — it reacts when bytes arrive on the child's stdout/stdin
//! pipes, which Tokio already gives us a readiness-driven reader/writer for.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::message::FramedMessage;
use crate::wire::{decode_payload, encode_payload};

/// Writes one message to `out`, length-prefixed exactly like the blocking
/// codec in [`crate::sync`].
pub async fn send<W: AsyncWrite + Unpin>(out: &mut W, msg: &FramedMessage) -> Result<(), ProtocolError> {
    let mut buf = Vec::new();
    encode_payload(msg, &mut buf);
    out.write_all(&(buf.len() as u32).to_be_bytes()).await?;
    out.write_all(&buf).await?;
    out.flush().await?;
    Ok(())
}

/// Reads one message from `input`. `AsyncReadExt::read_exact` already loops
/// over partial reads for us; it surfaces a clean EOF as
/// `io::ErrorKind::UnexpectedEof`, which we fold into [`ProtocolError::ChannelClosed`].
pub async fn receive<R: AsyncRead + Unpin>(input: &mut R) -> Result<FramedMessage, ProtocolError> {
    let mut header = [0u8; 4];
    read_exact_or_closed(input, &mut header).await?;
    let len = u32::from_be_bytes(header) as usize;

    let mut body = vec![0u8; len];
    read_exact_or_closed(input, &mut body).await?;

    if body.len() < 4 {
        return Err(ProtocolError::Malformed("frame shorter than a tag".into()));
    }
    let tag = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
    decode_payload(tag, &body[4..])
}

async fn read_exact_or_closed<R: AsyncRead + Unpin>(input: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    match input.read_exact(buf).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ProtocolError::ChannelClosed),
        Err(e) => Err(e.into()),
    }
}
