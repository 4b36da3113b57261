use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::HeaderEncoder;
use crate::protocol::{ResponseHead, SendError};

/// Writes the response head and flushes.
pub async fn write_head<W>(writer: &mut W, head: &ResponseHead) -> Result<(), SendError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_response(writer, head, &[]).await
}

/// Writes the response head followed by `body` in one buffer and flushes.
pub async fn write_response<W>(writer: &mut W, head: &ResponseHead, body: &[u8]) -> Result<(), SendError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = BytesMut::with_capacity(body.len() + 128);
    HeaderEncoder.encode(head, &mut buffer)?;
    buffer.extend_from_slice(body);

    writer.write_all(&buffer).await?;
    Ok(writer.flush().await?)
}
