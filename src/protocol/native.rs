//! Native messaging framing.
//!
//! Each message is a 4-byte little-endian length followed by that many bytes
//! of UTF-8 JSON.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{PagesmithError, Result};

/// Read one message. Returns `Ok(None)` on a clean end of stream.
///
/// A payload that is not JSON yields [`PagesmithError::MalformedMessage`]
/// after the whole frame has been consumed, so the caller may keep reading.
/// Every other error leaves the stream out of sync.
pub async fn read_message<R>(reader: &mut R, max_len: usize) -> Result<Option<serde_json::Value>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        let n = reader.read(&mut len_bytes[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(PagesmithError::ProtocolError(format!(
                "Stream ended inside a message header ({} of 4 bytes)",
                filled
            )));
        }
        filled += n;
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > max_len {
        return Err(PagesmithError::ProtocolError(format!(
            "Message too large: {} bytes (limit {})",
            len, max_len
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    serde_json::from_slice(&buf)
        .map(Some)
        .map_err(|e| PagesmithError::MalformedMessage(e.to_string()))
}

/// Write one message and flush it.
pub async fn write_message<W>(writer: &mut W, msg: &serde_json::Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(msg)?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        PagesmithError::ProtocolError(format!("Message too large: {} bytes", payload.len()))
    })?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
