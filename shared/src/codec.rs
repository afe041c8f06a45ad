//! Length-prefixed bincode framing over any ordered byte stream.
//!
//! Each frame is a big-endian `u32` payload length followed by the
//! bincode-encoded `Packet`.

use crate::protocol::Packet;
use bincode::{deserialize, serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in either direction.
pub const MAX_FRAME_LEN: usize = 2048;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed packet: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let data = serialize(packet)?;
    if data.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(data.len()));
    }

    writer.write_u32(data.len() as u32).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next packet. `Ok(None)` means the peer closed the stream on a
/// frame boundary; a stream that ends mid-frame is an error.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<Packet>, CodecError>
where
    R: AsyncRead + Unpin,
{
    // Only an end of stream before the first prefix byte is a clean close.
    let mut prefix = [0u8; 4];
    let read = reader.read(&mut prefix).await?;
    if read == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut prefix[read..]).await?;
    let len = u32::from_be_bytes(prefix) as usize;

    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(deserialize::<Packet>(&buffer)?))
}
