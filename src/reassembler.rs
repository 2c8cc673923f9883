//! Rebuilds whole packets from a TCP stream.
//!
//! A single read can return less than a packet, exactly one, or one packet
//! followed by the start of the next. Bytes past the end of the current
//! packet stay in the buffer and are consumed by the next call before the
//! socket is touched again.
use bytes::{Buf, BytesMut};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::{RconError, Result},
    packet::{Packet, MAX_PACKET_SIZE, SIZE_PREFIX_LEN},
};

/// Size prefix + the largest packet a server may send.
pub const READ_BUFFER_SIZE: usize = SIZE_PREFIX_LEN + MAX_PACKET_SIZE as usize;

pub struct Reassembler {
    buffer: BytesMut,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler {
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Bytes already received that belong to packets not yet returned.
    pub fn queued(&self) -> usize {
        self.buffer.len()
    }

    /// Reads exactly one packet from `reader`.
    ///
    /// Cancel safe: if the future is dropped while waiting on the socket,
    /// every byte received so far stays queued for the next call.
    pub async fn read_packet<R>(&mut self, reader: &mut R) -> Result<Packet>
    where
        R: AsyncRead + Unpin,
    {
        if self.buffer.is_empty() {
            self.fill(reader).await?;
        } else {
            trace!("reusing {} queued bytes", self.buffer.len());
        }

        // need the whole size prefix before anything else
        while self.buffer.len() < SIZE_PREFIX_LEN {
            self.fill(reader).await?;
        }

        let mut prefix = &self.buffer[..SIZE_PREFIX_LEN];
        let size = prefix.get_i32_le();
        // a bad prefix means we lost track of packet boundaries; drop what
        // we have instead of failing on the same bytes again next call
        if size < Packet::BASE_PACKET_SIZE {
            self.buffer.clear();
            return Err(RconError::UnexpectedFormat(size));
        }
        if size > MAX_PACKET_SIZE {
            self.buffer.clear();
            return Err(RconError::ResponseTooLong(size));
        }

        let total = SIZE_PREFIX_LEN + size as usize;
        while self.buffer.len() < total {
            self.fill(reader).await?;
        }

        let frame = self.buffer.split_to(total);
        if !self.buffer.is_empty() {
            trace!("queued {} bytes of the next packet", self.buffer.len());
        }

        Packet::unpack(&frame[SIZE_PREFIX_LEN..])
    }

    /// One socket read appended to the buffer, never past `READ_BUFFER_SIZE`.
    async fn fill<R>(&mut self, reader: &mut R) -> Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        let room = READ_BUFFER_SIZE - self.buffer.len();
        self.buffer.reserve(room);

        let read = (&mut *reader)
            .take(room as u64)
            .read_buf(&mut self.buffer)
            .await
            .map_err(RconError::ReceiveError)?;

        if read == 0 {
            return Err(RconError::ReceiveError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by host",
            )));
        }

        trace!("read {} bytes, {} buffered", read, self.buffer.len());
        Ok(read)
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
