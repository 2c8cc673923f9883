//! Encoding and decoding of single rcon packets.
//!
//! ```text
//! | size (i32) | id (i32) | type (i32) | body ... | 0x00 | 0x00 |
//! ```
//!
//! All integers are little-endian and `size` counts every byte after itself.
use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes};

use crate::error::{RconError, Result};

/// Size of the length prefix in front of every packet.
pub const SIZE_PREFIX_LEN: usize = 4;

/// Largest command body we will put into a single request.
pub const MAX_COMMAND_LEN: usize = 1024 - Packet::BASE_PACKET_SIZE as usize;

/// Largest body a server is allowed to put into a single response.
pub const MAX_RESPONSE_BODY_LEN: usize = 4096;

/// Largest `size` field we accept from a server.
pub const MAX_PACKET_SIZE: i32 = Packet::BASE_PACKET_SIZE + MAX_RESPONSE_BODY_LEN as i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
    /// Anything else a server might send us.
    Unknown(i32),
}

impl PacketType {
    pub fn value(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
            PacketType::Unknown(value) => *value,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.value().to_le_bytes()
    }

    /// Interprets a type field received from the server. `Exec` and
    /// `AuthResponse` share the value 2, and servers only ever send the latter.
    pub fn from_response(value: i32) -> Self {
        match value {
            3 => PacketType::Auth,
            2 => PacketType::AuthResponse,
            0 => PacketType::Response,
            other => PacketType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: Bytes,
}

impl Packet {
    /// id + type + body terminator + empty second string.
    pub const BASE_PACKET_SIZE: i32 = 10;

    pub fn new(id: i32, packet_type: PacketType, body: impl AsRef<[u8]>) -> Self {
        Packet {
            id,
            packet_type,
            body: Bytes::copy_from_slice(body.as_ref()),
        }
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as text. Servers are not strict about encodings, so invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Encodes the packet including its size prefix.
    pub fn pack(&self) -> Result<Vec<u8>> {
        if self.body.len() > MAX_COMMAND_LEN {
            return Err(RconError::CommandTooLong(self.body.len()));
        }

        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::<u8>::with_capacity(SIZE_PREFIX_LEN + self.size() as usize);
        payload.put_i32_le(self.size());
        payload.put_i32_le(self.id);
        payload.put_slice(&self.packet_type.to_le_bytes());
        payload.put_slice(&self.body);
        // null terminate the body, then the (always empty) second string
        payload.put_slice(&[0u8, 0u8]);
        Ok(payload)
    }

    /// Decodes one packet from everything that followed its size prefix.
    ///
    /// The body runs up to the first NUL byte. A payload missing its
    /// terminator is tolerated and the remaining bytes are taken as-is.
    pub fn unpack(payload: &[u8]) -> Result<Self> {
        if payload.len() < 8 {
            return Err(RconError::UnexpectedFormat(payload.len() as i32));
        }

        let mut cursor = payload;
        let id = cursor.get_i32_le();
        let packet_type = PacketType::from_response(cursor.get_i32_le());
        let body = match cursor.iter().position(|&b| b == 0) {
            Some(end) => &cursor[..end],
            None => cursor,
        };

        Ok(Packet::new(id, packet_type, body))
    }
}
