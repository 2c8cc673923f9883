use std::{
    net::SocketAddr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use log::{debug, trace};
use tokio::{io::AsyncWriteExt, net::TcpStream, time::timeout};

use crate::{
    client::Response,
    config::Config,
    error::{RconError, Result},
    packet::{Packet, PacketType, MAX_COMMAND_LEN},
    reassembler::Reassembler,
};

/// One authenticated rcon connection.
///
/// Every operation takes `&mut self`, so a session has exactly one reader and
/// one writer at a time. Share it through [Client](crate::client::Client) if
/// several tasks need to run commands.
pub struct Session {
    stream: TcpStream,
    reassembler: Reassembler,
    request_ids: RequestIds,
    config: Config,
}

impl Session {
    /// Dials `host`, sends `password` and waits up to `auth_timeout` for the
    /// server to accept it. All other deadlines use [Config::default].
    pub async fn open(host: &str, password: &str, auth_timeout: Duration) -> Result<Self> {
        Self::open_with(
            host,
            password,
            Config::default().with_auth_timeout(auth_timeout),
        )
        .await
    }

    pub async fn open_with(host: &str, password: &str, config: Config) -> Result<Self> {
        let stream = timeout(config.dial_timeout, TcpStream::connect(host))
            .await?
            .map_err(RconError::UnreachableHost)?;

        trace!("opened tcp stream to {}, attempting auth", host);

        let mut session = Session {
            stream,
            reassembler: Reassembler::new(),
            request_ids: RequestIds::new(),
            config,
        };

        let auth_id = session.write_packet(PacketType::Auth, password).await?;
        session.authenticate(auth_id).await?;

        trace!("auth complete");
        Ok(session)
    }

    async fn authenticate(&mut self, auth_id: i32) -> Result<()> {
        let deadline = self.config.auth_timeout;
        let mut response = self.read_packet(deadline).await?;

        // some servers send an empty response value right before the auth
        // response, so allow for one extra packet
        if response.packet_type() != &PacketType::AuthResponse {
            debug!(
                "expected auth response, got {:?}; reading again",
                response.packet_type()
            );
            response = self.read_packet(deadline).await?;
        }

        if response.packet_type() != &PacketType::AuthResponse {
            return Err(RconError::InvalidAuthResponse(
                response.packet_type().value(),
            ));
        }
        if response.id() != auth_id {
            debug!("auth response id {} != {}", response.id(), auth_id);
            return Err(RconError::AuthFailed);
        }
        Ok(())
    }

    /// Sends `command` and returns the request id the response will carry.
    pub async fn write(&mut self, command: &str) -> Result<i32> {
        self.write_packet(PacketType::Exec, command).await
    }

    async fn write_packet(&mut self, packet_type: PacketType, body: &str) -> Result<i32> {
        if body.len() > MAX_COMMAND_LEN {
            return Err(RconError::CommandTooLong(body.len()));
        }

        let id = self.request_ids.next();
        let bytes = Packet::new(id, packet_type, body).pack()?;

        timeout(self.config.write_timeout, self.stream.write_all(&bytes))
            .await?
            .map_err(RconError::SendError)?;

        trace!("sent {:?} packet with id {}", packet_type, id);
        Ok(id)
    }

    /// Waits for the next packet from the server.
    ///
    /// Anything that isn't a response value comes back as an empty response
    /// with id 0 instead of an error.
    pub async fn read(&mut self) -> Result<Response> {
        let (id, body) = self.read_body().await?;
        Ok(Response::from_bytes(id, &body))
    }

    /// Like [Session::read], but hands back the raw body so fragments can be
    /// joined before they are decoded.
    pub(crate) async fn read_body(&mut self) -> Result<(i32, Bytes)> {
        let packet = self.read_packet(self.config.read_timeout).await?;

        match *packet.packet_type() {
            PacketType::Response => Ok((packet.id(), packet.into_body())),
            other => {
                trace!("ignoring {:?} packet with id {}", other, packet.id());
                Ok((0, Bytes::new()))
            }
        }
    }

    async fn read_packet(&mut self, deadline: Duration) -> Result<Packet> {
        let packet = timeout(
            deadline,
            self.reassembler.read_packet(&mut self.stream),
        )
        .await??;

        trace!(
            "received {:?} packet with id {} ({} bytes)",
            packet.packet_type(),
            packet.id(),
            packet.body().len()
        );
        Ok(packet)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Shuts the connection down. The session can't be used afterwards.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(RconError::SendError)
    }
}

/// Request ids handed out by a [Session].
///
/// Starts out at a sentinel that no regular id can take. The first id is
/// derived from the clock, every id after that is the previous one plus one.
/// Ids never leave the low 28 bits; running past them reseeds.
struct RequestIds {
    current: i32,
}

impl RequestIds {
    const SENTINEL: i32 = 0x7fff_ffff;
    const MASK: i32 = 0x0fff_ffff;

    fn new() -> Self {
        RequestIds {
            current: Self::SENTINEL,
        }
    }

    fn next(&mut self) -> i32 {
        let candidate = self.current.wrapping_add(1);
        self.current = if self.current & Self::MASK != self.current
            || candidate & Self::MASK != candidate
        {
            Self::seed()
        } else {
            candidate
        };
        self.current
    }

    fn seed() -> i32 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        ((nanos / 100_000) % 100_000) as i32
    }
}
