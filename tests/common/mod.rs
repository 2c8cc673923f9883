//! In-process rcon server for integration tests.
#![allow(dead_code)]

use std::future::Future;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

pub const RESPONSE_VALUE: i32 = 0;
pub const EXEC_COMMAND: i32 = 2;
pub const AUTH_RESPONSE: i32 = 2;
pub const AUTH: i32 = 3;

pub const PASSWORD: &str = "blerg";

#[derive(Debug)]
pub struct RawPacket {
    pub id: i32,
    pub packet_type: i32,
    pub body: Vec<u8>,
}

/// Wire bytes for one packet, size prefix included.
pub fn frame(id: i32, packet_type: i32, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(14 + body.len());
    bytes.extend_from_slice(&(10 + body.len() as i32).to_le_bytes());
    bytes.extend_from_slice(&id.to_le_bytes());
    bytes.extend_from_slice(&packet_type.to_le_bytes());
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

pub async fn read_packet(stream: &mut TcpStream) -> std::io::Result<RawPacket> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await?;
    let size = i32::from_le_bytes(prefix) as usize;

    let mut payload = vec![0u8; size];
    stream.read_exact(&mut payload).await?;

    Ok(RawPacket {
        id: i32::from_le_bytes(payload[0..4].try_into().unwrap()),
        packet_type: i32::from_le_bytes(payload[4..8].try_into().unwrap()),
        body: payload[8..size - 2].to_vec(),
    })
}

/// Accepts one connection and hands it to `handler` untouched.
pub async fn start<F, Fut>(handler: F) -> String
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            handler(stream).await;
        }
    });

    addr
}

/// Accepts one connection, answers its auth packet like srcds would (echoing
/// the id for the right password, -1 otherwise) and then runs `handler`.
pub async fn start_authenticated<F, Fut>(handler: F) -> String
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    start(move |mut stream| async move {
        let auth = match read_packet(&mut stream).await {
            Ok(packet) => packet,
            Err(_) => return,
        };
        assert_eq!(auth.packet_type, AUTH);

        let id = if auth.body == PASSWORD.as_bytes() { auth.id } else { -1 };
        stream
            .write_all(&frame(id, AUTH_RESPONSE, b""))
            .await
            .unwrap();

        handler(stream).await;
    })
    .await
}

/// Answers every command with `respond(body)` under the command's id until
/// the client goes away.
pub async fn serve_commands<F>(mut stream: TcpStream, respond: F)
where
    F: Fn(&str) -> Vec<u8>,
{
    while let Ok(packet) = read_packet(&mut stream).await {
        assert_eq!(packet.packet_type, EXEC_COMMAND);
        let body = respond(&String::from_utf8_lossy(&packet.body));
        if stream
            .write_all(&frame(packet.id, RESPONSE_VALUE, &body))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Keeps the connection open until the client closes it.
pub async fn wait_for_close(mut stream: TcpStream) {
    let mut buf = [0u8; 64];
    while let Ok(read) = stream.read(&mut buf).await {
        if read == 0 {
            return;
        }
    }
}
