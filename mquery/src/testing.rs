//! Loopback mock servers for facade and auto-detection tests.

use std::net::SocketAddr;

use tokio::{
    net::{TcpListener, UdpSocket},
    task::JoinHandle,
};

use crate::{
    Error,
    bedrock::OFFLINE_MESSAGE_DATA_ID,
    tokio::{StreamTransport, Transport},
};

pub const STATUS_JSON: &str = r#"{"version":{"name":"1.21.1","protocol":767},"players":{"max":50,"online":1},"description":{"text":"Mock","color":"gold"}}"#;

pub const PONG_PAYLOAD: &str = "MCPE;Mock Bedrock;422;1.19;5;20;123456;Server;Survival;1;19132;19133";

/// Serves one Java status exchange. The handle resolves to `(host, port)`
/// from the handshake and whether the client closed its end afterwards.
pub async fn java_server() -> (SocketAddr, JoinHandle<(String, u16, bool)>) {
    java_server_with(|payload| payload).await
}

/// As [`java_server`], answering the ping with `pong(payload)`.
pub async fn java_server_with(
    pong: fn(i64) -> i64,
) -> (SocketAddr, JoinHandle<(String, u16, bool)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = StreamTransport::new(stream);
        let _len = server.read_varint().await.unwrap();
        let _id = server.read_varint().await.unwrap();
        let _protocol = server.read_varint().await.unwrap();
        let host = server.read_string().await.unwrap();
        let port = server.read_u16().await.unwrap();
        let _next = server.read_varint().await.unwrap();
        let _request = server.read_bytes(2).await.unwrap();

        server.write_varint(0x00);
        server.write_string(STATUS_JSON).unwrap();
        server.flush().await.unwrap();

        let _len = server.read_varint().await.unwrap();
        let _id = server.read_varint().await.unwrap();
        let payload = server.read_i64().await.unwrap();
        server.write_varint(0x01);
        server.write_i64(pong(payload));
        server.flush().await.unwrap();

        let closed = matches!(
            server.read_u8().await,
            Err(Error::ConnectionClosed { .. })
        );
        (host, port, closed)
    });
    (addr, handle)
}

/// Answers unconnected pings with [`PONG_PAYLOAD`] until the task is dropped.
pub async fn bedrock_server() -> (SocketAddr, JoinHandle<()>) {
    bedrock_server_on("127.0.0.1:0").await
}

pub async fn bedrock_server_on(bind: &str) -> (SocketAddr, JoinHandle<()>) {
    let socket = UdpSocket::bind(bind).await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = [0; 256];
        loop {
            let Ok((_, peer)) = socket.recv_from(&mut buf).await else {
                continue;
            };
            let mut pong = vec![0x1c];
            pong.extend_from_slice(&buf[1..9]);
            pong.extend_from_slice(&42_u64.to_be_bytes());
            pong.extend_from_slice(OFFLINE_MESSAGE_DATA_ID);
            pong.extend_from_slice(&u16::try_from(PONG_PAYLOAD.len()).unwrap().to_be_bytes());
            pong.extend_from_slice(PONG_PAYLOAD.as_bytes());
            let _ = socket.send_to(&pong, peer).await;
        }
    });
    (addr, handle)
}

/// A TCP listener and UDP socket on one port that never answer.
pub async fn silent_server() -> (u16, TcpListener, UdpSocket) {
    loop {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        if let Ok(socket) = UdpSocket::bind(("127.0.0.1", port)).await {
            return (port, listener, socket);
        }
    }
}
