//! Server List Ping state machine.

use std::time::Instant;

use super::{Transport, transport::MAX_PACKET_SIZE};
use crate::{Error, JavaResponse, java::PROTOCOL_VERSION, varint};

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_REQUEST_ID: i32 = 0x00;
const STATUS_RESPONSE_ID: i32 = 0x00;
const PING_ID: i32 = 0x01;
const PONG_ID: i32 = 0x01;
/// `next_state` value selecting the status protocol.
const NEXT_STATE_STATUS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Connecting,
    HandshakeSent,
    StatusRequested,
    StatusReceived,
    PingSent,
    Done,
}

struct Session<'a, T> {
    transport: &'a mut T,
    state: State,
}

impl<'a, T: Transport> Session<'a, T> {
    const fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            state: State::Connecting,
        }
    }

    fn advance(&mut self, next: State) {
        trace!(from = ?self.state, to = ?next, "java status state");
        self.state = next;
    }

    async fn handshake(&mut self, host: &str, port: u16) -> Result<(), Error> {
        debug_assert_eq!(self.state, State::Connecting);
        self.transport.write_varint(HANDSHAKE_ID);
        self.transport.write_varint(PROTOCOL_VERSION);
        self.transport.write_string(host)?;
        self.transport.write_u16(port);
        self.transport.write_varint(NEXT_STATE_STATUS);
        self.transport.flush().await?;
        self.advance(State::HandshakeSent);
        Ok(())
    }

    async fn request_status(&mut self) -> Result<(), Error> {
        debug_assert_eq!(self.state, State::HandshakeSent);
        self.transport.write_varint(STATUS_REQUEST_ID);
        self.transport.flush().await?;
        self.advance(State::StatusRequested);
        Ok(())
    }

    /// Reads a packet header, checking the packet id, and returns how many
    /// bytes of the packet follow the id.
    async fn expect_packet(&mut self, expected: i32) -> Result<usize, Error> {
        let length = usize::try_from(self.transport.read_varint().await?)?;
        if length > MAX_PACKET_SIZE {
            return Err(Error::LengthTooLarge {
                max: MAX_PACKET_SIZE,
                actual: length,
            });
        }
        let received = self.transport.read_varint().await?;
        if received != expected {
            return Err(Error::InvalidPacket { expected, received });
        }
        let id_len = varint::encode(u32::from_ne_bytes(received.to_ne_bytes())).len();
        Ok(length.saturating_sub(id_len))
    }

    async fn read_status(&mut self) -> Result<JavaResponse, Error> {
        debug_assert_eq!(self.state, State::StatusRequested);
        let body = self.expect_packet(STATUS_RESPONSE_ID).await?;
        let len = usize::try_from(self.transport.read_varint().await?)?;
        // the string cannot extend past the packet that carries it
        if len > body {
            return Err(Error::LengthTooLarge {
                max: body,
                actual: len,
            });
        }
        let json = self.transport.read_string_exact(len).await?;
        let response = serde_json::from_str(&json)?;
        self.advance(State::StatusReceived);
        Ok(response)
    }

    /// Sends a random payload, returning it with the time it was sent.
    async fn ping(&mut self) -> Result<(i64, Instant), Error> {
        debug_assert_eq!(self.state, State::StatusReceived);
        let payload: i64 = rand::random();
        self.transport.write_varint(PING_ID);
        self.transport.write_i64(payload);
        self.transport.flush().await?;
        let sent_at = Instant::now();
        self.advance(State::PingSent);
        Ok((payload, sent_at))
    }

    /// Reads the pong, returning the round trip in milliseconds.
    async fn read_pong(&mut self, payload: i64, sent_at: Instant) -> Result<u64, Error> {
        debug_assert_eq!(self.state, State::PingSent);
        self.expect_packet(PONG_ID).await?;
        let received = self.transport.read_i64().await?;
        if received != payload {
            return Err(Error::PayloadMismatch {
                sent: payload,
                received,
            });
        }
        let latency = u64::try_from(sent_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.advance(State::Done);
        Ok(latency)
    }
}

/// Runs handshake, status request and ping/pong over an open transport.
///
/// Any failing step aborts the exchange. The caller owns closing the
/// transport.
pub(crate) async fn exchange<T: Transport>(
    transport: &mut T,
    host: &str,
    port: u16,
) -> Result<(u64, JavaResponse), Error> {
    let mut session = Session::new(transport);
    session.handshake(host, port).await?;
    session.request_status().await?;
    let response = session.read_status().await?;
    let (payload, sent_at) = session.ping().await?;
    let latency = session.read_pong(payload, sent_at).await?;
    Ok((latency, response))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    use super::*;
    use crate::tokio::StreamTransport;

    const STATUS_JSON: &str = r#"{"version":{"name":"1.8.9","protocol":47},"players":{"max":20,"online":3,"sample":[{"name":"Notch","id":"069a79f4-44e9-4726-a5be-fca90e38aaf5"}]},"description":"§aHello"}"#;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = crate::varint::encode(u32::try_from(body.len()).unwrap());
        out.extend_from_slice(body);
        out
    }

    fn status_packet(json: &str) -> Vec<u8> {
        let mut body = crate::varint::encode(u32::try_from(json.len()).unwrap());
        body.insert(0, 0x00);
        body.extend_from_slice(json.as_bytes());
        frame(&body)
    }

    fn pong_packet(payload: i64) -> Vec<u8> {
        let mut body = vec![0x01];
        body.extend_from_slice(&payload.to_be_bytes());
        frame(&body)
    }

    /// Writes `bytes` a few at a time so reads must span chunks.
    async fn dribble(io: &mut DuplexStream, bytes: &[u8]) {
        for chunk in bytes.chunks(3) {
            io.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
    }

    /// Plays the server side: answers the status request with `json`, then
    /// answers the ping with `pong(payload)`.
    fn mock_server(
        io: DuplexStream,
        json: &'static str,
        pong: fn(i64) -> i64,
    ) -> tokio::task::JoinHandle<(i32, String, u16)> {
        tokio::spawn(async move {
            let mut server = StreamTransport::new(io);
            let _len = server.read_varint().await.unwrap();
            assert_eq!(server.read_varint().await.unwrap(), 0x00);
            let protocol = server.read_varint().await.unwrap();
            let host = server.read_string().await.unwrap();
            let port = server.read_u16().await.unwrap();
            assert_eq!(server.read_varint().await.unwrap(), 1);
            // status request: length 1, id 0
            assert_eq!(&server.read_bytes(2).await.unwrap()[..], [0x01, 0x00]);

            dribble(server.get_mut(), &status_packet(json)).await;

            assert_eq!(server.read_varint().await.unwrap(), 9);
            assert_eq!(server.read_varint().await.unwrap(), 0x01);
            let payload = server.read_i64().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            dribble(server.get_mut(), &pong_packet(pong(payload))).await;
            (protocol, host, port)
        })
    }

    #[tokio::test]
    async fn full_exchange() {
        let (client, server) = duplex(256);
        let handle = mock_server(server, STATUS_JSON, |payload| payload);
        let mut transport = StreamTransport::new(client);

        let (latency, response) = exchange(&mut transport, "mc.example.com", 25565)
            .await
            .unwrap();
        assert!(latency >= 20, "latency was {latency}");
        assert_eq!(response.version.name, "1.8.9");
        assert_eq!(response.players.online, 3);
        assert_eq!(response.players.sample.unwrap()[0].name, "Notch");

        let (protocol, host, port) = handle.await.unwrap();
        assert_eq!(protocol, 47);
        assert_eq!(host, "mc.example.com");
        assert_eq!(port, 25565);
    }

    #[tokio::test]
    async fn payload_mismatch_fails() {
        let (client, server) = duplex(256);
        let handle = mock_server(server, STATUS_JSON, |payload| payload.wrapping_add(1));
        let mut transport = StreamTransport::new(client);

        let result = exchange(&mut transport, "localhost", 25565).await;
        let Err(Error::PayloadMismatch { sent, received }) = result else {
            panic!("expected payload mismatch");
        };
        assert_eq!(received, sent.wrapping_add(1));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_json_fails() {
        let (client, server) = duplex(256);
        let _handle = mock_server(server, "{\"version\": ", |payload| payload);
        let mut transport = StreamTransport::new(client);
        assert!(matches!(
            exchange(&mut transport, "localhost", 25565).await,
            Err(Error::JsonErr(_))
        ));
    }

    #[tokio::test]
    async fn wrong_packet_id_fails() {
        let (client, mut server) = duplex(256);
        let mut transport = StreamTransport::new(client);
        // a disconnect packet (id 0x1a in play state) instead of a status response
        server.write_all(&frame(&[0x1a, 0x00])).await.unwrap();
        assert!(matches!(
            exchange(&mut transport, "localhost", 25565).await,
            Err(Error::InvalidPacket {
                expected: 0x00,
                received: 0x1a
            })
        ));
    }

    #[tokio::test]
    async fn oversized_frame_fails() {
        let (client, mut server) = duplex(256);
        let mut transport = StreamTransport::new(client);
        // frame length of 2^31 - 1, then a status id and a short string
        server
            .write_all(&[0xff, 0xff, 0xff, 0xff, 0x07, 0x00, 0x01, b'{'])
            .await
            .unwrap();
        let Err(error) = exchange(&mut transport, "localhost", 25565).await else {
            panic!("expected an oversized frame to fail");
        };
        assert!(matches!(
            error,
            Error::LengthTooLarge {
                max: MAX_PACKET_SIZE,
                actual: 2_147_483_647
            }
        ));
        assert_eq!(error.code(), crate::ErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn string_longer_than_frame_fails() {
        let (client, mut server) = duplex(256);
        let mut transport = StreamTransport::new(client);
        // a 4 byte packet whose string claims 1000 bytes
        let mut body = vec![0x00];
        body.extend_from_slice(&crate::varint::encode(1000));
        body.push(b'{');
        server.write_all(&frame(&body)).await.unwrap();
        assert!(matches!(
            exchange(&mut transport, "localhost", 25565).await,
            Err(Error::LengthTooLarge {
                max: 3,
                actual: 1000
            })
        ));
    }

    #[tokio::test]
    async fn early_close_fails() {
        let (client, server) = duplex(256);
        drop(server);
        let mut transport = StreamTransport::new(client);
        assert!(exchange(&mut transport, "localhost", 25565).await.is_err());
    }
}
