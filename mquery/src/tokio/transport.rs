//! Buffered transports presenting an exact-byte-count read interface over a
//! byte source that delivers data in arbitrary chunks.

use std::{
    future::Future,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use bytes::{Buf, Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpStream, UdpSocket},
};

use crate::{Error, varint};

/// Largest datagram we are prepared to receive.
const MAX_DATAGRAM: usize = 65_535;
/// Largest Java packet, and so the largest length-prefixed string, we accept.
pub const MAX_PACKET_SIZE: usize = 2_097_152;
/// Most bytes reserved ahead of data actually arriving.
const READ_CHUNK: usize = 8 * 1024;

/// A connection that buffers reads and writes.
///
/// Reads wait until enough bytes have arrived and then remove exactly that many
/// from the front of the receive buffer. Writes accumulate until [`flush`],
/// which sends everything as one framed unit.
///
/// [`flush`]: Transport::flush
pub trait Transport: Send {
    /// Waits until `n` bytes are buffered and takes them.
    fn read_bytes(&mut self, n: usize) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// Appends to the outgoing buffer.
    fn write_bytes(&mut self, data: &[u8]);

    /// Sends the outgoing buffer as one unit.
    fn flush(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Tears down the connection.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;

    fn read_u8(&mut self) -> impl Future<Output = Result<u8, Error>> + Send {
        async move { Ok(self.read_bytes(1).await?.get_u8()) }
    }

    fn read_u16(&mut self) -> impl Future<Output = Result<u16, Error>> + Send {
        async move { Ok(self.read_bytes(2).await?.get_u16()) }
    }

    fn read_i16(&mut self) -> impl Future<Output = Result<i16, Error>> + Send {
        async move { Ok(self.read_bytes(2).await?.get_i16()) }
    }

    fn read_i64(&mut self) -> impl Future<Output = Result<i64, Error>> + Send {
        async move { Ok(self.read_bytes(8).await?.get_i64()) }
    }

    fn read_u64(&mut self) -> impl Future<Output = Result<u64, Error>> + Send {
        async move { Ok(self.read_bytes(8).await?.get_u64()) }
    }

    fn read_varint(&mut self) -> impl Future<Output = Result<i32, Error>> + Send {
        async move {
            let mut decoder = varint::Decoder::new();
            loop {
                let byte = self.read_u8().await?;
                if let Some(value) = decoder.push(byte)? {
                    return Ok(value);
                }
            }
        }
    }

    /// Reads a VarInt length-prefixed UTF-8 string of at most
    /// [`MAX_PACKET_SIZE`] bytes.
    fn read_string(&mut self) -> impl Future<Output = Result<String, Error>> + Send {
        async move {
            let len = usize::try_from(self.read_varint().await?)?;
            if len > MAX_PACKET_SIZE {
                return Err(Error::LengthTooLarge {
                    max: MAX_PACKET_SIZE,
                    actual: len,
                });
            }
            self.read_string_exact(len).await
        }
    }

    /// Reads a string whose byte length is given up front.
    fn read_string_exact(&mut self, len: usize) -> impl Future<Output = Result<String, Error>> + Send {
        async move {
            let bytes = self.read_bytes(len).await?;
            Ok(String::from_utf8(bytes.to_vec())?)
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_be_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    fn write_varint(&mut self, value: i32) {
        self.write_bytes(&varint::encode(u32::from_ne_bytes(value.to_ne_bytes())));
    }

    /// Writes a VarInt length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// If the string is longer than a VarInt can describe.
    fn write_string(&mut self, value: &str) -> Result<(), Error> {
        let len = u32::try_from(value.len())?;
        self.write_bytes(&varint::encode(len));
        self.write_bytes(value.as_bytes());
        Ok(())
    }
}

/// Stream transport for the Java protocol.
///
/// [`Transport::flush`] prefixes the buffered payload with its VarInt length,
/// producing one `length | id | body` packet per flush.
pub struct StreamTransport<S> {
    stream: S,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
}

/// A [`StreamTransport`] over a TCP connection.
pub type TcpTransport = StreamTransport<TcpStream>;

impl TcpTransport {
    /// Connects to `addr`, giving up after `timeout`.
    ///
    /// # Errors
    /// [`Error::Timeout`] if the connection is not established in time, or the
    /// I/O error the connection attempt failed with.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, Error> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Timeout(millis(timeout)))??;
        stream.set_nodelay(true)?;
        trace!(%addr, "tcp connection established");
        Ok(Self::new(stream))
    }

    /// Tries each address in order, keeping the first that connects.
    ///
    /// # Errors
    /// The error from the last attempt, or [`Error::DnsLookupFailed`] if
    /// `addrs` is empty.
    pub async fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<Self, Error> {
        let mut last = Error::DnsLookupFailed;
        for &addr in addrs {
            match Self::connect(addr, timeout).await {
                Ok(transport) => return Ok(transport),
                Err(error) => {
                    trace!(%addr, %error, "connection attempt failed");
                    last = error;
                }
            }
        }
        Err(last)
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::new(),
            write_buf: Vec::new(),
        }
    }

    /// The underlying stream, bypassing both buffers.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        while self.read_buf.len() < n {
            self.read_buf.reserve((n - self.read_buf.len()).min(READ_CHUNK));
            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return Err(Error::ConnectionClosed { wanted: n });
            }
        }
        Ok(self.read_buf.split_to(n).freeze())
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.write_buf.extend_from_slice(data);
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        let len = u32::try_from(self.write_buf.len())?;
        let mut frame = Vec::with_capacity(varint::MAX_LEN + self.write_buf.len());
        varint::write(&mut frame, len);
        frame.append(&mut self.write_buf);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        trace!(len, "flushed packet");
        Ok(())
    }

    async fn close(mut self) {
        if let Err(error) = self.stream.shutdown().await {
            trace!(?error, "error shutting down stream");
        }
    }
}

/// Datagram transport for the Bedrock protocol.
///
/// Every received datagram is appended to one receive buffer, so reads may span
/// datagram boundaries. [`Transport::flush`] sends the buffered bytes as a
/// single unframed datagram.
pub struct UdpTransport {
    socket: UdpSocket,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
    scratch: Box<[u8]>,
}

impl UdpTransport {
    /// Binds an ephemeral local socket and associates it with `addr`.
    ///
    /// # Errors
    /// If the socket cannot be bound or connected.
    pub async fn connect(addr: SocketAddr) -> Result<Self, Error> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;
        trace!(%addr, "udp socket associated");
        Ok(Self {
            socket,
            read_buf: BytesMut::new(),
            write_buf: Vec::new(),
            scratch: vec![0; MAX_DATAGRAM].into_boxed_slice(),
        })
    }

    /// Sends the buffered bytes prefixed with their length as a big-endian
    /// `u16`, for packet types that expect it.
    ///
    /// # Errors
    /// If the buffer does not fit a `u16` length or the send fails.
    pub async fn flush_with_length(&mut self) -> Result<(), Error> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        let len = u16::try_from(self.write_buf.len())?;
        let mut datagram = Vec::with_capacity(2 + self.write_buf.len());
        datagram.extend_from_slice(&len.to_be_bytes());
        datagram.append(&mut self.write_buf);
        self.socket.send(&datagram).await?;
        Ok(())
    }
}

impl Transport for UdpTransport {
    async fn read_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        while self.read_buf.len() < n {
            let received = self.socket.recv(&mut self.scratch).await?;
            self.read_buf.extend_from_slice(&self.scratch[..received]);
        }
        Ok(self.read_buf.split_to(n).freeze())
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.write_buf.extend_from_slice(data);
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        self.socket.send(&self.write_buf).await?;
        trace!(len = self.write_buf.len(), "sent datagram");
        self.write_buf.clear();
        Ok(())
    }

    async fn close(self) {
        // dropping the socket releases it
        drop(self.socket);
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
