//! Transport to a running EPLAN instance.
//!
//! The remoting endpoint is a local TCP port speaking a line-oriented
//! request/response protocol: the controller writes one action string
//! terminated by a newline and reads back one response line. The response
//! format itself is host-defined and not controlled by this crate.
//!
//! [`ActionTransport`] is the seam that keeps the dispatcher and the
//! quiet-execution bridge testable without a running EPLAN process.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Query sent during the handshake; the host answers with its version
/// banner (e.g. `EPLAN Electric P8 2026.0`).
pub const VERSION_QUERY: &str = "EplanVersion";

/// Liveness query; any response line counts as alive.
pub const PING_QUERY: &str = "Ping";

/// One request/response exchange with the host.
///
/// Implementations perform no timeout handling of their own; callers bound
/// every exchange with `tokio::time::timeout`.
pub trait ActionTransport: Send {
    /// Sends one action string and awaits one response line.
    fn send(&mut self, line: &str) -> impl std::future::Future<Output = io::Result<String>> + Send;

    /// Closes the transport. Dropping without calling this is also fine.
    fn shutdown(&mut self) -> impl std::future::Future<Output = io::Result<()>> + Send;
}

/// Line-oriented TCP client for the EPLAN remoting endpoint.
pub struct TcpTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpTransport {
    /// Opens a TCP connection to `host:port` within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` when the connection does not establish in time,
    /// or the underlying connect error otherwise.
    pub async fn open(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

impl ActionTransport for TcpTransport {
    async fn send(&mut self, line: &str) -> io::Result<String> {
        debug_assert!(
            !line.contains('\n'),
            "action strings must not contain embedded newlines"
        );

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut response = String::new();
        let bytes_read = self.reader.read_line(&mut response).await?;
        if bytes_read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "host closed the connection",
            ));
        }

        while response.ends_with('\n') || response.ends_with('\r') {
            response.pop();
        }
        Ok(response)
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport double for unit tests.

    use std::collections::VecDeque;
    use std::io;

    use super::ActionTransport;

    /// Scripted transport: records sent lines, replays queued responses.
    pub struct MockTransport {
        /// Every action string sent through this transport, in order.
        pub sent: Vec<String>,
        /// Responses returned in FIFO order; when exhausted, replies `OK`.
        pub responses: VecDeque<io::Result<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                sent: Vec::new(),
                responses: VecDeque::new(),
            }
        }

        pub fn with_responses<I>(responses: I) -> Self
        where
            I: IntoIterator<Item = io::Result<String>>,
        {
            Self {
                sent: Vec::new(),
                responses: responses.into_iter().collect(),
            }
        }
    }

    impl ActionTransport for MockTransport {
        async fn send(&mut self, line: &str) -> io::Result<String> {
            self.sent.push(line.to_string());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Ok("OK".to_string()))
        }

        async fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_send_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"Ping\n");
            socket.write_all(b"EPLAN alive\r\n").await.unwrap();
        });

        let mut transport = TcpTransport::open("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let response = transport.send(PING_QUERY).await.unwrap();
        assert_eq!(response, "EPLAN alive");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn tcp_send_eof_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut transport = TcpTransport::open("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let result = transport.send(PING_QUERY).await;
        assert!(result.is_err());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpTransport::open("127.0.0.1", port, Duration::from_millis(500)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mock_transport_replays_and_records() {
        use super::testing::MockTransport;

        let mut mock = MockTransport::with_responses([Ok("first".to_string())]);
        assert_eq!(mock.send("a").await.unwrap(), "first");
        assert_eq!(mock.send("b").await.unwrap(), "OK");
        assert_eq!(mock.sent, vec!["a", "b"]);
    }
}
