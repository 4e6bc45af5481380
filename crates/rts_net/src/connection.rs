//! TCP connections.
//!
//! Each [`Connection`] owns two tasks. The reader turns incoming bytes into
//! lines and forwards them, tagged with the connection id, to the owner's
//! [`Inbound`] queue. The writer drains an unbounded channel so any number of
//! callers can [`send`](Connection::send) without locking and without
//! interleaving partial lines.

use std::fmt;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{NetError, Result};

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 7777;

/// Longest line a peer may send, terminator excluded. Longer lines close
/// the connection.
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Identifier the owner assigns to each connection.
pub type ConnectionId = u64;

/// What a reader task reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// One line, without its terminator.
    Line(String),
    /// The stream ended or the connection was closed. Always the last event.
    Closed,
}

/// An event tagged with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Source connection.
    pub connection: ConnectionId,
    /// What happened.
    pub event: InboundEvent,
}

/// Handle to a live TCP connection.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<String>,
    close: watch::Sender<bool>,
    active: Arc<AtomicBool>,
}

impl Connection {
    /// Start the reader and writer tasks for `stream`.
    ///
    /// Lines read from the peer go to `inbound`. Must be called from within
    /// a tokio runtime.
    pub fn spawn(
        id: ConnectionId,
        stream: TcpStream,
        inbound: mpsc::UnboundedSender<Inbound>,
    ) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        let (outbound, queue) = mpsc::unbounded_channel();
        let (close, closed) = watch::channel(false);
        let active = Arc::new(AtomicBool::new(true));

        tokio::spawn(read_lines(id, reader, inbound, closed.clone(), Arc::clone(&active)));
        tokio::spawn(write_lines(id, writer, queue, closed, Arc::clone(&active)));
        debug!(connection = id, %peer, "connection started");

        Ok(Self {
            id,
            peer,
            outbound,
            close,
            active,
        })
    }

    /// Connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether neither side has closed the connection yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Queue one line for the peer. The terminator is added here.
    pub fn send(&self, line: impl fmt::Display) -> Result<()> {
        if !self.is_active() {
            return Err(NetError::StreamClosed);
        }
        self.outbound
            .send(line.to_string())
            .map_err(|_| NetError::StreamClosed)
    }

    /// Close the connection. Lines already queued are still written.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
        self.close.send_replace(true);
    }
}

async fn read_lines(
    id: ConnectionId,
    reader: OwnedReadHalf,
    inbound: mpsc::UnboundedSender<Inbound>,
    mut closed: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // One byte of slack tells an over-long line from one that fits exactly.
        let mut limited = (&mut reader).take(MAX_LINE_BYTES as u64 + 1);
        tokio::select! {
            read = limited.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    debug!(connection = id, "peer closed the stream");
                    break;
                }
                Ok(_) => {
                    let Some(line) = take_line(&mut buf) else {
                        warn!(connection = id, limit = MAX_LINE_BYTES, "line too long, closing");
                        break;
                    };
                    let line = match String::from_utf8(line) {
                        Ok(line) => line,
                        Err(error) => {
                            debug!(connection = id, %error, "line is not utf-8");
                            break;
                        }
                    };
                    let event = InboundEvent::Line(line);
                    if inbound.send(Inbound { connection: id, event }).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    debug!(connection = id, %error, "read failed");
                    break;
                }
            },
            _ = closed.changed() => break,
        }
    }
    active.store(false, Ordering::Release);
    let _ = inbound.send(Inbound {
        connection: id,
        event: InboundEvent::Closed,
    });
}

/// Strip the terminator from a line read by `read_until`.
///
/// `None` when the buffer filled up without finding one.
fn take_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_LINE_BYTES {
        return None;
    }
    Some(std::mem::take(buf))
}

async fn write_lines(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<String>,
    mut closed: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            biased;
            line = queue.recv() => match line {
                Some(line) => {
                    if let Err(error) = write_line(&mut writer, &line).await {
                        debug!(connection = id, %error, "write failed");
                        break;
                    }
                }
                None => break,
            },
            _ = closed.changed() => {
                while let Ok(line) = queue.try_recv() {
                    if write_line(&mut writer, &line).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    active.store(false, Ordering::Release);
    let _ = writer.shutdown().await;
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

/// Dial `addr`, giving up after `timeout`.
pub async fn connect<A>(addr: A, timeout: Duration) -> Result<TcpStream>
where
    A: ToSocketAddrs + fmt::Display,
{
    let target = addr.to_string();
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            debug!(addr = %target, "connected");
            Ok(stream)
        }
        Ok(Err(source)) => Err(NetError::ConnectFailure {
            addr: target,
            source,
        }),
        Err(_) => Err(NetError::ConnectTimeout {
            addr: target,
            timeout,
        }),
    }
}

/// Listening socket that hands each accepted stream to a callback.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
}

impl Acceptor {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until `on_accept` breaks.
    ///
    /// A failed accept only affects that one peer; it is logged and the
    /// loop continues.
    pub async fn run<F>(self, mut on_accept: F) -> Result<()>
    where
        F: FnMut(TcpStream, SocketAddr) -> ControlFlow<()>,
    {
        let addr = self.local_addr()?;
        info!(%addr, "accepting connections");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted");
                    if on_accept(stream, peer).is_break() {
                        info!(%addr, "acceptor stopped");
                        return Ok(());
                    }
                }
                Err(error) => warn!(%error, "accept failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 7777);
    }

    #[test]
    fn test_take_line_strips_terminators() {
        let mut buf = b"tick\r\n".to_vec();
        assert_eq!(take_line(&mut buf), Some(b"tick".to_vec()));
        assert!(buf.is_empty());

        // Last line of a stream that ends without a newline.
        let mut buf = b"start".to_vec();
        assert_eq!(take_line(&mut buf), Some(b"start".to_vec()));
    }

    #[test]
    fn test_take_line_rejects_unterminated_overflow() {
        let mut buf = vec![b'a'; MAX_LINE_BYTES + 1];
        assert_eq!(take_line(&mut buf), None);

        let mut buf = vec![b'a'; MAX_LINE_BYTES];
        buf.push(b'\n');
        assert_eq!(take_line(&mut buf).map(|line| line.len()), Some(MAX_LINE_BYTES));
    }

    #[tokio::test]
    async fn test_connect_refused_is_a_connect_failure() {
        // Bind then drop to find a port nobody is listening on.
        let addr = {
            let acceptor = Acceptor::bind("127.0.0.1:0").await.unwrap();
            acceptor.local_addr().unwrap()
        };
        let result = connect(addr, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(NetError::ConnectFailure { .. })));
    }
}
