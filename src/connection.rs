//! The proxy-slave connection worker: dials out to a peer, then drives the link
//! state machine and ASDU dispatcher for as long as the connection lives.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::codec::Framed;

use crate::codec::{Apdu, Iec104Codec};
use crate::config::ProxyConfig;
use crate::dispatcher::{self, Direction, HandlerTable};
use crate::error::{Iec104Error, Result};
use crate::facade::{MasterConnection, SharedState};
use crate::types::{Apci, UFunction};

/// Any duplex byte stream a connection can run over: a plain `TcpStream`, or a
/// TLS session layered on top of one. The link state machine and dispatcher never
/// see which.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// Observability events emitted over the lifetime of a connection.
#[derive(Debug)]
pub enum ProxyEvent {
    /// The outbound socket connected successfully.
    Connected,
    /// The connection was torn down (fatal error, peer close, or `close()`).
    Disconnected,
    /// The peer activated data transfer (STARTDT_ACT was answered).
    DataTransferStarted,
    /// The peer deactivated data transfer (STOPDT_ACT was answered).
    DataTransferStopped,
    /// A fatal error occurred; the connection is closing.
    Error(Iec104Error),
}

/// Wraps a transport so every byte read or written also reaches the installed
/// raw-message observer, independent of TLS: the wrapper sits above any TLS layer,
/// so it always sees the plaintext APDU stream.
struct ObservingStream<S> {
    inner: S,
    handlers: Arc<HandlerTable>,
}

impl<S> ObservingStream<S> {
    fn new(inner: S, handlers: Arc<HandlerTable>) -> Self {
        Self { inner, handlers }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ObservingStream<S> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if poll.is_ready() && buf.filled().len() > before {
            this.handlers.observe_raw(Direction::Received, &buf.filled()[before..]);
        }
        poll
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ObservingStream<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            this.handlers.observe_raw(Direction::Sent, &buf[..*n]);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

async fn dial(config: &ProxyConfig) -> Result<(Box<dyn ByteStream>, std::net::SocketAddr)> {
    let tcp = TcpStream::connect(config.address()).await?;
    let peer_addr = tcp.peer_addr()?;

    match &config.tls {
        None => Ok((Box::new(tcp), peer_addr)),
        #[cfg(feature = "tls")]
        Some(tls) => {
            let stream = crate::tls::connect(tcp, tls, &config.hostname).await?;
            Ok((Box::new(stream), peer_addr))
        }
        #[cfg(not(feature = "tls"))]
        Some(_) => Err(Iec104Error::protocol_static(
            "TLS was configured but this build does not have the `tls` feature enabled",
        )),
    }
}

/// A connection to a single peer, in the proxy-slave role: it dialed out, but
/// answers the protocol dialogue as the polled station.
pub struct ProxyConnection {
    conn: MasterConnection,
    read_half: futures::stream::SplitStream<Framed<ObservingStream<Box<dyn ByteStream>>, Iec104Codec>>,
    handlers: Arc<HandlerTable>,
    event_tx: mpsc::UnboundedSender<ProxyEvent>,
    poll_interval: Duration,
}

impl ProxyConnection {
    /// Dial the configured peer and prepare the connection. The returned
    /// connection must be driven with [`ProxyConnection::run`] for the protocol
    /// dialogue to proceed; events are delivered on the returned channel.
    pub async fn connect(
        config: ProxyConfig,
        handlers: HandlerTable,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ProxyEvent>)> {
        let (raw, peer_addr) = dial(&config).await?;
        Ok(Self::build(raw, peer_addr, &config, handlers))
    }

    fn build(
        stream: Box<dyn ByteStream>,
        peer_addr: std::net::SocketAddr,
        config: &ProxyConfig,
        handlers: HandlerTable,
    ) -> (Self, mpsc::UnboundedReceiver<ProxyEvent>) {
        let handlers = Arc::new(handlers);
        let observed = ObservingStream::new(stream, handlers.clone());
        let framed = Framed::new(observed, Iec104Codec::new());
        let (sink, read_half) = framed.split();
        let sink: Pin<Box<dyn futures::Sink<Apdu, Error = Iec104Error> + Send>> = Box::pin(sink);

        let shared = SharedState::new(config.apci_parameters(), config.app_layer_parameters(), sink);
        let closed = Arc::new(AtomicBool::new(false));
        let conn = MasterConnection::new(Arc::new(AsyncMutex::new(shared)), closed, peer_addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self { conn, read_half, handlers, event_tx, poll_interval: Duration::from_millis(200) },
            event_rx,
        )
    }

    /// The façade handlers receive; also usable by the caller to send spontaneous
    /// ASDUs (e.g. measurement updates) outside of handler callbacks.
    pub fn master_connection(&self) -> MasterConnection {
        self.conn.clone()
    }

    /// Run the link state machine and dispatcher until the connection closes,
    /// fatally errors, or [`MasterConnection::close`] is called. The caller is
    /// expected to drive this (typically via `tokio::spawn`) for the lifetime of
    /// the connection.
    pub async fn run(mut self) -> Result<()> {
        let _ = self.event_tx.send(ProxyEvent::Connected);

        let outcome = self.run_loop().await;

        if let Err(err) = &outcome {
            let _ = self.event_tx.send(ProxyEvent::Error(clone_error(err)));
        }
        let _ = self.event_tx.send(ProxyEvent::Disconnected);
        outcome
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            if self.conn.closed.load(Ordering::SeqCst) {
                return Ok(());
            }

            match tokio::time::timeout(self.poll_interval, self.read_half.next()).await {
                Ok(Some(Ok(apdu))) => {
                    self.handle_apdu(apdu).await?;
                }
                Ok(Some(Err(e))) => {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    let _ = self.event_tx.send(ProxyEvent::Error(clone_error(&e)));
                }
                Ok(None) => return Ok(()), // peer closed the socket
                Err(_elapsed) => {}        // no frame arrived within this tick
            }

            self.conn.check_timers().await?;
        }
    }

    async fn handle_apdu(&mut self, apdu: Apdu) -> Result<()> {
        match apdu.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                self.conn.on_i_frame(send_seq, recv_seq).await?;
                if let Some(asdu) = apdu.asdu {
                    if let Some(reply) = dispatcher::dispatch(&asdu, &self.handlers, &self.conn)? {
                        self.conn.send_asdu(&reply).await?;
                    }
                }
            }
            Apci::SFrame { recv_seq } => {
                self.conn.on_s_frame(recv_seq).await?;
            }
            Apci::UFrame { function } => match function {
                UFunction::TestFrAct => self.conn.on_testfr_act().await?,
                UFunction::TestFrCon => self.conn.on_testfr_con().await,
                UFunction::StartDtAct => {
                    self.conn.on_startdt_act().await?;
                    let _ = self.event_tx.send(ProxyEvent::DataTransferStarted);
                }
                UFunction::StopDtAct => {
                    self.conn.on_stopdt_act().await?;
                    let _ = self.event_tx.send(ProxyEvent::DataTransferStopped);
                }
                // This endpoint never originates STARTDT/STOPDT, so their
                // confirmations should never arrive; ignored rather than fatal.
                UFunction::StartDtCon | UFunction::StopDtCon => {}
            },
            Apci::UnknownUFrame { .. } => self.conn.on_unknown_uframe().await,
        }
        Ok(())
    }
}

fn clone_error(err: &Iec104Error) -> Iec104Error {
    Iec104Error::internal(err.to_string())
}
