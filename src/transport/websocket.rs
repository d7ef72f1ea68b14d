//! WebSocket transport
//!
//! `WebSocketTransport` keeps one connection to the pub/sub endpoint alive on
//! a tokio task:
//! - connect, flag the transport open, then report `on_open`
//! - forward inbound text frames to `on_message`
//! - write frames handed to `send` through an unbounded channel
//! - on close or error, flag the transport closed, report it, back off and
//!   reconnect until `close()` is called or the backoff gives up
//!
//! Listener callbacks run on the I/O task. They must not block for long:
//! a slow listener stalls inbound processing for this connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use url::Url;

use crate::transport::reconnect::ExponentialBackoff;
use crate::transport::{Transport, TransportFactory, TransportListener};
use crate::utils::error::{PubSubError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// State shared between the transport handle and its I/O task.
#[derive(Default)]
struct Link {
    open: AtomicBool,
    outbound: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
}

impl Link {
    fn attach(&self, sender: mpsc::UnboundedSender<WsMessage>) {
        *self.outbound.lock() = Some(sender);
        self.open.store(true, Ordering::Release);
    }

    fn detach(&self) {
        self.open.store(false, Ordering::Release);
        self.outbound.lock().take();
    }
}

pub struct WebSocketTransport {
    url: Url,
    listener: Arc<dyn TransportListener>,
    backoff: ExponentialBackoff,
    runtime: Handle,
    link: Arc<Link>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketTransport {
    pub fn new(
        url: Url,
        listener: Arc<dyn TransportListener>,
        backoff: ExponentialBackoff,
        runtime: Handle,
    ) -> Self {
        Self {
            url,
            listener,
            backoff,
            runtime,
            link: Arc::new(Link::default()),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }
}

impl Transport for WebSocketTransport {
    fn connect(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("transport already running, ignoring connect");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown.lock() = Some(shutdown_tx);

        let worker = Worker {
            url: self.url.clone(),
            listener: Arc::clone(&self.listener),
            backoff: self.backoff.clone(),
            link: Arc::clone(&self.link),
            shutdown: shutdown_rx,
        };
        *task = Some(self.runtime.spawn(worker.run()));
    }

    fn is_open(&self) -> bool {
        self.link.open.load(Ordering::Acquire)
    }

    fn send(&self, text: &str) -> Result<()> {
        if !self.is_open() {
            return Err(PubSubError::NotConnected);
        }

        match self.link.outbound.lock().as_ref() {
            Some(sender) => sender
                .send(WsMessage::text(text.to_owned()))
                .map_err(|_| PubSubError::NotConnected),
            None => Err(PubSubError::NotConnected),
        }
    }

    fn close(&self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(true);
        }
        self.link.detach();
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builds `WebSocketTransport`s on the runtime that created the factory.
#[derive(Clone)]
pub struct WebSocketTransportFactory {
    backoff: ExponentialBackoff,
    runtime: Handle,
}

impl WebSocketTransportFactory {
    /// Must be called from within a tokio runtime.
    pub fn new(backoff: ExponentialBackoff) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| PubSubError::Transport(format!("no tokio runtime available: {e}")))?;
        Ok(Self { backoff, runtime })
    }

    pub fn with_runtime(backoff: ExponentialBackoff, runtime: Handle) -> Self {
        Self { backoff, runtime }
    }
}

impl TransportFactory for WebSocketTransportFactory {
    fn create(&self, url: Url, listener: Arc<dyn TransportListener>) -> Arc<dyn Transport> {
        Arc::new(WebSocketTransport::new(
            url,
            listener,
            self.backoff.clone(),
            self.runtime.clone(),
        ))
    }
}

struct Worker {
    url: Url,
    listener: Arc<dyn TransportListener>,
    backoff: ExponentialBackoff,
    link: Arc<Link>,
    shutdown: watch::Receiver<bool>,
}

enum SessionEnd {
    Closed(String),
    Failed(PubSubError),
    Shutdown,
}

impl Worker {
    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Host and path only; the query carries the API key.
    fn display_url(&self) -> String {
        format!(
            "{}://{}{}",
            self.url.scheme(),
            self.url.host_str().unwrap_or_default(),
            self.url.path()
        )
    }

    async fn run(mut self) {
        let target = self.display_url();
        let mut attempt = 0;

        loop {
            if self.is_shutdown() {
                break;
            }

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = self.shutdown.changed() => break,
            };

            match connected {
                Ok((stream, response)) => {
                    attempt = 0;
                    let status = response.status();
                    info!("Connected to {target}");
                    let end = self
                        .session(stream, status.as_u16(), status.canonical_reason().unwrap_or(""))
                        .await;

                    self.link.detach();
                    match end {
                        SessionEnd::Closed(reason) => {
                            info!("Connection to {target} closed: {reason}");
                            self.listener.on_close(&reason);
                        }
                        SessionEnd::Failed(err) => {
                            warn!("Connection to {target} failed: {err}");
                            self.listener.on_error(&err);
                        }
                        SessionEnd::Shutdown => {
                            self.listener.on_close("closed by client");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to connect to {target}: {e}");
                    self.listener.on_error(&PubSubError::Transport(e.to_string()));
                }
            }

            if self.is_shutdown() {
                break;
            }

            let Some(delay) = self.backoff.next_delay(attempt) else {
                warn!("Reconnection attempts to {target} exhausted after {attempt} tries");
                break;
            };
            attempt += 1;
            debug!("Reconnecting to {target} in {delay:?} (attempt {attempt})");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.link.detach();
        debug!("Transport task for {target} exiting");
    }

    async fn session(&mut self, stream: WsStream, status_code: u16, status_message: &str) -> SessionEnd {
        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

        self.link.attach(tx);
        self.listener.on_open(status_code, status_message);

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => self.listener.on_message(text.as_str()),
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return SessionEnd::Closed(reason);
                    }
                    // binary, ping and pong frames carry nothing for the listener
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Failed(PubSubError::Transport(e.to_string())),
                    None => return SessionEnd::Closed("stream ended".to_string()),
                },
                outgoing = rx.recv() => match outgoing {
                    Some(msg) => {
                        if let Err(e) = write.send(msg).await {
                            return SessionEnd::Failed(PubSubError::Transport(e.to_string()));
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        if self.is_shutdown() {
                            return SessionEnd::Shutdown;
                        }
                        return SessionEnd::Closed("outbound channel dropped".to_string());
                    }
                },
                _ = self.shutdown.changed() => {
                    self.link.detach();
                    let _ = write.close().await;
                    return SessionEnd::Shutdown;
                }
            }
        }
    }
}
