//! Pub/Sub client
//!
//! `PubSubClient` multiplexes any number of channels and handlers over one
//! transport. It owns three pieces of state behind a single lock:
//! - the channel registry, which is the source of truth for subscriptions
//! - the outbound queue of publishes made while not open
//! - the current transport and its generation
//!
//! Every time the transport reports open, the client resends `sub` for every
//! registered channel and then flushes the queue in FIFO order. Send
//! failures are never surfaced to callers: the registry and queue already
//! record the intent, and the next open replays it.
//!
//! Locking: frames are sent while the state lock is held so replay and new
//! operations cannot interleave. `Transport::send` must therefore not block.
//! Handlers run without the lock, so they may call back into the client.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::handler::Handler;
use crate::client::outbound::{OutboundMessage, OutboundQueue};
use crate::client::registry::ChannelRegistry;
use crate::config::Settings;
use crate::persistence::OutboundStore;
use crate::transport::endpoint::EndpointInfo;
use crate::transport::message::{ClientFrame, Delivery};
use crate::transport::reconnect::ExponentialBackoff;
use crate::transport::websocket::WebSocketTransportFactory;
use crate::transport::{Transport, TransportFactory, TransportListener};
use crate::utils::error::{PubSubError, Result};

/// Connection state as seen by the client, driven by transport callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

struct ClientState {
    registry: ChannelRegistry,
    outbound: OutboundQueue,
    connection: ConnectionState,
    transport: Option<Arc<dyn Transport>>,
    generation: u64,
}

impl ClientState {
    /// The transport, if the client has seen it open and it still is.
    fn ready_transport(&self) -> Option<Arc<dyn Transport>> {
        if self.connection != ConnectionState::Open {
            return None;
        }
        self.transport.as_ref().filter(|t| t.is_open()).cloned()
    }
}

struct Shared {
    state: Mutex<ClientState>,
    factory: Arc<dyn TransportFactory>,
}

/// Handle to a pub/sub client. Cloning is cheap and shares the same client.
#[derive(Clone)]
pub struct PubSubClient {
    shared: Arc<Shared>,
}

impl PubSubClient {
    /// Create a client with no transport yet. State is `Disconnected` until
    /// `configure` is called; publishes made before then are queued.
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_queue(factory, OutboundQueue::new())
    }

    pub fn with_queue(factory: Arc<dyn TransportFactory>, outbound: OutboundQueue) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ClientState {
                    registry: ChannelRegistry::new(),
                    outbound,
                    connection: ConnectionState::Disconnected,
                    transport: None,
                    generation: 0,
                }),
                factory,
            }),
        }
    }

    /// Build a WebSocket-backed client from settings and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let factory = WebSocketTransportFactory::new(ExponentialBackoff::from(&settings.reconnect))?;

        let limit = settings.client.max_queued_messages;
        let outbound = match &settings.client.queue_path {
            Some(path) => OutboundQueue::with_store(OutboundStore::open(path)?, limit)?,
            None => OutboundQueue::with_capacity_limit(limit),
        };

        let client = Self::with_queue(Arc::new(factory), outbound);
        client.configure(&settings.endpoint_info())?;
        Ok(client)
    }

    /// Point the client at a new endpoint.
    ///
    /// The old transport is closed and a new one is built and connected.
    /// Registrations and queued publishes are kept and replayed once the
    /// new transport opens. Fails with `InvalidArgument` for non-HTTP(S)
    /// endpoints, before any transport is built.
    pub fn configure(&self, endpoint: &EndpointInfo) -> Result<()> {
        let url = endpoint.pubsub_url()?;
        info!(
            "Configuring pub/sub endpoint {}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            url.path()
        );

        let (previous, transport) = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            let binding = Arc::new(TransportBinding {
                shared: Arc::downgrade(&self.shared),
                generation: state.generation,
            });
            let transport = self.shared.factory.create(url, binding);
            let previous = state.transport.replace(Arc::clone(&transport));
            state.connection = ConnectionState::Connecting;
            (previous, transport)
        };

        // outside the lock: either call may report back synchronously
        if let Some(previous) = previous {
            previous.close();
        }
        transport.connect();
        Ok(())
    }

    /// Register `handler` on `channel`.
    ///
    /// Sends `sub` only when this is the channel's first registration and
    /// the connection is open; otherwise the next open replays it.
    pub fn subscribe(&self, channel: &str, handler: Handler) -> Result<Handler> {
        if channel.is_empty() {
            return Err(PubSubError::InvalidArgument(
                "channel name must not be empty".to_string(),
            ));
        }

        let mut state = self.shared.state.lock();
        if state.registry.register(channel, handler.clone()) {
            debug!("Subscribed to new channel {channel}");
            if let Some(transport) = state.ready_transport() {
                send_or_defer(
                    transport.as_ref(),
                    &ClientFrame::Sub {
                        channel: channel.to_string(),
                    },
                );
            }
        }
        Ok(handler)
    }

    /// Remove one registration. Sends `unsub` only if it was the last
    /// handler on the channel.
    pub fn unsubscribe(&self, channel: &str, handler: Handler) -> Handler {
        let mut state = self.shared.state.lock();
        if state.registry.unregister(channel, &handler) {
            debug!("Last handler removed from {channel}");
            Self::send_unsub(&state, channel);
        }
        handler
    }

    /// Remove every registration on `channel` and return them.
    pub fn unsubscribe_all(&self, channel: &str) -> Vec<Handler> {
        let mut state = self.shared.state.lock();
        let removed = state.registry.unregister_all(channel);
        if !removed.is_empty() {
            debug!("Removed {} handlers from {channel}", removed.len());
            Self::send_unsub(&state, channel);
        }
        removed
    }

    /// Publish `data` on `channel`, or queue it until the next open.
    pub fn publish(&self, channel: &str, data: Value) -> Result<()> {
        if channel.is_empty() {
            return Err(PubSubError::InvalidArgument(
                "channel name must not be empty".to_string(),
            ));
        }
        if data.is_null() {
            return Err(PubSubError::InvalidArgument(
                "payload must not be null".to_string(),
            ));
        }

        let mut state = self.shared.state.lock();
        let Some(transport) = state.ready_transport() else {
            debug!("Not connected, queueing publish for {channel}");
            state.outbound.enqueue(channel, data);
            return Ok(());
        };

        let frame = ClientFrame::Pub {
            channel: channel.to_string(),
            data,
        };
        if let Err(e) = send_frame(transport.as_ref(), &frame) {
            debug!("Publish to {channel} deferred: {e}");
            if let ClientFrame::Pub { data, .. } = frame {
                state.outbound.enqueue(channel, data);
            }
        }
        Ok(())
    }

    /// Whether the transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.shared
            .state
            .lock()
            .transport
            .as_ref()
            .is_some_and(|t| t.is_open())
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().connection
    }

    /// Channels with at least one registration, in first-registration order.
    pub fn channels(&self) -> Vec<String> {
        self.shared.state.lock().registry.channels()
    }

    /// Snapshot of the publishes waiting for the next open.
    pub fn queued_messages(&self) -> Vec<OutboundMessage> {
        self.shared.state.lock().outbound.iter().cloned().collect()
    }

    /// Close the transport. Registrations and queued publishes are kept.
    pub fn close(&self) {
        let transport = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            state.connection = ConnectionState::Disconnected;
            state.transport.take()
        };
        if let Some(transport) = transport {
            info!("Closing pub/sub transport");
            transport.close();
        }
    }

    fn send_unsub(state: &ClientState, channel: &str) {
        if let Some(transport) = state.ready_transport() {
            send_or_defer(
                transport.as_ref(),
                &ClientFrame::Unsub {
                    channel: channel.to_string(),
                },
            );
        }
    }
}

impl Shared {
    fn handle_open(&self, generation: u64, status_code: u16, status_message: &str) {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Ignoring open from a replaced transport");
            return;
        }

        state.connection = ConnectionState::Open;
        info!(
            "Pub/sub connection open ({status_code} {status_message}), replaying {} channels and {} queued messages",
            state.registry.len(),
            state.outbound.len()
        );

        let Some(transport) = state.transport.clone() else {
            return;
        };

        for channel in state.registry.channels() {
            send_or_defer(transport.as_ref(), &ClientFrame::Sub { channel });
        }

        let mut pending = state.outbound.drain_all().into_iter();
        while let Some(message) = pending.next() {
            let frame = ClientFrame::Pub {
                channel: message.channel.clone(),
                data: message.data.clone(),
            };
            if let Err(e) = send_frame(transport.as_ref(), &frame) {
                warn!("Replay interrupted ({e}), keeping remaining messages queued");
                let mut unsent = vec![message];
                unsent.extend(pending);
                state.outbound.requeue_front(unsent);
                return;
            }
        }
        state.outbound.commit();
    }

    fn handle_message(&self, generation: u64, text: &str) {
        let delivery = match Delivery::parse(text) {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!("Dropping inbound frame: {e}");
                return;
            }
        };

        let dispatch = {
            let state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.registry.dispatch(&delivery.channel)
        };

        if dispatch.is_empty() {
            debug!("No handlers for channel {}", delivery.channel);
            return;
        }

        dispatch.run(&delivery.data, |channel, handler| {
            self.state.lock().registry.contains(channel, handler)
        });
    }

    fn handle_disconnect(&self, generation: u64, reason: &str) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        state.connection = ConnectionState::Disconnected;
        info!(
            "Pub/sub connection lost ({reason}); {} channels and {} queued messages kept for replay",
            state.registry.len(),
            state.outbound.len()
        );
    }
}

/// Listener handed to one transport. Events are ignored once the client
/// has moved on to a newer transport.
struct TransportBinding {
    shared: Weak<Shared>,
    generation: u64,
}

impl TransportListener for TransportBinding {
    fn on_open(&self, status_code: u16, status_message: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_open(self.generation, status_code, status_message);
        }
    }

    fn on_message(&self, text: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_message(self.generation, text);
        }
    }

    fn on_close(&self, reason: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_disconnect(self.generation, reason);
        }
    }

    fn on_error(&self, error: &PubSubError) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_disconnect(self.generation, &error.to_string());
        }
    }
}

fn send_frame(transport: &dyn Transport, frame: &ClientFrame) -> Result<()> {
    let text = frame.to_text()?;
    transport.send(&text)?;
    debug!("Sent frame {text}");
    Ok(())
}

/// Control frames that fail to send are covered by the next replay.
fn send_or_defer(transport: &dyn Transport, frame: &ClientFrame) {
    if let Err(e) = send_frame(transport, frame) {
        debug!("Deferring {frame:?} until next open: {e}");
    }
}
