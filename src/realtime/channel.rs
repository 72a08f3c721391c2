// src/realtime/channel.rs
// Single long-lived realtime connection with transport-level reconnection

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::packet::{DEFAULT_NAMESPACE, EnginePacket, Handshake, SocketPacket, SocketPacketKind};
use crate::config::{ClientConfig, ReconnectConfig};
use crate::error::{AresError, Result};
use crate::types::{ChatMessage, ConnectionState, OutboundMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound for the WebSocket + Socket.IO handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Inbound events buffered between the connection task and the dispatcher
const EVENT_BUFFER: usize = 256;

/// Inbound signals surfaced to the chat widget
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Socket.IO connection established
    Connect,
    /// Connection lost or closed
    Disconnect,
    /// Server greeting (`connected` event)
    Connected { message: String },
    /// Broadcast chat message (`new_message` event)
    NewMessage(ChatMessage),
}

impl ChannelEvent {
    /// Map a named Socket.IO event to a channel event. Unknown names yield `None`.
    pub fn from_wire(name: &str, payload: Option<&serde_json::Value>) -> Option<Self> {
        match name {
            "connected" => {
                let message = payload
                    .and_then(|p| p.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string();
                Some(ChannelEvent::Connected { message })
            }
            "new_message" => {
                let payload = payload?.clone();
                match serde_json::from_value::<ChatMessage>(payload) {
                    Ok(message) => Some(ChannelEvent::NewMessage(message)),
                    Err(e) => {
                        warn!("Dropping malformed new_message: {}", e);
                        None
                    }
                }
            }
            other => {
                debug!("Ignoring unknown realtime event: {}", other);
                None
            }
        }
    }
}

/// Where the realtime endpoint lives and how to retry it
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub url: Url,
    pub reconnect: ReconnectConfig,
}

impl RealtimeConfig {
    /// Derive the Socket.IO WebSocket endpoint from the REST base URL
    pub fn from_backend_url(backend_url: &str, reconnect: ReconnectConfig) -> Result<Self> {
        Ok(Self {
            url: socket_url(backend_url)?,
            reconnect,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::from_backend_url(&config.backend_url, config.reconnect.clone())
    }
}

/// `http(s)://host[:port]` -> `ws(s)://host[:port]/socket.io/?EIO=4&transport=websocket`
pub fn socket_url(backend_url: &str) -> Result<Url> {
    let mut url = Url::parse(backend_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AresError::Config(format!("unsupported realtime scheme: {other}")));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AresError::Config(format!("cannot use scheme {scheme} for {backend_url}")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

/// Outbound emit waiting for the connection task's verdict
struct EmitRequest {
    payload: OutboundMessage,
    reply: oneshot::Sender<Result<()>>,
}

/// Cloneable handle for the outbound `user_message` action
#[derive(Clone)]
pub struct ChannelSender {
    outbound: mpsc::Sender<EmitRequest>,
    state: watch::Receiver<ConnectionState>,
}

impl ChannelSender {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Emit `user_message`. Fails with `NotConnected` instead of queueing.
    pub async fn emit_user_message(&self, payload: OutboundMessage) -> Result<()> {
        if !self.state().is_connected() {
            return Err(AresError::NotConnected);
        }
        let (reply, verdict) = oneshot::channel();
        self.outbound
            .send(EmitRequest { payload, reply })
            .await
            .map_err(|_| AresError::NotConnected)?;
        verdict.await.map_err(|_| AresError::NotConnected)?
    }
}

/// One realtime connection, scoped to the widget that opened it.
///
/// Call [`RealtimeChannel::close`] on unmount; dropping the channel also stops
/// the connection task.
pub struct RealtimeChannel {
    events: mpsc::Receiver<ChannelEvent>,
    sender: ChannelSender,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    pub fn open(config: RealtimeConfig) -> Result<Self> {
        if !matches!(config.url.scheme(), "ws" | "wss") {
            return Err(AresError::Config(format!(
                "realtime URL must be ws or wss: {}",
                config.url
            )));
        }

        let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let shutdown = CancellationToken::new();

        let task = ConnectionTask {
            config,
            events: event_tx,
            outbound: outbound_rx,
            state: state_tx,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(task.run());

        Ok(Self {
            events,
            sender: ChannelSender {
                outbound: outbound_tx,
                state: state_rx,
            },
            shutdown,
            task: Some(handle),
        })
    }

    /// Next inbound event; `None` once the connection task has stopped
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    pub fn sender(&self) -> ChannelSender {
        self.sender.clone()
    }

    /// Disconnect and wait for the connection task to finish
    pub async fn close(mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!("Realtime task exited abnormally: {}", e);
            return Err(AresError::Protocol(format!("realtime task failed: {e}")));
        }
        info!("Realtime channel closed");
        Ok(())
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Why a served connection ended
#[derive(Debug, PartialEq, Eq)]
enum ServeOutcome {
    /// Local close requested
    Shutdown,
    /// Transport failure; retry per policy
    Lost,
    /// Server sent a Socket.IO disconnect; do not retry
    Kicked,
}

/// What to do with one inbound frame
#[derive(Debug, PartialEq)]
enum FrameAction {
    Reply(String),
    Deliver(ChannelEvent),
    Closed,
    ServerDisconnect,
    Ignore,
}

fn classify_frame(text: &str) -> FrameAction {
    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping malformed frame: {}", e);
            return FrameAction::Ignore;
        }
    };

    match packet {
        EnginePacket::Ping(data) => FrameAction::Reply(EnginePacket::Pong(data).encode()),
        EnginePacket::Close => FrameAction::Closed,
        EnginePacket::Message(body) => match SocketPacket::decode(&body) {
            Ok(socket) if socket.namespace != DEFAULT_NAMESPACE => {
                debug!(namespace = %socket.namespace, kind = ?socket.kind, "Ignoring packet for foreign namespace");
                FrameAction::Ignore
            }
            Ok(socket) => match socket.kind {
                SocketPacketKind::Event => socket
                    .event_parts()
                    .and_then(|(name, payload)| ChannelEvent::from_wire(name, payload))
                    .map_or(FrameAction::Ignore, FrameAction::Deliver),
                SocketPacketKind::Disconnect => FrameAction::ServerDisconnect,
                _ => FrameAction::Ignore,
            },
            Err(e) => {
                warn!("Dropping malformed socket packet: {}", e);
                FrameAction::Ignore
            }
        },
        _ => FrameAction::Ignore,
    }
}

struct ConnectionTask {
    config: RealtimeConfig,
    events: mpsc::Sender<ChannelEvent>,
    outbound: mpsc::Receiver<EmitRequest>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            let url = self.config.url.clone();
            let connected = self.while_disconnected(connect(url)).await;
            let outcome = match connected {
                None => return,
                Some(Ok((ws, handshake))) => {
                    attempt = 0;
                    info!(sid = %handshake.sid, "Realtime channel connected");
                    self.state.send_replace(ConnectionState::Connected);
                    if !self.deliver(ChannelEvent::Connect).await {
                        return;
                    }

                    let outcome = self.serve(ws, &handshake).await;
                    self.state.send_replace(ConnectionState::Disconnected);
                    if outcome == ServeOutcome::Shutdown {
                        return;
                    }
                    info!(?outcome, "Realtime channel disconnected");
                    if !self.deliver(ChannelEvent::Disconnect).await {
                        return;
                    }
                    outcome
                }
                Some(Err(e)) => {
                    warn!(attempt, "Realtime connect failed: {}", e);
                    ServeOutcome::Lost
                }
            };

            if outcome == ServeOutcome::Kicked {
                return;
            }
            if self.config.reconnect.exhausted(attempt) {
                warn!(attempt, "Giving up on realtime reconnection");
                return;
            }

            let delay = self.config.reconnect.delay_for(attempt);
            attempt = attempt.saturating_add(1);
            debug!(?delay, attempt, "Reconnecting");
            if self.while_disconnected(tokio::time::sleep(delay)).await.is_none() {
                return;
            }
        }
    }

    /// Forward an event to the dispatcher; `false` once nobody is listening
    async fn deliver(&self, event: ChannelEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    /// Drive `fut` while rejecting emits; `None` if shutdown wins
    async fn while_disconnected<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                output = &mut fut => return Some(output),
                Some(request) = self.outbound.recv() => {
                    let _ = request.reply.send(Err(AresError::NotConnected));
                }
            }
        }
    }

    async fn serve(&mut self, ws: WsStream, handshake: &Handshake) -> ServeOutcome {
        let (mut sink, mut stream) = ws.split();
        let liveness = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
        // Only inbound frames push the deadline back
        let heartbeat = tokio::time::sleep(liveness);
        tokio::pin!(heartbeat);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    let _ = sink.send(Message::Text(SocketPacket::disconnect().to_frame().into())).await;
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return ServeOutcome::Shutdown;
                }
                Some(request) = self.outbound.recv() => {
                    let frame = match serde_json::to_value(&request.payload) {
                        Ok(payload) => SocketPacket::event("user_message", payload).to_frame(),
                        Err(e) => {
                            let _ = request.reply.send(Err(e.into()));
                            continue;
                        }
                    };
                    let result = sink.send(Message::Text(frame.into())).await;
                    let failed = result.is_err();
                    let _ = request.reply.send(result.map_err(AresError::from));
                    if failed {
                        return ServeOutcome::Lost;
                    }
                }
                frame = stream.next() => {
                    heartbeat.as_mut().reset(tokio::time::Instant::now() + liveness);
                    let text = match frame {
                        None | Some(Ok(Message::Close(_))) => return ServeOutcome::Lost,
                        Some(Err(e)) => {
                            warn!("Realtime transport error: {}", e);
                            return ServeOutcome::Lost;
                        }
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(_)) => continue,
                    };

                    match classify_frame(text.as_str()) {
                        FrameAction::Reply(reply) => {
                            if sink.send(Message::Text(reply.into())).await.is_err() {
                                return ServeOutcome::Lost;
                            }
                        }
                        FrameAction::Deliver(event) => {
                            if !self.deliver(event).await {
                                return ServeOutcome::Shutdown;
                            }
                        }
                        FrameAction::Closed => return ServeOutcome::Lost,
                        FrameAction::ServerDisconnect => return ServeOutcome::Kicked,
                        FrameAction::Ignore => {}
                    }
                }
                _ = &mut heartbeat => {
                    warn!("Realtime heartbeat timed out");
                    return ServeOutcome::Lost;
                }
            }
        }
    }
}

/// WebSocket handshake, Engine.IO open, Socket.IO connect
async fn connect(url: Url) -> Result<(WsStream, Handshake)> {
    tokio::time::timeout(CONNECT_TIMEOUT, handshake(url))
        .await
        .map_err(|_| AresError::Protocol("realtime handshake timed out".to_string()))?
}

async fn handshake(url: Url) -> Result<(WsStream, Handshake)> {
    let (mut ws, _) = connect_async(url.as_str()).await?;

    let open = match next_engine_packet(&mut ws).await? {
        EnginePacket::Open(open) => open,
        other => {
            return Err(AresError::Protocol(format!("expected open packet, got {other:?}")));
        }
    };
    debug!(sid = %open.sid, ping_interval = open.ping_interval, "Engine handshake received");

    ws.send(Message::Text(SocketPacket::connect().to_frame().into())).await?;

    loop {
        match next_engine_packet(&mut ws).await? {
            EnginePacket::Ping(data) => {
                ws.send(Message::Text(EnginePacket::Pong(data).encode().into())).await?;
            }
            EnginePacket::Message(body) => {
                let packet = SocketPacket::decode(&body)?;
                if packet.namespace != DEFAULT_NAMESPACE {
                    debug!(namespace = %packet.namespace, "Ignoring packet for foreign namespace");
                    continue;
                }
                match packet.kind {
                    SocketPacketKind::Connect => return Ok((ws, open)),
                    SocketPacketKind::ConnectError => {
                        let reason = packet.data.map(|d| d.to_string()).unwrap_or_default();
                        return Err(AresError::Protocol(format!("connect rejected: {reason}")));
                    }
                    _ => debug!(kind = ?packet.kind, "Ignoring packet before connect ack"),
                }
            }
            EnginePacket::Close => {
                return Err(AresError::Protocol("closed during handshake".to_string()));
            }
            _ => {}
        }
    }
}

async fn next_engine_packet(ws: &mut WsStream) -> Result<EnginePacket> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return EnginePacket::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                return Err(AresError::Protocol("connection closed during handshake".to_string()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
