// src/realtime/packet.rs
// Engine.IO v4 / Socket.IO v5 text packet codec

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AresError, Result};

/// Default Socket.IO namespace
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO open handshake payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Transport-level packet; one per WebSocket text frame
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| AresError::Protocol("empty engine frame".to_string()))?;
        let body = chars.as_str();

        Ok(match kind {
            '0' => EnginePacket::Open(serde_json::from_str(body)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(body.to_string()),
            '3' => EnginePacket::Pong(body.to_string()),
            '4' => EnginePacket::Message(body.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => {
                return Err(AresError::Protocol(format!("unknown engine packet type {other:?}")));
            }
        })
    }

    /// Encode for the wire. `Open` is server-only and encodes as an empty open.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
}

impl SocketPacketKind {
    fn code(self) -> char {
        match self {
            SocketPacketKind::Connect => '0',
            SocketPacketKind::Disconnect => '1',
            SocketPacketKind::Event => '2',
            SocketPacketKind::Ack => '3',
            SocketPacketKind::ConnectError => '4',
        }
    }
}

/// Application-level packet carried inside an engine `Message`
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Connect request for the default namespace
    pub fn connect() -> Self {
        Self::new(SocketPacketKind::Connect, None)
    }

    pub fn disconnect() -> Self {
        Self::new(SocketPacketKind::Disconnect, None)
    }

    /// `[name, payload]` event on the default namespace
    pub fn event(name: &str, payload: Value) -> Self {
        Self::new(
            SocketPacketKind::Event,
            Some(Value::Array(vec![Value::String(name.to_string()), payload])),
        )
    }

    fn new(kind: SocketPacketKind, data: Option<Value>) -> Self {
        Self {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            data,
        }
    }

    pub fn decode(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = match chars.next() {
            Some('0') => SocketPacketKind::Connect,
            Some('1') => SocketPacketKind::Disconnect,
            Some('2') => SocketPacketKind::Event,
            Some('3') => SocketPacketKind::Ack,
            Some('4') => SocketPacketKind::ConnectError,
            Some('5' | '6') => {
                return Err(AresError::Protocol("binary packets are not supported".to_string()));
            }
            Some(other) => {
                return Err(AresError::Protocol(format!("unknown socket packet type {other:?}")));
            }
            None => return Err(AresError::Protocol("empty socket packet".to_string())),
        };
        let mut rest = chars.as_str();

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    namespace = rest[..end].to_string();
                    rest = &rest[end + 1..];
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| AresError::Protocol("ack id out of range".to_string()))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.code());
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Wrap in an engine message frame
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }

    /// Event name and first argument, for `Event` packets
    pub fn event_parts(&self) -> Option<(&str, Option<&Value>)> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }
        let items = self.data.as_ref()?.as_array()?;
        let name = items.first()?.as_str()?;
        Some((name, items.get(1)))
    }
}
