// src/realtime/mod.rs
// Realtime chat transport (Socket.IO over WebSocket)

mod channel;
pub mod packet;

pub use channel::{ChannelEvent, ChannelSender, RealtimeChannel, RealtimeConfig, socket_url};
