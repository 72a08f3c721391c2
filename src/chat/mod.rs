// src/chat/mod.rs
// Live support chat widget

mod widget;

pub use widget::{ChatBackend, ChatError, ChatWidget, RealtimeSender, SendOutcome, SendRoute};
