// src/chat/widget.rs
// Live support chat: message list, connection state and the two send paths

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ErrorClass, Result};
use crate::realtime::{ChannelEvent, ChannelSender};
use crate::types::{ChatMessage, ConnectionState, OutboundMessage, Session};

/// REST side of the chat: history snapshot and admin send
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_history(&self) -> Result<Vec<ChatMessage>>;
    async fn send_as_admin(&self, token: &str, message: &str) -> Result<()>;
}

/// Realtime side of the chat: anonymous send
#[async_trait]
pub trait RealtimeSender: Send + Sync {
    async fn emit_user_message(&self, payload: OutboundMessage) -> Result<()>;
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn fetch_history(&self) -> Result<Vec<ChatMessage>> {
        self.fetch_chat_messages().await
    }

    async fn send_as_admin(&self, token: &str, message: &str) -> Result<()> {
        self.send_chat_message(token, message).await
    }
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn fetch_history(&self) -> Result<Vec<ChatMessage>> {
        (**self).fetch_history().await
    }

    async fn send_as_admin(&self, token: &str, message: &str) -> Result<()> {
        (**self).send_as_admin(token, message).await
    }
}

#[async_trait]
impl RealtimeSender for ChannelSender {
    async fn emit_user_message(&self, payload: OutboundMessage) -> Result<()> {
        ChannelSender::emit_user_message(self, payload).await
    }
}

#[async_trait]
impl<T: RealtimeSender + ?Sized> RealtimeSender for Arc<T> {
    async fn emit_user_message(&self, payload: OutboundMessage) -> Result<()> {
        (**self).emit_user_message(payload).await
    }
}

/// Which transport a send uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoute {
    /// Admin: POST /api/chat/send with the bearer token
    Rest,
    /// Everyone else: `user_message` over the realtime channel
    Realtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank draft; nothing happened
    Ignored,
    Delivered(SendRoute),
    /// Logged; the draft is kept for the user to resend
    Failed(SendRoute),
}

/// Sends rejected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("please enter your name before sending")]
    MissingDisplayName,

    #[error("chat is disconnected")]
    Disconnected,
}

impl ChatError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChatError::MissingDisplayName => ErrorClass::Validation,
            ChatError::Disconnected => ErrorClass::Network,
        }
    }
}

/// Chat widget state plus the transports it sends through
pub struct ChatWidget<B, R> {
    backend: B,
    realtime: R,
    session: Option<Session>,
    is_open: bool,
    history_requested: bool,
    messages: Vec<ChatMessage>,
    connection: ConnectionState,
    draft: String,
    display_name: String,
    scroll_anchor: Option<usize>,
    last_notice: Option<String>,
}

impl<B: ChatBackend, R: RealtimeSender> ChatWidget<B, R> {
    pub fn new(backend: B, realtime: R, session: Option<Session>) -> Self {
        let mut widget = Self {
            backend,
            realtime,
            session: None,
            is_open: false,
            history_requested: false,
            messages: Vec::new(),
            connection: ConnectionState::Disconnected,
            draft: String::new(),
            display_name: String::new(),
            scroll_anchor: None,
            last_notice: None,
        };
        widget.set_session(session);
        widget
    }

    /// Adopt a new identity (login or logout while mounted)
    pub fn set_session(&mut self, session: Option<Session>) {
        if let Some(session) = &session {
            if !session.is_admin() && self.display_name.trim().is_empty() {
                self.display_name = session.user.username.clone();
            }
        }
        self.session = session;
    }

    // ========================================================================
    // VISIBILITY
    // ========================================================================

    /// Show the widget; the first open fetches the history snapshot
    pub async fn open(&mut self) {
        self.is_open = true;
        if !self.history_requested {
            self.history_requested = true;
            self.load_history().await;
        }
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub async fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open().await;
        }
    }

    async fn load_history(&mut self) {
        let snapshot = match self.backend.fetch_history().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to load chat history: {}", e);
                return;
            }
        };
        debug!(count = snapshot.len(), "Loaded chat history");

        // Live messages that raced the snapshot stay, unless the snapshot already has them
        let known: HashSet<i64> = snapshot.iter().map(|m| m.id).collect();
        let live = std::mem::replace(&mut self.messages, snapshot);
        self.messages
            .extend(live.into_iter().filter(|m| !known.contains(&m.id)));
        self.follow_latest();
    }

    // ========================================================================
    // INBOUND
    // ========================================================================

    /// Apply one inbound realtime event
    pub fn dispatch(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connect => {
                self.connection = ConnectionState::Connected;
                info!("Connected to chat");
            }
            ChannelEvent::Disconnect => {
                self.connection = ConnectionState::Disconnected;
                info!("Disconnected from chat");
            }
            ChannelEvent::Connected { message } => {
                info!("{}", message);
                self.last_notice = Some(message);
            }
            ChannelEvent::NewMessage(message) => {
                self.messages.push(message);
                self.follow_latest();
            }
        }
    }

    fn follow_latest(&mut self) {
        self.scroll_anchor = self.messages.len().checked_sub(1);
    }

    // ========================================================================
    // OUTBOUND
    // ========================================================================

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Route selected by the current identity
    pub fn route(&self) -> SendRoute {
        match &self.session {
            Some(session) if session.is_admin() => SendRoute::Rest,
            _ => SendRoute::Realtime,
        }
    }

    /// Whether the send control is enabled
    pub fn can_send(&self) -> bool {
        self.connection.is_connected() && !self.draft.trim().is_empty()
    }

    /// Send the current draft through the route the identity selects.
    ///
    /// Validation failures return `Err` without touching the network.
    /// Transport failures are logged and leave the draft in place.
    pub async fn submit(&mut self) -> std::result::Result<SendOutcome, ChatError> {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if !self.connection.is_connected() {
            return Err(ChatError::Disconnected);
        }

        let route = self.route();
        let result = match (route, &self.session) {
            (SendRoute::Rest, Some(session)) => self.backend.send_as_admin(&session.token, &text).await,
            _ => {
                let username = self.display_name.trim();
                if username.is_empty() {
                    return Err(ChatError::MissingDisplayName);
                }
                let payload = OutboundMessage {
                    username: username.to_string(),
                    message: text,
                };
                self.realtime.emit_user_message(payload).await
            }
        };

        match result {
            Ok(()) => {
                self.draft.clear();
                Ok(SendOutcome::Delivered(route))
            }
            Err(e) => {
                warn!(?route, "Failed to send chat message: {}", e);
                Ok(SendOutcome::Failed(route))
            }
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Index of the message the view should be scrolled to
    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    /// Greeting from the last `connected` event
    pub fn last_notice(&self) -> Option<&str> {
        self.last_notice.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
