// src/cli/repl.rs
// Interactive chat REPL driving the chat widget

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::display::TerminalDisplay;
use crate::api::ApiClient;
use crate::chat::{ChatError, ChatWidget, SendOutcome};
use crate::realtime::{ChannelEvent, ChannelSender, RealtimeChannel, RealtimeConfig};
use crate::types::Session;

const PROMPT: &str = "> ";

/// What the line-reader thread hands to the async loop
#[derive(Debug, PartialEq, Eq)]
enum ReplInput {
    Line(String),
    Interrupted,
    Eof,
}

/// Chat REPL: one realtime channel, one widget, one terminal
pub struct ChatRepl {
    widget: ChatWidget<ApiClient, ChannelSender>,
    channel: RealtimeChannel,
    display: TerminalDisplay,
    history_path: PathBuf,
}

impl ChatRepl {
    /// Open the realtime channel and mount the widget. Needs a tokio runtime.
    pub fn new(
        api: ApiClient,
        realtime: RealtimeConfig,
        session: Option<Session>,
        display_name: Option<String>,
        display: TerminalDisplay,
        history_path: PathBuf,
    ) -> Result<Self> {
        let channel = RealtimeChannel::open(realtime).context("Failed to open realtime channel")?;
        let mut widget = ChatWidget::new(api, channel.sender(), session);
        if let Some(name) = display_name {
            widget.set_display_name(name);
        }

        Ok(Self {
            widget,
            channel,
            display,
            history_path,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.widget.open().await;
        for message in self.widget.messages() {
            self.display.print_message(message);
        }
        self.display.print_info("Type a message, /help for commands, Ctrl+D to leave");
        self.display.print_route(self.widget.route(), self.widget.display_name());

        let (line_tx, mut lines) = mpsc::channel(16);
        let history_path = self.history_path.clone();
        // Plain thread: a blocked readline must not hold up runtime shutdown
        std::thread::spawn(move || read_lines(history_path, line_tx));

        loop {
            tokio::select! {
                event = self.channel.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        self.display.print_error("Realtime channel stopped");
                        break;
                    }
                },
                input = lines.recv() => match input {
                    Some(ReplInput::Line(line)) => {
                        if !self.handle_line(&line).await {
                            break;
                        }
                    }
                    Some(ReplInput::Interrupted) => continue,
                    Some(ReplInput::Eof) | None => break,
                },
            }
        }

        self.widget.close();
        self.channel.close().await?;
        Ok(())
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        self.widget.dispatch(event.clone());
        match event {
            ChannelEvent::Connect | ChannelEvent::Disconnect => {
                self.display.print_connection(self.widget.connection());
            }
            ChannelEvent::Connected { message } => self.display.print_notice(&message),
            ChannelEvent::NewMessage(_) => {
                if let Some(message) = self.widget.messages().last() {
                    self.display.print_message(message);
                }
            }
        }
    }

    /// Returns `false` when the user asked to leave
    async fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.starts_with('/') {
            return self.handle_command(line);
        }

        self.widget.set_draft(line);
        match self.widget.submit().await {
            Ok(SendOutcome::Delivered(route)) => debug!(?route, "Message sent"),
            Ok(SendOutcome::Ignored) => {}
            Ok(SendOutcome::Failed(_)) => self.display.print_error("Message not sent"),
            Err(ChatError::MissingDisplayName) => {
                self.display.print_error("Set a display name first: /name <name>")
            }
            Err(e @ ChatError::Disconnected) => self.display.print_error(&e.to_string()),
        }
        true
    }

    fn handle_command(&mut self, command: &str) -> bool {
        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        match name {
            "/quit" | "/exit" => return false,
            "/help" => {
                println!("Commands:");
                println!("  /name <name>  - Set the display name for your messages");
                println!("  /status       - Show connection and send route");
                println!("  /help         - Show this help");
                println!("  /quit         - Leave the chat");
            }
            "/name" => {
                let rest = rest.trim();
                if rest.is_empty() {
                    self.display.print_error("Usage: /name <name>");
                } else {
                    self.widget.set_display_name(rest);
                    self.display.print_route(self.widget.route(), self.widget.display_name());
                }
            }
            "/status" => {
                self.display.print_connection(self.widget.connection());
                self.display.print_route(self.widget.route(), self.widget.display_name());
                self.display
                    .print_info(&format!("{} messages", self.widget.messages().len()));
            }
            other => self.display.print_error(&format!("Unknown command: {other}")),
        }
        true
    }
}

/// Blocking readline loop; exits on EOF, `/quit`, or when the REPL is gone
fn read_lines(history_path: PathBuf, lines: mpsc::Sender<ReplInput>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            warn!("Failed to create line editor: {}", e);
            let _ = lines.blocking_send(ReplInput::Eof);
            return;
        }
    };
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
    }

    loop {
        let input = match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                ReplInput::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReplInput::Interrupted,
            Err(ReadlineError::Eof) => ReplInput::Eof,
            Err(e) => {
                warn!("Readline error: {}", e);
                ReplInput::Eof
            }
        };

        let done = match &input {
            ReplInput::Eof => true,
            ReplInput::Line(line) => matches!(line.trim(), "/quit" | "/exit"),
            ReplInput::Interrupted => false,
        };
        if lines.blocking_send(input).is_err() || done {
            break;
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&history_path) {
        debug!("Failed to save history: {}", e);
    }
}
