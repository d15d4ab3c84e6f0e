//! Chat transport abstraction.
//!
//! The core never talks to Telegram directly. Incoming events are reduced to
//! [`Update`] values and replies go out through a [`Transport`].

use crate::Result;
use async_trait::async_trait;

/// A plain text message from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub text: String,
    /// Text of the message this one replies to, if any
    pub reply_text: Option<String>,
}

impl IncomingMessage {
    /// The command name without the leading slash or `@botname` suffix
    pub fn command(&self) -> Option<&str> {
        let first = self.text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    pub fn is_command(&self) -> bool {
        self.command().is_some()
    }
}

/// A press on an inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub chat_id: i64,
    pub user_id: i64,
    /// The bot message that carries the keyboard
    pub message_id: i64,
    pub data: String,
}

/// Everything the bot reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Message(IncomingMessage),
    Callback(CallbackQuery),
}

impl Update {
    pub fn chat_id(&self) -> i64 {
        match self {
            Update::Message(message) => message.chat_id,
            Update::Callback(query) => query.chat_id,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Update::Message(message) => message.user_id,
            Update::Callback(query) => query.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, skipping empty ones
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

/// A message to send or an edit to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
    /// Render `text` as Telegram HTML
    pub html: bool,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            ..Default::default()
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Outbound side of the chat
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message and return its id
    async fn send_message(&self, chat_id: i64, message: OutgoingMessage) -> Result<i64>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, message: OutgoingMessage)
        -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
