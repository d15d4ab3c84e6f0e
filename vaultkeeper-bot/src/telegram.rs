//! Telegram adapter.
//!
//! Wraps a [`teloxide::Bot`] as the core's [`Transport`] and reduces
//! teloxide updates to the core's [`Update`].

use async_trait::async_trait;
use std::time::Duration;
use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters};
use teloxide::requests::Requester;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage, MessageId,
    ParseMode, UpdateKind,
};
use teloxide::{ApiError, RequestError};
use vaultkeeper_core::{
    BotError, CallbackQuery, IncomingMessage, InlineKeyboard, OutgoingMessage, Result, Transport,
    Update,
};

/// Bot API client for the core
#[derive(Clone)]
pub struct TelegramClient {
    api: teloxide::Bot,
}

impl TelegramClient {
    /// Build a client whose HTTP timeout outlasts a long poll of
    /// `poll_timeout`
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(poll_timeout + Duration::from_secs(30))
            .build()
            .map_err(|e| BotError::Transport(e.without_url().to_string()))?;
        let Ok(url) = api_url.parse() else {
            return Err(BotError::Transport(format!("Invalid API url: {}", api_url)));
        };

        Ok(Self {
            api: teloxide::Bot::with_client(token, client).set_api_url(url),
        })
    }

    pub fn api(&self) -> &teloxide::Bot {
        &self.api
    }
}

fn transport_error(method: &str, error: RequestError) -> BotError {
    BotError::Transport(format!("{}: {}", method, error))
}

/// Errors that mean the requested state already holds
fn already_applied(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(ApiError::MessageToDeleteNotFound | ApiError::MessageNotModified)
    )
}

fn to_markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| {
                InlineKeyboardButton::callback(button.text.clone(), button.callback_data.clone())
            })
            .collect::<Vec<_>>()
    }))
}

/// Reduce a teloxide update to the core's update type
///
/// Anything other than a text message with a sender or a button press with
/// data is skipped.
pub fn into_update(update: &teloxide::types::Update) -> Option<Update> {
    match &update.kind {
        UpdateKind::Message(message) => {
            let user = message.from.as_ref()?;
            Some(Update::Message(IncomingMessage {
                chat_id: message.chat.id.0,
                user_id: user.id.0 as i64,
                message_id: i64::from(message.id.0),
                text: message.text()?.to_string(),
                reply_text: message
                    .reply_to_message()
                    .and_then(|reply| reply.text())
                    .map(str::to_string),
            }))
        }
        UpdateKind::CallbackQuery(query) => {
            let (chat_id, message_id) = match query.message.as_ref()? {
                MaybeInaccessibleMessage::Regular(message) => (message.chat.id, message.id),
                MaybeInaccessibleMessage::Inaccessible(message) => {
                    (message.chat.id, message.message_id)
                }
            };
            Some(Update::Callback(CallbackQuery {
                callback_id: query.id.clone(),
                chat_id: chat_id.0,
                user_id: query.from.id.0 as i64,
                message_id: i64::from(message_id.0),
                data: query.data.clone()?,
            }))
        }
        _ => None,
    }
}

fn message_id(id: i64) -> Result<MessageId> {
    i32::try_from(id)
        .map(MessageId)
        .map_err(|_| BotError::Transport(format!("Message id out of range: {}", id)))
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_message(&self, chat_id: i64, message: OutgoingMessage) -> Result<i64> {
        let mut request = self.api.send_message(ChatId(chat_id), message.text);
        if message.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }

        let sent = request
            .await
            .map_err(|e| transport_error("sendMessage", e))?;
        Ok(i64::from(sent.id.0))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        message: OutgoingMessage,
    ) -> Result<()> {
        let mut request =
            self.api
                .edit_message_text(ChatId(chat_id), self::message_id(message_id)?, message.text);
        if message.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }

        match request.await {
            Ok(_) => Ok(()),
            Err(e) if already_applied(&e) => {
                tracing::debug!(chat_id, message_id, "Edit left message unchanged");
                Ok(())
            }
            Err(e) => Err(transport_error("editMessageText", e)),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let request = self
            .api
            .delete_message(ChatId(chat_id), self::message_id(message_id)?);

        match request.await {
            Ok(_) => Ok(()),
            Err(e) if already_applied(&e) => {
                tracing::debug!(chat_id, message_id, "Message already deleted");
                Ok(())
            }
            Err(e) => Err(transport_error("deleteMessage", e)),
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self.api.answer_callback_query(callback_id);
        if let Some(text) = text {
            request = request.text(text);
        }

        request
            .await
            .map(|_| ())
            .map_err(|e| transport_error("answerCallbackQuery", e))
    }
}
