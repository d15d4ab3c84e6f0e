//! Bot actions and the conversation steps they park.

mod add_secret;
mod delete_secret;
mod login;
mod menu;
mod view_secret;

#[cfg(test)]
mod tests;

pub use add_secret::{AddSecret, AddSecretForm, WizardStage};
pub use delete_secret::DeleteSecret;
pub use menu::{render_menu, MainMenu};
pub use view_secret::{secret_card, ViewSecret};

use crate::bot::Bot;
use crate::callback::{CallbackAction, CallbackPayload};
use crate::dispatch::{Filter, Router};
use crate::session::UnlockedSession;
use crate::steps::StepAction;
use crate::transport::{CallbackQuery, IncomingMessage};
use crate::{BotError, Result};
use async_trait::async_trait;
use tracing::debug;

pub const PASSWORD_PROMPT: &str =
    "Enter the password or reply to a message that contains it:";
pub const NOT_ALLOWED: &str = "You do not belong here.\n\nGo away.";
pub const WRONG_PASSWORD: &str = "Wrong password.\n\nGo away.";
pub const SECRET_CREATION_CANCELLED: &str = "Secret creation cancelled";
pub const SECRET_CREATED: &str = "Secret created";
pub const SECRET_DELETED: &str = "Secret deleted";
pub const SECRET_NOT_FOUND: &str = "Secret not found";

/// A pending conversation step
#[derive(Debug)]
pub enum Conversation {
    /// The next message is the login password
    Login,
    /// One stage of the add-secret wizard
    AddSecret(AddSecretForm),
}

#[async_trait]
impl StepAction<Bot> for Conversation {
    async fn resume(&mut self, bot: &Bot, message: &IncomingMessage) -> Result<()> {
        match self {
            Conversation::Login => login::check_password(bot, message).await,
            Conversation::AddSecret(form) => form.resume(bot, message).await,
        }
    }

    fn finished(&self) -> bool {
        matches!(self, Conversation::AddSecret(form) if form.is_abandoned())
    }
}

/// The routes the bot serves
pub fn default_router(admin_id: i64) -> Router {
    Router::new(admin_id)
        .route("main-menu-command", Filter::Command("start"), MainMenu)
        .route(
            "main-menu-callback",
            Filter::Callback(&[
                CallbackAction::Next,
                CallbackAction::Prev,
                CallbackAction::Current,
            ]),
            MainMenu,
        )
        .route("add-secret", Filter::Callback(&[CallbackAction::Add]), AddSecret)
        .route("view-secret", Filter::Callback(&[CallbackAction::Show]), ViewSecret)
        .route(
            "delete-secret",
            Filter::Callback(&[CallbackAction::Delete]),
            DeleteSecret,
        )
}

/// Unlock the session a button belongs to
///
/// When the session is gone the message carrying the button is deleted and
/// `None` is returned.
pub(crate) async fn unlock_or_close(
    bot: &Bot,
    query: &CallbackQuery,
    payload: &CallbackPayload,
) -> Result<Option<UnlockedSession>> {
    match bot.sessions().unlock(query.user_id, &payload.token) {
        Ok(unlocked) => Ok(Some(unlocked)),
        Err(BotError::NoActiveSession) => {
            debug!(chat_id = query.chat_id, "Closing message of an ended session");
            bot.transport()
                .delete_message(query.chat_id, query.message_id)
                .await?;
            bot.transport().answer_callback(&query.callback_id, None).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Delete a message that may already be gone
pub(crate) async fn delete_quietly(bot: &Bot, chat_id: i64, message_id: i64) {
    if let Err(e) = bot.transport().delete_message(chat_id, message_id).await {
        debug!(chat_id, message_id, "Could not delete message: {}", e);
    }
}
