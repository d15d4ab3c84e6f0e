use super::{render_menu, unlock_or_close, SECRET_DELETED, SECRET_NOT_FOUND};
use crate::bot::Bot;
use crate::dispatch::{Handler, Request};
use crate::Result;
use async_trait::async_trait;
use tracing::info;

/// The Delete button on a secret card
pub struct DeleteSecret;

#[async_trait]
impl Handler for DeleteSecret {
    async fn handle(&self, bot: &Bot, request: &Request<'_>) -> Result<()> {
        let Request::Callback { query, payload } = request else {
            return Ok(());
        };
        let secret_id = payload.require_secret_id()?;

        let Some(unlocked) = unlock_or_close(bot, query, payload).await? else {
            return Ok(());
        };
        let user_id = unlocked.user.user_id;

        let notice = if bot.database().delete_secret(user_id, secret_id)? {
            info!(secret_id, "Secret deleted");
            SECRET_DELETED
        } else {
            SECRET_NOT_FOUND
        };
        bot.transport()
            .answer_callback(&query.callback_id, Some(notice))
            .await?;

        // The page may have emptied; rendering wraps the offset
        let menu = render_menu(bot, user_id, &payload.token, payload.offset)?;
        bot.transport()
            .edit_message(query.chat_id, query.message_id, menu)
            .await
    }
}
