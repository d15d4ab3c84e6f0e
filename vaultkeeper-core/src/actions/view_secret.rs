use super::{unlock_or_close, SECRET_NOT_FOUND};
use crate::bot::Bot;
use crate::callback::{CallbackAction, CallbackPayload};
use crate::database::Secret;
use crate::dispatch::{Handler, Request};
use crate::session::UnlockedSession;
use crate::transport::{InlineButton, InlineKeyboard, OutgoingMessage};
use crate::Result;
use async_trait::async_trait;
use teloxide::utils::html::escape;

/// A secret button: turn the menu into the secret's card
pub struct ViewSecret;

#[async_trait]
impl Handler for ViewSecret {
    async fn handle(&self, bot: &Bot, request: &Request<'_>) -> Result<()> {
        let Request::Callback { query, payload } = request else {
            return Ok(());
        };
        let secret_id = payload.require_secret_id()?;

        let Some(unlocked) = unlock_or_close(bot, query, payload).await? else {
            return Ok(());
        };

        let Some(secret) = bot.database().get_secret(unlocked.user.user_id, secret_id)? else {
            return bot
                .transport()
                .answer_callback(&query.callback_id, Some(SECRET_NOT_FOUND))
                .await;
        };

        let card = secret_card(&unlocked, &secret, payload)?;
        bot.transport()
            .edit_message(query.chat_id, query.message_id, card)
            .await?;
        bot.transport().answer_callback(&query.callback_id, None).await
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// HTML card with the decrypted login and password
pub fn secret_card(
    unlocked: &UnlockedSession,
    secret: &Secret,
    payload: &CallbackPayload,
) -> Result<OutgoingMessage> {
    let login = unlocked.decrypt_field(&secret.login)?;
    let password = unlocked.decrypt_field(&secret.password)?;

    let description = if secret.description.is_empty() {
        "-".to_string()
    } else {
        format!("<blockquote>{}</blockquote>", escape(&secret.description))
    };

    let text = format!(
        "<b>=== {} ===</b>\n\nLogin: <code>{}</code>\nPassword: <code>{}</code>\nWhere to use: {}\n\n<i>Description:</i>\n{}",
        escape(&secret.title),
        escape(&login),
        escape(&password),
        escape(or_dash(&secret.site_link)),
        description,
    );

    let back = CallbackPayload::new(CallbackAction::Current, payload.token.as_str(), payload.offset);
    let delete = back
        .with_action(CallbackAction::Delete)
        .with_secret(secret.secret_id);
    let keyboard = InlineKeyboard::new().row(vec![
        InlineButton::new("Back", back.encode()),
        InlineButton::new("Delete", delete.encode()),
    ]);

    Ok(OutgoingMessage::html(text).with_keyboard(keyboard))
}
