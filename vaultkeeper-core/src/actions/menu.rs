use super::{login, unlock_or_close};
use crate::bot::Bot;
use crate::callback::{CallbackAction, CallbackPayload};
use crate::dispatch::{Handler, Request};
use crate::pagination::{step_offset, Page};
use crate::steps::StepKey;
use crate::transport::{CallbackQuery, InlineButton, InlineKeyboard, OutgoingMessage};
use crate::Result;
use async_trait::async_trait;

/// `/start` asks for the password; menu buttons page through the secrets
pub struct MainMenu;

#[async_trait]
impl Handler for MainMenu {
    async fn handle(&self, bot: &Bot, request: &Request<'_>) -> Result<()> {
        match request {
            Request::Command { message, .. } => login::ask_password(bot, message).await,
            Request::Callback { query, payload } => show_page(bot, query, payload).await,
        }
    }
}

async fn show_page(bot: &Bot, query: &CallbackQuery, payload: &CallbackPayload) -> Result<()> {
    // Any menu button abandons a half filled form, including its Cancel button
    bot.steps()
        .cancel(StepKey::new(query.chat_id, query.user_id), true)
        .await;

    let Some(unlocked) = unlock_or_close(bot, query, payload).await? else {
        return Ok(());
    };

    let offset = step_offset(payload.action, payload.offset, bot.settings().page_size);
    let menu = render_menu(bot, unlocked.user.user_id, &payload.token, offset)?;

    bot.transport()
        .edit_message(query.chat_id, query.message_id, menu)
        .await?;
    bot.transport().answer_callback(&query.callback_id, None).await
}

/// The menu page containing `offset`
pub fn render_menu(bot: &Bot, user_id: i64, token: &str, offset: i64) -> Result<OutgoingMessage> {
    let page_size = bot.settings().page_size;
    let total = bot.database().count_secrets(user_id)?;
    let page = Page::resolve(offset, total, page_size);
    let secrets = bot.database().list_secrets(user_id, page.offset, page.size)?;

    let base = CallbackPayload::new(CallbackAction::Current, token, page.offset);

    let mut keyboard = InlineKeyboard::new();
    for secret in secrets {
        let data = base
            .with_action(CallbackAction::Show)
            .with_secret(secret.secret_id)
            .encode();
        keyboard = keyboard.row(vec![InlineButton::new(secret.title, data)]);
    }

    let mut navigation = Vec::with_capacity(3);
    if page.has_siblings() {
        navigation.push(InlineButton::new(
            "Back",
            base.with_action(CallbackAction::Prev).encode(),
        ));
    }
    navigation.push(InlineButton::new("+", base.with_action(CallbackAction::Add).encode()));
    if page.has_siblings() {
        navigation.push(InlineButton::new(
            "Next",
            base.with_action(CallbackAction::Next).encode(),
        ));
    }

    let text = format!(
        "Vaultkeeper password manager\nPage: {} / {}\n\nChoose a service to view its password:",
        page.number, page.count
    );

    Ok(OutgoingMessage::text(text).with_keyboard(keyboard.row(navigation)))
}
