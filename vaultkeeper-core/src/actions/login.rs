use super::{menu, Conversation, NOT_ALLOWED, PASSWORD_PROMPT, WRONG_PASSWORD};
use crate::bot::Bot;
use crate::session::LoginOutcome;
use crate::steps::{Step, StepKey};
use crate::transport::{IncomingMessage, OutgoingMessage};
use crate::Result;
use tracing::warn;
use zeroize::Zeroizing;

/// Prompt for the password and wait for it
pub(crate) async fn ask_password(bot: &Bot, message: &IncomingMessage) -> Result<()> {
    let key = StepKey::from(message);
    bot.steps().cancel(key, true).await;

    bot.transport()
        .send_message(message.chat_id, OutgoingMessage::text(PASSWORD_PROMPT))
        .await?;
    bot.steps()
        .register(key, Step::new(Conversation::Login).terminal());
    Ok(())
}

/// The answer to the password prompt
///
/// The password may be typed directly or given by replying to a message that
/// contains it; the replied-to text wins.
pub(crate) async fn check_password(bot: &Bot, message: &IncomingMessage) -> Result<()> {
    if message.user_id != bot.settings().admin_id {
        warn!(user_id = message.user_id, "Login attempt from a foreign user");
        bot.transport()
            .send_message(message.chat_id, OutgoingMessage::text(NOT_ALLOWED))
            .await?;
        return Ok(());
    }

    let password = Zeroizing::new(
        message
            .reply_text
            .clone()
            .unwrap_or_else(|| message.text.clone()),
    );

    match bot.sessions().login(message.user_id, &password)? {
        LoginOutcome::WrongPassword => {
            bot.transport()
                .send_message(message.chat_id, OutgoingMessage::text(WRONG_PASSWORD))
                .await?;
        }
        LoginOutcome::Authenticated { session, token } => {
            let menu = menu::render_menu(bot, session.user_id, &token, 0)?;
            bot.transport().send_message(message.chat_id, menu).await?;
        }
    }
    Ok(())
}
