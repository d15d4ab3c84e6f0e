//! The add-secret wizard.
//!
//! Five prompts, one per field. Each answer removes the prompt and the
//! answer from the chat, then parks the next stage with the form filled so
//! far. Login and password are encrypted as soon as they arrive, so the
//! plaintext never sits in the registry.

use super::{
    delete_quietly, unlock_or_close, Conversation, SECRET_CREATED, SECRET_CREATION_CANCELLED,
};
use crate::bot::Bot;
use crate::callback::{CallbackAction, CallbackPayload};
use crate::database::NewSecret;
use crate::dispatch::{Handler, Request};
use crate::session::UnlockedSession;
use crate::steps::{Step, StepKey};
use crate::transport::{IncomingMessage, InlineButton, InlineKeyboard, OutgoingMessage};
use crate::{BotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

/// Answer that leaves an optional field empty
pub const SKIP: &str = "-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WizardStage {
    #[default]
    Title,
    Login,
    Password,
    SiteLink,
    Description,
}

impl WizardStage {
    pub fn prompt(self) -> &'static str {
        match self {
            WizardStage::Title => "Send the name of the secret:",
            WizardStage::Login => "Send the login:",
            WizardStage::Password => "Send the password:",
            WizardStage::SiteLink => "Send a link to the site (or \"-\" to skip):",
            WizardStage::Description => "Send a description (or \"-\" to skip):",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            WizardStage::Title => Some(WizardStage::Login),
            WizardStage::Login => Some(WizardStage::Password),
            WizardStage::Password => Some(WizardStage::SiteLink),
            WizardStage::SiteLink => Some(WizardStage::Description),
            WizardStage::Description => None,
        }
    }

    pub fn is_last(self) -> bool {
        self.next().is_none()
    }
}

/// The wizard's parameter bag
#[derive(Debug, Clone, Default)]
pub struct AddSecretForm {
    pub stage: WizardStage,
    /// Session token and menu offset of the button that opened the form
    pub token: String,
    pub offset: i64,
    /// The prompt currently shown
    pub prompt_message_id: i64,
    pub title: String,
    /// Ciphertext
    pub login: String,
    /// Ciphertext
    pub password: String,
    pub site_link: String,
    pub description: String,
    abandoned: bool,
}

impl AddSecretForm {
    pub fn new(token: impl Into<String>, offset: i64) -> Self {
        Self {
            token: token.into(),
            offset,
            ..Default::default()
        }
    }

    /// Set once the session ended under an open form
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    fn back_payload(&self) -> CallbackPayload {
        CallbackPayload::new(CallbackAction::Current, self.token.as_str(), self.offset)
    }

    /// Show the prompt of the current stage and park the form
    async fn ask(mut self, bot: &Bot, key: StepKey) -> Result<()> {
        let keyboard = InlineKeyboard::new().row(vec![InlineButton::new(
            "Cancel",
            self.back_payload().encode(),
        )]);
        let prompt = OutgoingMessage::text(self.stage.prompt()).with_keyboard(keyboard);
        self.prompt_message_id = bot.transport().send_message(key.chat_id, prompt).await?;

        let last = self.stage.is_last();
        let mut step = Step::new(Conversation::AddSecret(self))
            .with_cancel_message(SECRET_CREATION_CANCELLED);
        if last {
            step = step.terminal();
        }
        bot.steps().register(key, step);
        Ok(())
    }

    pub(crate) async fn resume(&mut self, bot: &Bot, message: &IncomingMessage) -> Result<()> {
        let key = StepKey::from(message);

        let unlocked = match bot.sessions().unlock(message.user_id, &self.token) {
            Ok(unlocked) => unlocked,
            Err(BotError::NoActiveSession) => {
                debug!(chat_id = message.chat_id, "Session ended while the form was open");
                self.abandoned = true;
                self.clear_exchange(bot, message).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let answer = message.text.as_str();
        match self.stage {
            WizardStage::Title => self.title = answer.to_string(),
            WizardStage::Login => self.login = unlocked.encrypt_field(answer)?,
            WizardStage::Password => self.password = unlocked.encrypt_field(answer)?,
            WizardStage::SiteLink => {
                if answer != SKIP {
                    self.site_link = answer.to_string();
                }
            }
            WizardStage::Description => {
                if answer != SKIP {
                    self.description = answer.to_string();
                }
            }
        }

        self.clear_exchange(bot, message).await;

        match self.stage.next() {
            Some(stage) => {
                let next = AddSecretForm {
                    stage,
                    ..self.clone()
                };
                next.ask(bot, key).await
            }
            None => self.save(bot, &unlocked, message.chat_id).await,
        }
    }

    async fn save(&self, bot: &Bot, unlocked: &UnlockedSession, chat_id: i64) -> Result<()> {
        let secret = NewSecret {
            user_id: unlocked.user.user_id,
            title: self.title.clone(),
            login: self.login.clone(),
            password: self.password.clone(),
            site_link: self.site_link.clone(),
            description: self.description.clone(),
        };
        let secret_id = bot.database().insert_secret(&secret, Utc::now().timestamp())?;
        info!(secret_id, "Secret created");

        let keyboard = InlineKeyboard::new().row(vec![InlineButton::new(
            "To secrets",
            self.back_payload().encode(),
        )]);
        bot.transport()
            .send_message(chat_id, OutgoingMessage::text(SECRET_CREATED).with_keyboard(keyboard))
            .await?;
        Ok(())
    }

    /// Remove the prompt and the user's answer from the chat
    async fn clear_exchange(&self, bot: &Bot, message: &IncomingMessage) {
        delete_quietly(bot, message.chat_id, self.prompt_message_id).await;
        delete_quietly(bot, message.chat_id, message.message_id).await;
    }
}

/// The `+` button: open the wizard
pub struct AddSecret;

#[async_trait]
impl Handler for AddSecret {
    async fn handle(&self, bot: &Bot, request: &Request<'_>) -> Result<()> {
        let Request::Callback { query, payload } = request else {
            return Ok(());
        };

        let key = StepKey::new(query.chat_id, query.user_id);
        bot.steps().cancel(key, true).await;

        if unlock_or_close(bot, query, payload).await?.is_none() {
            return Ok(());
        }

        bot.transport().answer_callback(&query.callback_id, None).await?;
        delete_quietly(bot, query.chat_id, query.message_id).await;

        AddSecretForm::new(payload.token.as_str(), payload.offset)
            .ask(bot, key)
            .await
    }
}
