//! The bot: shared state plus the update entry point.

use crate::actions::{self, Conversation};
use crate::database::Database;
use crate::dispatch::Router;
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::session::SessionManager;
use crate::steps::{StepRegistry, DEFAULT_STEP_TIMEOUT};
use crate::transport::{Transport, Update};
use crate::{BotError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tunables that are not owned by the session manager
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// The only chat and user the bot answers
    pub admin_id: i64,
    pub page_size: i64,
    /// Idle time after which a pending step is cancelled
    pub step_timeout: Duration,
}

impl BotSettings {
    pub fn new(admin_id: i64) -> Self {
        Self {
            admin_id,
            page_size: DEFAULT_PAGE_SIZE,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

pub struct Bot {
    transport: Arc<dyn Transport>,
    sessions: SessionManager,
    steps: StepRegistry<Conversation>,
    settings: BotSettings,
    router: Router,
}

impl Bot {
    /// Build a bot with the default routes
    pub fn new(transport: Arc<dyn Transport>, sessions: SessionManager, settings: BotSettings) -> Self {
        let router = actions::default_router(settings.admin_id);
        Self {
            steps: StepRegistry::new(transport.clone()),
            transport,
            sessions,
            settings,
            router,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn database(&self) -> &Database {
        self.sessions.database()
    }

    pub fn steps(&self) -> &StepRegistry<Conversation> {
        &self.steps
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Process one update
    ///
    /// A plain message is offered to the pending step first. A command that
    /// arrives while a step is pending is still routed, so `/start` always
    /// gets the user out of a half finished form.
    pub async fn handle_update(&self, update: &Update) -> Result<()> {
        if let Update::Message(message) = update {
            match self.steps.dispatch(self, message).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(BotError::CommandDuringStep) => {
                    warn!(
                        chat_id = message.chat_id,
                        "Command received while a step is pending"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if !self.router.handle(self, update).await? {
            debug!(chat_id = update.chat_id(), "No route for update");
        }
        Ok(())
    }

    /// Cancel steps idle longer than the configured timeout
    pub async fn sweep_steps(&self) -> usize {
        self.steps.sweep(self.settings.step_timeout).await
    }
}
