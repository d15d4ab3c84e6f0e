//! Conversation step registry.
//!
//! A step is "what to do with the next plain message from this user in this
//! chat". Multi-turn flows (the login prompt, the add-secret wizard) park a
//! step here and return; the next message resumes it.
//!
//! At most one step is pending per [`StepKey`]. Registering a step for a key
//! replaces whatever was there. A step leaves the registry when a terminal
//! step has been invoked, when it is cancelled, or when the idle sweep finds
//! it older than the timeout.

#[cfg(test)]
mod tests;

use crate::transport::{IncomingMessage, OutgoingMessage, Transport, Update};
use crate::{BotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default idle timeout for a pending step
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(3600);

/// Identifies a conversation: one user in one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl StepKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

impl From<&IncomingMessage> for StepKey {
    fn from(message: &IncomingMessage) -> Self {
        Self::new(message.chat_id, message.user_id)
    }
}

impl From<&Update> for StepKey {
    fn from(update: &Update) -> Self {
        Self::new(update.chat_id(), update.user_id())
    }
}

/// The resume function of a step
///
/// The implementing value is also the step's parameter bag: a wizard keeps
/// its typed, partially filled form in `self` and hands a copy of it to the
/// next stage it registers.
#[async_trait]
pub trait StepAction<C: ?Sized + Sync>: Send + 'static {
    async fn resume(&mut self, ctx: &C, message: &IncomingMessage) -> Result<()>;

    /// Checked after `resume`: a finished step is dropped even when it is
    /// not terminal
    fn finished(&self) -> bool {
        false
    }
}

/// A pending step
#[derive(Debug)]
pub struct Step<A> {
    pub action: A,
    /// Unix seconds
    pub created_at: i64,
    /// Sent to the chat when the step is cancelled with notification
    pub cancel_message: Option<String>,
    /// Removed after its first invocation, whatever the outcome
    pub terminal: bool,
}

impl<A> Step<A> {
    pub fn new(action: A) -> Self {
        Self {
            action,
            created_at: Utc::now().timestamp(),
            cancel_message: None,
            terminal: false,
        }
    }

    pub fn with_cancel_message(mut self, message: impl Into<String>) -> Self {
        self.cancel_message = Some(message.into());
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Keyed store of pending steps
///
/// Clones share the same store. All operations go through one mutex, which
/// is never held across an `.await`.
pub struct StepRegistry<A> {
    steps: Arc<Mutex<HashMap<StepKey, Step<A>>>>,
    transport: Arc<dyn Transport>,
}

impl<A> Clone for StepRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<A> StepRegistry<A> {
    /// Create an empty registry that sends cancel notices through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(HashMap::new())),
            transport,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StepKey, Step<A>>> {
        // A panic inside the lock leaves the map itself consistent
        self.steps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park a step for `key`, replacing any step already there
    pub fn register(&self, key: StepKey, step: Step<A>) {
        debug!(
            chat_id = key.chat_id,
            user_id = key.user_id,
            terminal = step.terminal,
            "Registering conversation step"
        );
        if self.lock().insert(key, step).is_some() {
            debug!(chat_id = key.chat_id, user_id = key.user_id, "Replaced pending step");
        }
    }

    pub fn is_pending(&self, key: StepKey) -> bool {
        self.lock().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Feed a plain message to the step pending for its sender
    ///
    /// Returns `Ok(false)` when no step is pending, so the caller can route
    /// the message normally, and `Ok(true)` once a step has been invoked.
    /// A step that is already running for the same key counts as not
    /// pending: the message falls through to routing, where plain text is
    /// dropped. Callers that need every message delivered must feed one key
    /// at a time.
    ///
    /// # Errors
    /// - `CommandDuringStep` if the message is a command; the step is left
    ///   in place and not invoked
    /// - whatever the step's action returned
    pub async fn dispatch<C>(&self, ctx: &C, message: &IncomingMessage) -> Result<bool>
    where
        C: ?Sized + Sync,
        A: StepAction<C>,
    {
        let key = StepKey::from(message);

        // Taking the step out serializes invocations per key: a concurrent
        // dispatch falls through and a concurrent sweep cannot see it.
        let mut step = {
            let mut steps = self.lock();
            if !steps.contains_key(&key) {
                debug!(chat_id = key.chat_id, user_id = key.user_id, "No step pending or step still running");
                return Ok(false);
            }
            if message.is_command() {
                return Err(BotError::CommandDuringStep);
            }
            match steps.remove(&key) {
                Some(step) => step,
                None => return Ok(false),
            }
        };

        debug!(chat_id = key.chat_id, user_id = key.user_id, "Resuming conversation step");
        let result = step.action.resume(ctx, message).await;

        if step.terminal || step.action.finished() {
            debug!(chat_id = key.chat_id, user_id = key.user_id, "Conversation step finished");
        } else {
            // Keep the stage for a retry unless it registered its successor
            self.lock().entry(key).or_insert(step);
        }

        result.map(|()| true)
    }

    /// Remove the step for `key`
    ///
    /// With `notify`, the step's cancel message (if any) is sent to the
    /// chat. Returns whether a step was pending.
    pub async fn cancel(&self, key: StepKey, notify: bool) -> bool {
        let removed = self.lock().remove(&key);

        match removed {
            Some(step) => {
                debug!(chat_id = key.chat_id, user_id = key.user_id, "Cancelled conversation step");
                if notify {
                    self.notify(key, step.cancel_message).await;
                }
                true
            }
            None => false,
        }
    }

    /// Cancel with notification every step idle longer than `idle_timeout`
    pub async fn sweep(&self, idle_timeout: Duration) -> usize {
        self.sweep_at(idle_timeout, Utc::now().timestamp()).await
    }

    /// [`sweep`](Self::sweep) against an explicit clock
    pub async fn sweep_at(&self, idle_timeout: Duration, now: i64) -> usize {
        let timeout = i64::try_from(idle_timeout.as_secs()).unwrap_or(i64::MAX);

        let mut expired = Vec::new();
        self.lock().retain(|key, step| {
            if now.saturating_sub(step.created_at) > timeout {
                expired.push((*key, step.cancel_message.take()));
                false
            } else {
                true
            }
        });

        let count = expired.len();
        for (key, cancel_message) in expired {
            self.notify(key, cancel_message).await;
        }

        if count > 0 {
            debug!(removed = count, "Swept idle conversation steps");
        }
        count
    }

    async fn notify(&self, key: StepKey, cancel_message: Option<String>) {
        let Some(text) = cancel_message else {
            return;
        };

        if let Err(e) = self
            .transport
            .send_message(key.chat_id, OutgoingMessage::text(text))
            .await
        {
            warn!(chat_id = key.chat_id, "Failed to send cancel notice: {}", e);
        }
    }
}
