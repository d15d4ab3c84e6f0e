//! Inline keyboard callback payloads.
//!
//! Every button carries a compact JSON object: the action tag `a`, the
//! session token `k`, the menu offset `o` and, for secret buttons, the
//! secret id `i`. Telegram caps callback data at 64 bytes, hence the
//! one-letter keys.

use crate::{BotError, Result};
use serde::{Deserialize, Serialize};

/// Telegram's limit on callback data length
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackAction {
    #[serde(rename = "n")]
    Next,
    #[serde(rename = "p")]
    Prev,
    /// Redraw the current page (also used by back and cancel buttons)
    #[serde(rename = "c")]
    Current,
    #[serde(rename = "a")]
    Add,
    #[serde(rename = "s")]
    Show,
    #[serde(rename = "d")]
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "a")]
    pub action: CallbackAction,
    #[serde(rename = "k")]
    pub token: String,
    #[serde(rename = "o")]
    pub offset: i64,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<i64>,
}

impl CallbackPayload {
    pub fn new(action: CallbackAction, token: impl Into<String>, offset: i64) -> Self {
        Self {
            action,
            token: token.into(),
            offset,
            secret_id: None,
        }
    }

    pub fn with_secret(mut self, secret_id: i64) -> Self {
        self.secret_id = Some(secret_id);
        self
    }

    /// Same token and offset, different action
    pub fn with_action(&self, action: CallbackAction) -> Self {
        Self {
            action,
            ..self.clone()
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of strings and integers cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse callback data received from the chat
    ///
    /// # Errors
    /// `MalformedCallbackPayload` for anything that is not a well formed
    /// payload with a known action tag.
    pub fn decode(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| BotError::MalformedCallbackPayload(e.to_string()))
    }

    /// The secret id, required by show and delete buttons
    pub fn require_secret_id(&self) -> Result<i64> {
        self.secret_id.ok_or_else(|| {
            BotError::MalformedCallbackPayload(format!(
                "{:?} payload without a secret id",
                self.action
            ))
        })
    }
}
