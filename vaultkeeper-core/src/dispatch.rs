//! Update routing.
//!
//! A [`Router`] is an ordered table of routes. Each route pairs a [`Filter`]
//! with a [`Handler`]; the first route whose filter accepts an update runs.
//! Only updates from the administrator's chat are routed at all.

use crate::bot::Bot;
use crate::callback::{CallbackAction, CallbackPayload};
use crate::transport::{CallbackQuery, IncomingMessage, Update};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a route reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// A `/name` command
    Command(&'static str),
    /// A button press whose payload carries one of these actions
    Callback(&'static [CallbackAction]),
}

impl Filter {
    pub fn matches(&self, request: &Request<'_>) -> bool {
        match (self, request) {
            (Filter::Command(name), Request::Command { name: command, .. }) => name == command,
            (Filter::Callback(actions), Request::Callback { payload, .. }) => {
                actions.contains(&payload.action)
            }
            _ => false,
        }
    }
}

/// An update that passed the admin check, with its payload decoded
#[derive(Debug, Clone)]
pub enum Request<'a> {
    Command {
        message: &'a IncomingMessage,
        name: &'a str,
    },
    Callback {
        query: &'a CallbackQuery,
        payload: CallbackPayload,
    },
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, bot: &Bot, request: &Request<'_>) -> Result<()>;
}

pub struct Route {
    /// Used in logs only
    pub name: &'static str,
    pub filter: Filter,
    pub handler: Arc<dyn Handler>,
}

pub struct Router {
    admin_id: i64,
    routes: Vec<Route>,
}

impl Router {
    pub fn new(admin_id: i64) -> Self {
        Self {
            admin_id,
            routes: Vec::new(),
        }
    }

    /// Append a route; earlier routes take precedence
    pub fn route(mut self, name: &'static str, filter: Filter, handler: impl Handler + 'static) -> Self {
        self.routes.push(Route {
            name,
            filter,
            handler: Arc::new(handler),
        });
        self
    }

    /// Find the route for an update
    ///
    /// Updates from other chats, plain text and malformed callback payloads
    /// match nothing.
    pub fn resolve<'a>(&'a self, update: &'a Update) -> Option<(&'a Route, Request<'a>)> {
        if update.chat_id() != self.admin_id {
            debug!(chat_id = update.chat_id(), "Ignoring update from foreign chat");
            return None;
        }

        let request = match update {
            Update::Message(message) => Request::Command {
                message,
                name: message.command()?,
            },
            Update::Callback(query) => match CallbackPayload::decode(&query.data) {
                Ok(payload) => Request::Callback { query, payload },
                Err(e) => {
                    warn!(chat_id = query.chat_id, "Dropping callback: {}", e);
                    return None;
                }
            },
        };

        let route = self.routes.iter().find(|route| route.filter.matches(&request))?;
        Some((route, request))
    }

    /// Run the first matching route; returns whether one ran
    pub async fn handle(&self, bot: &Bot, update: &Update) -> Result<bool> {
        let Some((route, request)) = self.resolve(update) else {
            return Ok(false);
        };

        debug!(route = route.name, "Routing update");
        route.handler.handle(bot, &request).await?;
        Ok(true)
    }
}
