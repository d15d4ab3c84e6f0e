//! Background cleanup tasks: purge expired sessions, cancel idle steps.

use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use vaultkeeper_core::{Bot, SessionManager};

pub fn spawn_session_purge(sessions: SessionManager, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = sessions.purge_expired(now) {
                tracing::error!("Session purge error: {}", e);
            }
        }
    });
}

pub fn spawn_step_sweep(bot: Arc<Bot>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            let removed = bot.sweep_steps().await;
            if removed > 0 {
                tracing::info!(removed, "Cancelled idle conversation steps");
            }
        }
    });
}
