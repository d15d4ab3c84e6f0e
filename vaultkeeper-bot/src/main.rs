//! Vaultkeeper Telegram bot
//!
//! A single-admin password manager run over a Telegram chat. Secrets are
//! stored encrypted under the admin's password, which the bot itself only
//! holds encrypted under a short-lived session token.

mod cleanup;
mod config;
mod telegram;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::Dispatcher;
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::requests::{Requester, ResponseResult};
use teloxide::types::AllowedUpdate;
use teloxide::update_listeners::Polling;
use tracing_subscriber::EnvFilter;
use vaultkeeper_core::{Bot, BotSettings, Database, SessionManager};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "vaultkeeper", about = "Telegram password manager bot")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vaultkeeper.toml")]
    config: PathBuf,

    /// Bot API token
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    token: Option<String>,

    /// Telegram id of the administrator
    #[arg(long, env = "ADMIN_ID")]
    admin_id: Option<i64>,

    /// SHA-256 hex digest of the shared password
    #[arg(long, env = "PASSWORD_HASH", hide_env_values = true)]
    password_hash: Option<String>,

    /// Database path override
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the digest to configure as `password_hash`
    HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    if let Some(Command::HashPassword) = cli.command {
        let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
        println!("{}", vaultkeeper_core::hash(&password));
        return Ok(());
    }

    let mut cfg = if cli.config.exists() {
        config::BotConfig::load(&cli.config)?
    } else {
        tracing::info!("No config file found, using defaults");
        config::BotConfig::default()
    };

    if let Some(admin_id) = cli.admin_id {
        cfg.admin_id = Some(admin_id);
    }
    if let Some(password_hash) = cli.password_hash {
        cfg.password_hash = password_hash;
    }
    if let Some(database) = cli.database {
        cfg.database_path = database;
    }

    let token = cli.token.context("Bot token missing: pass --token or set API_KEY")?;
    let admin_id = cfg
        .admin_id
        .context("Admin id missing: pass --admin-id, set ADMIN_ID or configure admin_id")?;
    if cfg.password_hash.is_empty() {
        tracing::warn!("No password hash configured, every login will be refused");
    }

    let db = Database::open(&cfg.database_path)?;
    tracing::info!("Database initialized at {}", cfg.database_path.display());

    let client = telegram::TelegramClient::new(
        &cfg.api_url,
        &token,
        Duration::from_secs(cfg.poll_timeout_secs),
    )?;
    let me = client.api().get_me().await?;
    tracing::info!(
        "Authorized on account @{}",
        me.user.username.as_deref().unwrap_or("unknown")
    );

    let sessions = SessionManager::new(db, cfg.password_hash.clone())
        .with_reset_interval(cfg.session_ttl())
        .with_token_length(cfg.token_length);
    let settings = BotSettings {
        admin_id,
        page_size: cfg.page_size.max(1),
        step_timeout: cfg.step_timeout(),
    };
    let bot = Arc::new(Bot::new(Arc::new(client.clone()), sessions.clone(), settings));

    cleanup::spawn_session_purge(sessions, cfg.session_sweep_interval());
    cleanup::spawn_step_sweep(bot.clone(), cfg.step_sweep_interval());

    run(bot, &client, Duration::from_secs(cfg.poll_timeout_secs)).await;
    Ok(())
}

/// Long-poll for updates until interrupted
///
/// The dispatcher feeds updates from one chat in order, one at a time,
/// which the step registry relies on.
async fn run(bot: Arc<Bot>, client: &telegram::TelegramClient, poll_timeout: Duration) {
    let listener = Polling::builder(client.api().clone())
        .timeout(poll_timeout)
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
        .build();

    Dispatcher::builder(client.api().clone(), dptree::endpoint(handle))
        .dependencies(dptree::deps![bot])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Polling failed"))
        .await;
}

async fn handle(update: teloxide::types::Update, bot: Arc<Bot>) -> ResponseResult<()> {
    let Some(update) = telegram::into_update(&update) else {
        return Ok(());
    };
    if let Err(e) = bot.handle_update(&update).await {
        tracing::error!(chat_id = update.chat_id(), "Handler failed: {}", e);
    }
    Ok(())
}
