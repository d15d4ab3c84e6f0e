use super::*;
use crate::bot::BotSettings;
use crate::crypto;
use crate::database::{Database, NewSecret};
use crate::session::SessionManager;
use crate::steps::{Step, StepKey};
use crate::transport::recording::{RecordingTransport, Sent};
use crate::transport::{OutgoingMessage, Update};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const ADMIN: i64 = 42;
const PASSWORD: &str = "open sesame";

struct Harness {
    bot: Bot,
    transport: Arc<RecordingTransport>,
    next_message_id: AtomicI64,
}

impl Harness {
    fn new() -> Self {
        let db = Database::in_memory().unwrap();
        let sessions = SessionManager::new(db, crypto::hash(PASSWORD));
        let transport = Arc::new(RecordingTransport::new());
        let bot = Bot::new(transport.clone(), sessions, BotSettings::new(ADMIN));
        Self {
            bot,
            transport,
            next_message_id: AtomicI64::new(1),
        }
    }

    fn key(&self) -> StepKey {
        StepKey::new(ADMIN, ADMIN)
    }

    fn message(&self, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: ADMIN,
            user_id: ADMIN,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            text: text.to_string(),
            reply_text: None,
        }
    }

    async fn send(&self, text: &str) -> IncomingMessage {
        let message = self.message(text);
        self.bot
            .handle_update(&Update::Message(message.clone()))
            .await
            .unwrap();
        message
    }

    async fn press(&self, payload: &CallbackPayload, message_id: i64) {
        let query = CallbackQuery {
            callback_id: "cb".to_string(),
            chat_id: ADMIN,
            user_id: ADMIN,
            message_id,
            data: payload.encode(),
        };
        self.bot
            .handle_update(&Update::Callback(query))
            .await
            .unwrap();
    }

    /// Log in and return the menu message id and its `+` payload
    async fn login(&self) -> (i64, CallbackPayload) {
        self.send("/start").await;
        self.send(PASSWORD).await;
        let menu = self.transport.last_message().unwrap();
        (self.transport.last_message_id().unwrap(), button(&menu, "+"))
    }

    fn user_id(&self) -> i64 {
        self.bot.database().find_user(ADMIN).unwrap().unwrap().user_id
    }

    fn insert_secret(&self, title: &str, login: &str, password: &str) {
        let secret = NewSecret {
            user_id: self.user_id(),
            title: title.to_string(),
            login: crypto::encrypt(login, PASSWORD).unwrap(),
            password: crypto::encrypt(password, PASSWORD).unwrap(),
            ..Default::default()
        };
        self.bot.database().insert_secret(&secret, 0).unwrap();
    }
}

fn button(message: &OutgoingMessage, text: &str) -> CallbackPayload {
    let keyboard = message.keyboard.as_ref().expect("message without keyboard");
    let button = keyboard
        .buttons()
        .find(|button| button.text == text)
        .unwrap_or_else(|| panic!("no {:?} button", text));
    CallbackPayload::decode(&button.callback_data).unwrap()
}

fn button_texts(message: &OutgoingMessage) -> Vec<Vec<String>> {
    message
        .keyboard
        .as_ref()
        .map(|keyboard| {
            keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(|button| button.text.clone()).collect())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_start_asks_for_password() {
    let h = Harness::new();

    h.send("/start").await;

    assert_eq!(h.transport.texts(), vec![PASSWORD_PROMPT]);
    assert!(h.bot.steps().is_pending(h.key()));
}

#[tokio::test]
async fn test_login_shows_empty_menu() {
    let h = Harness::new();

    h.login().await;

    let menu = h.transport.last_message().unwrap();
    assert!(menu.text.contains("Page: 0 / 0"));
    assert_eq!(button_texts(&menu), vec![vec!["+"]]);
    assert!(!h.bot.steps().is_pending(h.key()));
}

#[tokio::test]
async fn test_replied_password_wins() {
    let h = Harness::new();
    h.send("/start").await;

    let mut message = h.message("not the password");
    message.reply_text = Some(PASSWORD.to_string());
    h.bot
        .handle_update(&Update::Message(message))
        .await
        .unwrap();

    assert!(h.transport.last_message().unwrap().text.contains("Page: 0 / 0"));
}

#[tokio::test]
async fn test_wrong_password_is_refused_once() {
    let h = Harness::new();
    h.send("/start").await;

    h.send("guess").await;
    h.send(PASSWORD).await;

    // The login step is gone after the first attempt
    assert_eq!(h.transport.texts(), vec![PASSWORD_PROMPT, WRONG_PASSWORD]);
    assert!(h.bot.database().find_user(ADMIN).unwrap().is_none());
}

#[tokio::test]
async fn test_foreign_user_is_refused() {
    let h = Harness::new();
    h.bot.steps().register(
        StepKey::new(ADMIN, 7),
        Step::new(Conversation::Login).terminal(),
    );

    let message = IncomingMessage {
        user_id: 7,
        ..h.message(PASSWORD)
    };
    h.bot
        .handle_update(&Update::Message(message))
        .await
        .unwrap();

    assert_eq!(h.transport.texts(), vec![NOT_ALLOWED]);
    assert!(h.bot.database().find_user(7).unwrap().is_none());
}

#[tokio::test]
async fn test_foreign_chat_is_ignored() {
    let h = Harness::new();
    let message = IncomingMessage {
        chat_id: 7,
        user_id: 7,
        ..h.message("/start")
    };

    h.bot
        .handle_update(&Update::Message(message))
        .await
        .unwrap();

    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_wizard_creates_secret_with_skipped_fields() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;

    h.press(&add, menu_id).await;
    assert_eq!(
        h.transport.last_message().unwrap().text,
        WizardStage::Title.prompt()
    );

    for answer in ["GitHub", "octocat", "hunter2", "-", "-"] {
        assert!(h.bot.steps().is_pending(h.key()));
        h.send(answer).await;
    }

    assert!(!h.bot.steps().is_pending(h.key()));

    let user_id = h.user_id();
    assert_eq!(h.bot.database().count_secrets(user_id).unwrap(), 1);
    let summary = &h.bot.database().list_secrets(user_id, 0, 6).unwrap()[0];
    let secret = h
        .bot
        .database()
        .get_secret(user_id, summary.secret_id)
        .unwrap()
        .unwrap();
    assert_eq!(secret.title, "GitHub");
    assert_eq!(secret.site_link, "");
    assert_eq!(secret.description, "");
    assert_eq!(crypto::decrypt(&secret.login, PASSWORD).unwrap(), "octocat");
    assert_eq!(crypto::decrypt(&secret.password, PASSWORD).unwrap(), "hunter2");

    let done = h.transport.last_message().unwrap();
    assert_eq!(done.text, SECRET_CREATED);
    assert_eq!(button(&done, "To secrets").action, CallbackAction::Current);

    // The menu, then each prompt and each answer
    assert_eq!(h.transport.deleted().len(), 11);
}

#[tokio::test]
async fn test_wizard_keeps_optional_fields() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;
    h.press(&add, menu_id).await;

    for answer in ["Mail", "me", "pw", "https://mail.example", "work <inbox>"] {
        h.send(answer).await;
    }

    let user_id = h.user_id();
    let summary = &h.bot.database().list_secrets(user_id, 0, 6).unwrap()[0];
    let secret = h
        .bot
        .database()
        .get_secret(user_id, summary.secret_id)
        .unwrap()
        .unwrap();
    assert_eq!(secret.site_link, "https://mail.example");
    assert_eq!(secret.description, "work <inbox>");
}

#[tokio::test]
async fn test_wizard_cancel_button() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;
    h.press(&add, menu_id).await;
    h.send("Half done").await;

    let prompt = h.transport.last_message().unwrap();
    let prompt_id = h.transport.last_message_id().unwrap();
    h.press(&button(&prompt, "Cancel"), prompt_id).await;

    assert!(!h.bot.steps().is_pending(h.key()));
    assert!(h
        .transport
        .texts()
        .contains(&SECRET_CREATION_CANCELLED.to_string()));
    assert!(matches!(
        h.transport.sent().last(),
        Some(Sent::Answer { .. })
    ));
    assert!(h.transport.last_message().unwrap().text.contains("Page: 0 / 0"));
    assert_eq!(h.bot.database().count_secrets(h.user_id()).unwrap(), 0);
}

#[tokio::test]
async fn test_start_during_wizard_restarts_login() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;
    h.press(&add, menu_id).await;

    h.send("/start").await;

    let texts = h.transport.texts();
    assert_eq!(
        &texts[texts.len() - 2..],
        &[SECRET_CREATION_CANCELLED.to_string(), PASSWORD_PROMPT.to_string()]
    );

    // The pending step is now the login prompt
    h.send(PASSWORD).await;
    assert!(h.transport.last_message().unwrap().text.contains("Page:"));
    assert_eq!(h.bot.database().count_secrets(h.user_id()).unwrap(), 0);
}

#[tokio::test]
async fn test_wizard_abandoned_when_session_ends() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;
    h.press(&add, menu_id).await;
    let sent_before = h.transport.texts().len();

    h.bot.sessions().purge_expired(i64::MAX).unwrap();
    h.send("GitHub").await;

    assert!(!h.bot.steps().is_pending(h.key()));
    assert_eq!(h.transport.texts().len(), sent_before);
    assert_eq!(h.bot.database().count_secrets(h.user_id()).unwrap(), 0);
}

#[tokio::test]
async fn test_paging_through_seven_secrets() {
    let h = Harness::new();
    h.login().await;
    for i in 1..=7 {
        h.insert_secret(&format!("site {}", i), "login", "password");
    }

    let (menu_id, add) = h.login().await;
    let menu = h.transport.last_message().unwrap();
    let rows = button_texts(&menu);
    assert!(menu.text.contains("Page: 1 / 2"));
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[6], vec!["Back", "+", "Next"]);

    h.press(&add.with_action(CallbackAction::Next), menu_id).await;
    let second = h.transport.last_message().unwrap();
    assert!(second.text.contains("Page: 2 / 2"));
    assert_eq!(button_texts(&second)[0], vec!["site 7"]);

    h.press(&button(&second, "Next"), menu_id).await;
    assert!(h.transport.last_message().unwrap().text.contains("Page: 1 / 2"));

    h.press(&add.with_action(CallbackAction::Prev), menu_id).await;
    assert!(h.transport.last_message().unwrap().text.contains("Page: 2 / 2"));
}

#[tokio::test]
async fn test_view_and_delete_secret() {
    let h = Harness::new();
    h.login().await;
    h.insert_secret("Bank", "me@bank", "<s3cret&>");
    let (menu_id, _) = h.login().await;

    let menu = h.transport.last_message().unwrap();
    h.press(&button(&menu, "Bank"), menu_id).await;

    let card = h.transport.last_message().unwrap();
    assert!(card.html);
    assert!(card.text.contains("<b>=== Bank ===</b>"));
    assert!(card.text.contains("<code>me@bank</code>"));
    assert!(card.text.contains("<code>&lt;s3cret&amp;&gt;</code>"));
    assert_eq!(button_texts(&card), vec![vec!["Back", "Delete"]]);

    h.press(&button(&card, "Delete"), menu_id).await;

    assert!(h.transport.sent().contains(&Sent::Answer {
        callback_id: "cb".to_string(),
        text: Some(SECRET_DELETED.to_string()),
    }));
    assert_eq!(h.bot.database().count_secrets(h.user_id()).unwrap(), 0);
    assert!(h.transport.last_message().unwrap().text.contains("Page: 0 / 0"));
}

#[tokio::test]
async fn test_stale_token_closes_menu() {
    let h = Harness::new();
    let (menu_id, add) = h.login().await;
    let stale = CallbackPayload {
        token: "stale".to_string(),
        ..add.with_action(CallbackAction::Next)
    };

    h.press(&stale, menu_id).await;

    assert_eq!(h.transport.deleted(), vec![menu_id]);
}

#[tokio::test]
async fn test_malformed_callback_is_dropped() {
    let h = Harness::new();
    let query = CallbackQuery {
        callback_id: "cb".to_string(),
        chat_id: ADMIN,
        user_id: ADMIN,
        message_id: 1,
        data: "{\"a\":".to_string(),
    };

    h.bot
        .handle_update(&Update::Callback(query))
        .await
        .unwrap();

    assert!(h.transport.sent().is_empty());
}
