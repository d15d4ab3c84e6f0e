use super::*;
use crate::transport::recording::{RecordingTransport, Sent};

/// Minimal context a test step resumes against
struct Ctx {
    registry: StepRegistry<TestAction>,
    log: Mutex<Vec<String>>,
}

impl Ctx {
    fn new() -> (Self, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let ctx = Self {
            registry: StepRegistry::new(transport.clone()),
            log: Mutex::new(Vec::new()),
        };
        (ctx, transport)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[derive(Debug)]
enum TestAction {
    /// Log the label and the message text
    Record(&'static str),
    /// Fail without doing anything
    Fail,
    /// Register the next stage, carrying a counter forward
    Advance { seen: u32 },
    /// Log whether this key is visible to the registry while running
    Peek,
    /// Report itself finished once resumed
    Abandon { done: bool },
    /// Feed the same message to the registry again while running
    Reenter,
}

#[async_trait]
impl StepAction<Ctx> for TestAction {
    async fn resume(&mut self, ctx: &Ctx, message: &IncomingMessage) -> Result<()> {
        match self {
            TestAction::Record(label) => {
                ctx.log
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", label, message.text));
                Ok(())
            }
            TestAction::Fail => Err(BotError::NotFound("nothing".to_string())),
            TestAction::Advance { seen } => {
                *seen += 1;
                ctx.log.lock().unwrap().push(format!("advance:{}", seen));
                ctx.registry.register(
                    StepKey::from(message),
                    Step::new(TestAction::Advance { seen: *seen }),
                );
                Ok(())
            }
            TestAction::Peek => {
                let key = StepKey::from(message);
                let visible = ctx.registry.is_pending(key);
                let swept = ctx.registry.sweep_at(Duration::ZERO, i64::MAX).await;
                ctx.log
                    .lock()
                    .unwrap()
                    .push(format!("visible:{} swept:{}", visible, swept));
                Ok(())
            }
            TestAction::Abandon { done } => {
                *done = true;
                Ok(())
            }
            TestAction::Reenter => {
                let nested = ctx.registry.dispatch(ctx, message).await?;
                ctx.log.lock().unwrap().push(format!("nested:{}", nested));
                Ok(())
            }
        }
    }

    fn finished(&self) -> bool {
        matches!(self, TestAction::Abandon { done: true })
    }
}

fn message(text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: 10,
        user_id: 20,
        message_id: 1,
        text: text.to_string(),
        reply_text: None,
    }
}

fn key() -> StepKey {
    StepKey::new(10, 20)
}

#[tokio::test]
async fn test_dispatch_without_step_is_noop() {
    let (ctx, transport) = Ctx::new();

    let handled = ctx.registry.dispatch(&ctx, &message("hello")).await.unwrap();

    assert!(!handled);
    assert!(ctx.log().is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_register_replaces_previous_step() {
    let (ctx, _) = Ctx::new();

    ctx.registry
        .register(key(), Step::new(TestAction::Record("first")).terminal());
    ctx.registry
        .register(key(), Step::new(TestAction::Record("second")).terminal());
    assert_eq!(ctx.registry.len(), 1);

    let handled = ctx.registry.dispatch(&ctx, &message("hi")).await.unwrap();

    assert!(handled);
    assert_eq!(ctx.log(), vec!["second:hi"]);
}

#[tokio::test]
async fn test_steps_are_keyed_by_chat_and_user() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(StepKey::new(10, 99), Step::new(TestAction::Record("other")));
    ctx.registry
        .register(StepKey::new(11, 20), Step::new(TestAction::Record("other")));

    let handled = ctx.registry.dispatch(&ctx, &message("hi")).await.unwrap();

    assert!(!handled);
    assert!(ctx.log().is_empty());
    assert_eq!(ctx.registry.len(), 2);
}

#[tokio::test]
async fn test_command_during_step_keeps_step() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Record("form")).terminal());

    let result = ctx.registry.dispatch(&ctx, &message("/start")).await;

    assert!(matches!(result, Err(BotError::CommandDuringStep)));
    assert!(ctx.registry.is_pending(key()));
    assert!(ctx.log().is_empty());

    // The step still answers the next plain message
    assert!(ctx.registry.dispatch(&ctx, &message("x")).await.unwrap());
    assert_eq!(ctx.log(), vec!["form:x"]);
}

#[tokio::test]
async fn test_command_without_step_falls_through() {
    let (ctx, _) = Ctx::new();

    let handled = ctx.registry.dispatch(&ctx, &message("/start")).await.unwrap();
    assert!(!handled);
}

#[tokio::test]
async fn test_terminal_step_removed_after_success() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Record("last")).terminal());

    ctx.registry.dispatch(&ctx, &message("a")).await.unwrap();
    let second = ctx.registry.dispatch(&ctx, &message("b")).await.unwrap();

    assert!(!second);
    assert!(!ctx.registry.is_pending(key()));
    assert_eq!(ctx.log(), vec!["last:a"]);
}

#[tokio::test]
async fn test_terminal_step_removed_after_error() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Fail).terminal());

    let result = ctx.registry.dispatch(&ctx, &message("a")).await;

    assert!(matches!(result, Err(BotError::NotFound(_))));
    assert!(!ctx.registry.is_pending(key()));
}

#[tokio::test]
async fn test_non_terminal_step_stays_for_retry() {
    let (ctx, _) = Ctx::new();
    ctx.registry.register(key(), Step::new(TestAction::Record("retry")));

    ctx.registry.dispatch(&ctx, &message("one")).await.unwrap();
    ctx.registry.dispatch(&ctx, &message("two")).await.unwrap();

    assert!(ctx.registry.is_pending(key()));
    assert_eq!(ctx.log(), vec!["retry:one", "retry:two"]);
}

#[tokio::test]
async fn test_non_terminal_failure_keeps_step() {
    let (ctx, _) = Ctx::new();
    ctx.registry.register(key(), Step::new(TestAction::Fail));

    assert!(ctx.registry.dispatch(&ctx, &message("a")).await.is_err());
    assert!(ctx.registry.is_pending(key()));
}

#[tokio::test]
async fn test_finished_non_terminal_step_is_dropped() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Abandon { done: false }));

    assert!(ctx.registry.dispatch(&ctx, &message("a")).await.unwrap());
    assert!(!ctx.registry.is_pending(key()));
}

#[tokio::test]
async fn test_successor_registered_by_action_wins() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Advance { seen: 0 }));

    ctx.registry.dispatch(&ctx, &message("a")).await.unwrap();
    ctx.registry.dispatch(&ctx, &message("b")).await.unwrap();

    // The second stage saw the counter handed forward by the first
    assert_eq!(ctx.log(), vec!["advance:1", "advance:2"]);
    assert_eq!(ctx.registry.len(), 1);
}

#[tokio::test]
async fn test_running_step_is_invisible_to_sweep() {
    let (ctx, _) = Ctx::new();
    ctx.registry
        .register(key(), Step::new(TestAction::Peek).created_at(0).terminal());

    ctx.registry.dispatch(&ctx, &message("a")).await.unwrap();

    assert_eq!(ctx.log(), vec!["visible:false swept:0"]);
}

#[tokio::test]
async fn test_second_dispatch_while_running_falls_through() {
    let (ctx, _) = Ctx::new();
    ctx.registry.register(key(), Step::new(TestAction::Reenter));

    let handled = ctx.registry.dispatch(&ctx, &message("again")).await.unwrap();

    assert!(handled);
    assert_eq!(ctx.log(), vec!["nested:false"]);
    // Put back for a retry once the outer run ends
    assert!(ctx.registry.is_pending(key()));
}

#[tokio::test]
async fn test_sweep_removes_only_old_steps() {
    let (ctx, transport) = Ctx::new();
    let timeout = Duration::from_secs(3600);
    let now = 10_000;

    ctx.registry.register(
        StepKey::new(1, 1),
        Step::new(TestAction::Record("old"))
            .created_at(now - 3601)
            .with_cancel_message("old cancelled"),
    );
    ctx.registry.register(
        StepKey::new(2, 2),
        Step::new(TestAction::Record("boundary"))
            .created_at(now - 3600)
            .with_cancel_message("boundary cancelled"),
    );
    ctx.registry.register(
        StepKey::new(3, 3),
        Step::new(TestAction::Record("young"))
            .created_at(now - 10)
            .with_cancel_message("young cancelled"),
    );
    ctx.registry.register(
        StepKey::new(4, 4),
        Step::new(TestAction::Record("silent")).created_at(0),
    );

    let removed = ctx.registry.sweep_at(timeout, now).await;

    assert_eq!(removed, 2);
    assert!(!ctx.registry.is_pending(StepKey::new(1, 1)));
    assert!(ctx.registry.is_pending(StepKey::new(2, 2)));
    assert!(ctx.registry.is_pending(StepKey::new(3, 3)));
    assert!(!ctx.registry.is_pending(StepKey::new(4, 4)));

    assert_eq!(
        transport.sent(),
        vec![Sent::Message {
            chat_id: 1,
            message: OutgoingMessage::text("old cancelled"),
        }]
    );
}

#[tokio::test]
async fn test_sweep_on_empty_registry() {
    let (ctx, _) = Ctx::new();
    assert_eq!(ctx.registry.sweep(DEFAULT_STEP_TIMEOUT).await, 0);
}

#[tokio::test]
async fn test_cancel_with_notification() {
    let (ctx, transport) = Ctx::new();
    ctx.registry.register(
        key(),
        Step::new(TestAction::Record("form")).with_cancel_message("Cancelled"),
    );

    assert!(ctx.registry.cancel(key(), true).await);
    assert!(!ctx.registry.is_pending(key()));
    assert_eq!(transport.texts(), vec!["Cancelled"]);

    // Nothing left to cancel
    assert!(!ctx.registry.cancel(key(), true).await);
    assert_eq!(transport.texts().len(), 1);
}

#[tokio::test]
async fn test_cancel_without_notification() {
    let (ctx, transport) = Ctx::new();
    ctx.registry.register(
        key(),
        Step::new(TestAction::Record("form")).with_cancel_message("Cancelled"),
    );

    assert!(ctx.registry.cancel(key(), false).await);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_clones_share_state() {
    let (ctx, _) = Ctx::new();
    let clone = ctx.registry.clone();

    clone.register(key(), Step::new(TestAction::Record("shared")));

    assert!(ctx.registry.is_pending(key()));
    assert!(!ctx.registry.is_empty());
}
