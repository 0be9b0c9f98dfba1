#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chatdesk_core::app::{Action, AppController, AppEvent, AppState, Notification, Services};
use chatdesk_core::conversations::models::{Conversation, Message, ModelRef};
use chatdesk_core::entities::{ApiKind, EntityId, FolderPath};
use chatdesk_core::prompts::Prompt;
use chatdesk_core::repositories::{EntityRepository, InMemoryEntityRepository};
use chatdesk_core::services::ApiClient;
use chatdesk_core::settings::models::{AppConfig, LocalSettings};
use chatdesk_core::settings::repositories::InMemoryLocalSettingsRepository;
use tokio::sync::broadcast;
use wiremock::MockServer;

pub const BUCKET: &str = "user";
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn conversation_root() -> FolderPath {
    FolderPath::root(ApiKind::Conversations, BUCKET)
}

pub fn prompt_root() -> FolderPath {
    FolderPath::root(ApiKind::Prompts, BUCKET)
}

/// Stored conversation with `exchanges` user/assistant pairs.
pub fn conversation(folder: &FolderPath, name: &str, exchanges: usize) -> Conversation {
    let mut conversation = Conversation::new(
        EntityId::new(folder.clone(), name),
        ModelRef::new("gpt-4"),
        1.0,
    );
    for i in 0..exchanges {
        conversation.messages.push(Message::user(format!("question {i}")));
        conversation.messages.push(Message::assistant(format!("answer {i}")));
    }
    conversation
}

pub struct Setup {
    pub conversations: InMemoryEntityRepository<Conversation>,
    pub prompts: Arc<dyn EntityRepository<Prompt>>,
    pub local_settings: LocalSettings,
    pub playback_step_delay_ms: u64,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            conversations: InMemoryEntityRepository::new(),
            prompts: Arc::new(InMemoryEntityRepository::<Prompt>::new()),
            local_settings: LocalSettings::default(),
            playback_step_delay_ms: 10,
        }
    }
}

pub struct Harness {
    pub controller: AppController,
    pub conversations: InMemoryEntityRepository<Conversation>,
    pub local_settings: InMemoryLocalSettingsRepository,
    pub server: MockServer,
}

/// Controller wired to `server` for HTTP services and to in-memory storage.
pub async fn start(server: MockServer, setup: Setup) -> Harness {
    let config = AppConfig {
        deploy_poll_interval_ms: 20,
        playback_step_delay_ms: setup.playback_step_delay_ms,
        stream_idle_timeout_secs: 2,
        ..AppConfig::new(server.uri(), BUCKET)
    };
    let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout())
        .expect("client builds");
    let local_settings = InMemoryLocalSettingsRepository::with_settings(setup.local_settings);
    let services = Services::with_repositories(
        api,
        Arc::new(setup.conversations.clone()),
        setup.prompts,
        Arc::new(local_settings.clone()),
    );

    let controller = AppController::new(config, services);
    controller.init().await;
    Harness {
        controller,
        conversations: setup.conversations,
        local_settings,
        server,
    }
}

/// Poll `check` until it yields a value.
pub async fn wait_until<T>(mut check: impl FnMut() -> Option<T>) -> T {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if let Some(value) = check() {
            return value;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {WAIT_TIMEOUT:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for<T>(
    controller: &AppController,
    mut check: impl FnMut(&AppState) -> Option<T>,
) -> T {
    wait_until(|| controller.read(&mut check)).await
}

/// Next notification carrying `message`, skipping everything else on the bus.
pub async fn expect_notification(
    events: &mut broadcast::Receiver<AppEvent>,
    message: &str,
) -> Notification {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(AppEvent::Notification(notification)) if notification.message == message => {
                    return notification;
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no notification `{message}`"))
}

/// Wait until an action matching `pred` has been reduced.
pub async fn expect_action(
    events: &mut broadcast::Receiver<AppEvent>,
    pred: impl Fn(&Action) -> bool,
) -> Action {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(AppEvent::Action(action)) if pred(&action) => return action,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected action was not dispatched"))
}
