use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::action::Action;
use super::events::{AppEvent, CONFLICT_MESSAGE, Notification, NotificationLevel};
use super::services::Services;
use super::state::AppState;
use crate::conversations::ConversationAction;
use crate::conversations::models::Conversation;
use crate::prompts::PromptAction;
use crate::prompts::models::Prompt;
use crate::repositories::RepositoryError;
use crate::settings::actions::ModelsAction;
use crate::settings::models::{AppConfig, LocalSettings};
use crate::settings::repositories::{
    AppConfigJsonRepository, LocalSettingsJsonRepository, LocalSettingsRepository,
};
use crate::{conversations, prompts, publications, settings};

const EVENT_CAPACITY: usize = 1024;

struct Shared {
    state: RwLock<AppState>,
    actions: mpsc::UnboundedSender<Action>,
    events: broadcast::Sender<AppEvent>,
    local_settings: mpsc::UnboundedSender<LocalSettings>,
    services: Services,
    config: AppConfig,
    polls: Mutex<HashMap<String, CancellationToken>>,
    shutdown: CancellationToken,
}

/// Entity values an optimistic reduce overwrote, kept so a failed write can restore them.
#[derive(Default)]
pub struct Previous {
    pub conversation: Option<Conversation>,
    pub prompt: Option<Prompt>,
}

impl Previous {
    fn capture(state: &AppState, action: &Action) -> Self {
        let mut previous = Self::default();
        match action {
            Action::Conversations(
                ConversationAction::UpdateConversation { id, .. }
                | ConversationAction::RateMessage { id, .. },
            ) => previous.conversation = state.conversations.conversation(id).cloned(),
            Action::Prompts(PromptAction::UpdatePrompt { id, .. }) => {
                previous.prompt = state.prompts.prompt(id).cloned()
            }
            _ => {}
        }
        previous
    }
}

/// Handle given to controllers: read state, dispatch follow-up actions and
/// run side effects that stop when the application shuts down.
#[derive(Clone)]
pub struct EpicContext {
    shared: Arc<Shared>,
}

impl EpicContext {
    pub fn dispatch(&self, action: impl Into<Action>) {
        if self.shared.actions.send(action.into()).is_err() {
            debug!("Dispatch after shutdown ignored");
        }
    }

    /// Run `f` against the current state. Never hold the result across an await.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.shared.state.read())
    }

    pub fn config(&self) -> &AppConfig {
        &self.shared.config
    }

    pub fn services(&self) -> &Services {
        &self.shared.services
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => warn!(message = %message, "Error notification"),
            NotificationLevel::Warning | NotificationLevel::Info => {
                debug!(message = %message, "Notification")
            }
        }
        let _ = self
            .shared
            .events
            .send(AppEvent::Notification(Notification { level, message }));
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Toast for a failed repository call: conflicts ask for a refresh, an expired
    /// session raises [`AppEvent::AuthRequired`], anything else shows `fallback`.
    pub fn report(&self, error: &RepositoryError, fallback: &str) {
        if error.is_unauthorized() {
            self.auth_required();
        }
        if error.is_conflict() {
            self.notify_error(CONFLICT_MESSAGE);
        } else {
            self.notify_error(fallback);
        }
    }

    pub fn auth_required(&self) {
        warn!("Backend requires authorization");
        let _ = self.shared.events.send(AppEvent::AuthRequired);
    }

    /// Spawn a side effect that is dropped on shutdown.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shared.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = task => {}
            }
        });
    }

    /// Register a poll for `key`, cancelling any poll already running for it.
    pub(crate) fn start_poll(&self, key: &str) -> CancellationToken {
        let token = self.shared.shutdown.child_token();
        if let Some(previous) = self.shared.polls.lock().insert(key.to_string(), token.clone()) {
            previous.cancel();
        }
        token
    }

    pub(crate) fn stop_poll(&self, key: &str) {
        if let Some(token) = self.shared.polls.lock().remove(key) {
            token.cancel();
        }
    }

    pub(crate) fn is_polling(&self, key: &str) -> bool {
        self.shared.polls.lock().contains_key(key)
    }
}

/// Owns the application state and runs the dispatch loop.
///
/// Every action is reduced into the state first, then broadcast as
/// [`AppEvent::Action`], then handed to the controller of its slice.
pub struct AppController {
    ctx: EpicContext,
}

impl AppController {
    /// Start the dispatch loop. Must be called inside a Tokio runtime.
    pub fn new(config: AppConfig, services: Services) -> Self {
        let (actions, action_rx) = mpsc::unbounded_channel();
        let (local_settings, settings_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = CancellationToken::new();

        tokio::spawn(persist_local_settings(
            services.local_settings.clone(),
            settings_rx,
            shutdown.clone(),
        ));

        let ctx = EpicContext {
            shared: Arc::new(Shared {
                state: RwLock::new(AppState::new(&config)),
                actions,
                events,
                local_settings,
                services,
                config,
                polls: Mutex::new(HashMap::new()),
                shutdown,
            }),
        };
        tokio::spawn(run_loop(ctx.clone(), action_rx));
        Self { ctx }
    }

    /// Load config and local settings from disk, connect over HTTP and start.
    pub async fn bootstrap() -> anyhow::Result<Self> {
        let config = AppConfigJsonRepository::new()
            .context("Failed to locate config directory")?
            .load()
            .await
            .context("Failed to load app config")?;
        let local_settings =
            LocalSettingsJsonRepository::new().context("Failed to locate local settings")?;
        let services = Services::http(&config, Arc::new(local_settings))
            .context("Failed to create API client")?;

        let controller = Self::new(config, services);
        controller.init().await;
        info!("Application controller started");
        Ok(controller)
    }

    /// Restore local settings, then load models, conversations and prompts.
    pub async fn init(&self) {
        let settings = match self.ctx.services().local_settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = ?e, "Failed to load local settings, using defaults");
                LocalSettings::default()
            }
        };
        self.dispatch(Action::LocalSettingsLoaded(settings));
        self.dispatch(ModelsAction::GetModels);
        self.dispatch(ConversationAction::Init);
        self.dispatch(PromptAction::Init);
    }

    pub fn dispatch(&self, action: impl Into<Action>) {
        self.ctx.dispatch(action);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.ctx.shared.events.subscribe()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        self.ctx.read(f)
    }

    pub fn snapshot(&self) -> AppState {
        self.ctx.read(AppState::clone)
    }

    pub fn context(&self) -> &EpicContext {
        &self.ctx
    }

    /// Stop the dispatch loop and every running side effect.
    pub fn shutdown(&self) {
        self.ctx.shared.shutdown.cancel();
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_loop(ctx: EpicContext, mut actions: mpsc::UnboundedReceiver<Action>) {
    let shutdown = ctx.shared.shutdown.clone();
    loop {
        let action = tokio::select! {
            _ = shutdown.cancelled() => break,
            action = actions.recv() => match action {
                Some(action) => action,
                None => break,
            },
        };

        let (previous, settings) = {
            let mut state = ctx.shared.state.write();
            let previous = Previous::capture(&state, &action);
            state.reduce(&action);
            let settings = action
                .affects_local_settings()
                .then(|| state.local_settings());
            (previous, settings)
        };

        if let Some(settings) = settings {
            let _ = ctx.shared.local_settings.send(settings);
        }
        let _ = ctx.shared.events.send(AppEvent::Action(action.clone()));
        route(&ctx, &action, previous);
    }
    debug!("Dispatch loop stopped");
}

fn route(ctx: &EpicContext, action: &Action, previous: Previous) {
    match action {
        Action::LocalSettingsLoaded(_) => {}
        Action::Conversations(action) => {
            conversations::controllers::handle(ctx, action, previous.conversation)
        }
        Action::Prompts(action) => prompts::controllers::handle(ctx, action, previous.prompt),
        Action::Models(action) => settings::controllers::handle(ctx, action),
        Action::Publications(action) => publications::controllers::handle_publication(ctx, action),
        Action::Share(action) => publications::controllers::handle_share(ctx, action),
    }
}

/// Single writer for local settings; bursts collapse into the latest snapshot.
async fn persist_local_settings(
    repository: Arc<dyn LocalSettingsRepository>,
    mut updates: mpsc::UnboundedReceiver<LocalSettings>,
    shutdown: CancellationToken,
) {
    loop {
        let mut settings = tokio::select! {
            _ = shutdown.cancelled() => break,
            settings = updates.recv() => match settings {
                Some(settings) => settings,
                None => break,
            },
        };
        while let Ok(newer) = updates.try_recv() {
            settings = newer;
        }
        if let Err(e) = repository.save(settings).await {
            warn!(error = ?e, "Failed to save local settings");
        }
    }
}
