use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::message::{Message, MessageSettings, ModelRef};
use crate::entities::{EntityId, FolderItem, FolderPath, LoadStatus, PublicationInfo};
use crate::repositories::StoredEntity;

fn default_temperature() -> f32 {
    1.0
}

/// Cursor over the user messages of a conversation being re-sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayState {
    pub replay_user_messages_stack: Vec<Message>,
    pub active_replay_index: usize,
    #[serde(default)]
    pub is_error: bool,
    /// Reuse each message's recorded model/settings instead of the current ones.
    #[serde(default)]
    pub replay_as_is: bool,
    /// Current step finished; waiting for peers before advancing.
    #[serde(skip)]
    pub awaiting_next: bool,
}

impl ReplayState {
    pub fn new(stack: Vec<Message>, replay_as_is: bool) -> Self {
        Self {
            replay_user_messages_stack: stack,
            active_replay_index: 0,
            is_error: false,
            replay_as_is,
            awaiting_next: false,
        }
    }

    pub fn current(&self) -> Option<&Message> {
        self.replay_user_messages_stack.get(self.active_replay_index)
    }

    pub fn is_finished(&self) -> bool {
        self.active_replay_index >= self.replay_user_messages_stack.len()
    }
}

/// Cursor over a recorded message sequence presented without calling the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub messages_stack: Vec<Message>,
    pub active_playback_index: usize,
}

impl PlaybackState {
    pub fn new(messages_stack: Vec<Message>) -> Self {
        Self {
            messages_stack,
            active_playback_index: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.active_playback_index >= self.messages_stack.len()
    }
}

/// Replay and playback are mutually exclusive, so they share one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "camelCase")]
pub enum ConversationMode {
    #[default]
    Normal,
    Replay(ReplayState),
    Playback(PlaybackState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: EntityId,
    pub name: String,
    pub model: ModelRef,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub selected_addons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_model_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub last_activity_date: i64,
    #[serde(skip)]
    pub is_message_streaming: bool,
    #[serde(skip)]
    pub status: LoadStatus,
    #[serde(default)]
    pub mode: ConversationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_info: Option<PublicationInfo>,
    #[serde(default, skip_serializing)]
    pub is_shared: bool,
    #[serde(default, skip_serializing)]
    pub shared_with_me: bool,
    #[serde(default, skip_serializing)]
    pub is_published: bool,
}

impl Conversation {
    pub fn new(id: EntityId, model: ModelRef, temperature: f32) -> Self {
        Self {
            name: id.name().to_string(),
            id,
            model,
            prompt: String::new(),
            temperature,
            selected_addons: Vec::new(),
            assistant_model_id: None,
            messages: Vec::new(),
            last_activity_date: Utc::now().timestamp_millis(),
            is_message_streaming: false,
            status: LoadStatus::Loaded,
            mode: ConversationMode::Normal,
            publication_info: None,
            is_shared: false,
            shared_with_me: false,
            is_published: false,
        }
    }

    /// Header-only conversation built from a listing entry; the body is fetched on selection.
    pub fn from_listing(id: EntityId, updated_at: Option<i64>) -> Self {
        Self {
            last_activity_date: updated_at.unwrap_or_default(),
            status: LoadStatus::NotLoaded,
            ..Self::new(id, ModelRef::new(""), default_temperature())
        }
    }

    pub fn folder_id(&self) -> &FolderPath {
        self.id.folder()
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    pub fn has_form_content(&self) -> bool {
        self.messages.iter().any(Message::has_form_content)
    }

    pub fn settings(&self) -> MessageSettings {
        MessageSettings {
            model_id: self.model.id.clone(),
            prompt: self.prompt.clone(),
            temperature: self.temperature,
            selected_addons: self.selected_addons.clone(),
            assistant_model_id: self.assistant_model_id.clone(),
        }
    }

    pub fn apply_settings(&mut self, settings: &MessageSettings) {
        self.model = ModelRef::new(settings.model_id.clone());
        self.prompt = settings.prompt.clone();
        self.temperature = settings.temperature;
        self.selected_addons = settings.selected_addons.clone();
        self.assistant_model_id = settings.assistant_model_id.clone();
    }

    pub fn replay(&self) -> Option<&ReplayState> {
        match &self.mode {
            ConversationMode::Replay(replay) => Some(replay),
            _ => None,
        }
    }

    pub fn replay_mut(&mut self) -> Option<&mut ReplayState> {
        match &mut self.mode {
            ConversationMode::Replay(replay) => Some(replay),
            _ => None,
        }
    }

    pub fn playback(&self) -> Option<&PlaybackState> {
        match &self.mode {
            ConversationMode::Playback(playback) => Some(playback),
            _ => None,
        }
    }

    pub fn playback_mut(&mut self) -> Option<&mut PlaybackState> {
        match &mut self.mode {
            ConversationMode::Playback(playback) => Some(playback),
            _ => None,
        }
    }

    pub fn is_replay(&self) -> bool {
        self.replay().is_some()
    }

    pub fn is_playback(&self) -> bool {
        self.playback().is_some()
    }

    pub fn touch(&mut self) {
        self.last_activity_date = Utc::now().timestamp_millis();
    }
}

impl FolderItem for Conversation {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn set_entity_id(&mut self, id: EntityId) {
        self.name = id.name().to_string();
        self.id = id;
    }
}

impl StoredEntity for Conversation {
    fn from_listing(id: EntityId, updated_at: Option<i64>) -> Self {
        Conversation::from_listing(id, updated_at)
    }
}

/// Partial conversation update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationPatch {
    pub id: Option<EntityId>,
    pub name: Option<String>,
    pub folder: Option<FolderPath>,
    pub model: Option<ModelRef>,
    pub prompt: Option<String>,
    pub temperature: Option<f32>,
    pub selected_addons: Option<Vec<String>>,
    pub assistant_model_id: Option<Option<String>>,
    pub messages: Option<Vec<Message>>,
    pub is_message_streaming: Option<bool>,
    pub mode: Option<ConversationMode>,
    pub status: Option<LoadStatus>,
    pub is_shared: Option<bool>,
    pub publication_info: Option<Option<PublicationInfo>>,
}

impl ConversationPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn folder(folder: FolderPath) -> Self {
        Self {
            folder: Some(folder),
            ..Self::default()
        }
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Some(messages),
            ..Self::default()
        }
    }

    pub fn settings(settings: &MessageSettings) -> Self {
        Self {
            model: Some(ModelRef::new(settings.model_id.clone())),
            prompt: Some(settings.prompt.clone()),
            temperature: Some(settings.temperature),
            selected_addons: Some(settings.selected_addons.clone()),
            assistant_model_id: Some(settings.assistant_model_id.clone()),
            ..Self::default()
        }
    }

    /// Whether the patch changes anything the id is derived from.
    pub fn affects_identity(&self) -> bool {
        self.name.is_some() || self.folder.is_some()
    }

    /// Merge into `conversation`. Name and folder are applied through `id`;
    /// callers derive the new id before patching.
    pub fn apply(&self, conversation: &mut Conversation) {
        if let Some(id) = &self.id {
            conversation.set_entity_id(id.clone());
        } else if let Some(name) = &self.name {
            conversation.name = name.clone();
        }
        if let Some(model) = &self.model {
            conversation.model = model.clone();
        }
        if let Some(prompt) = &self.prompt {
            conversation.prompt = prompt.clone();
        }
        if let Some(temperature) = self.temperature {
            conversation.temperature = temperature;
        }
        if let Some(addons) = &self.selected_addons {
            conversation.selected_addons = addons.clone();
        }
        if let Some(assistant) = &self.assistant_model_id {
            conversation.assistant_model_id = assistant.clone();
        }
        if let Some(messages) = &self.messages {
            conversation.messages = messages.clone();
        }
        if let Some(streaming) = self.is_message_streaming {
            conversation.is_message_streaming = streaming;
        }
        if let Some(mode) = &self.mode {
            conversation.mode = mode.clone();
        }
        if let Some(status) = self.status {
            conversation.status = status;
        }
        if let Some(shared) = self.is_shared {
            conversation.is_shared = shared;
        }
        if let Some(info) = &self.publication_info {
            conversation.publication_info = info.clone();
        }
    }
}
