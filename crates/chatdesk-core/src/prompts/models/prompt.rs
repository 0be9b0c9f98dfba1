use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, FolderItem, FolderPath, LoadStatus, PublicationInfo};
use crate::prompts::template::{self, TemplateVariable};
use crate::repositories::StoredEntity;

/// Reusable text snippet, optionally templated with `{{variables}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip)]
    pub status: LoadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_info: Option<PublicationInfo>,
    #[serde(default, skip_serializing)]
    pub is_shared: bool,
    #[serde(default, skip_serializing)]
    pub shared_with_me: bool,
}

impl Prompt {
    pub fn new(id: EntityId, content: impl Into<String>) -> Self {
        Self {
            name: id.name().to_string(),
            id,
            description: String::new(),
            content: content.into(),
            status: LoadStatus::Loaded,
            publication_info: None,
            is_shared: false,
            shared_with_me: false,
        }
    }

    pub fn folder_id(&self) -> &FolderPath {
        self.id.folder()
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    pub fn variables(&self) -> Vec<TemplateVariable> {
        template::parse_variables(&self.content)
    }
}

impl FolderItem for Prompt {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn set_entity_id(&mut self, id: EntityId) {
        self.name = id.name().to_string();
        self.id = id;
    }
}

impl StoredEntity for Prompt {
    fn from_listing(id: EntityId, _updated_at: Option<i64>) -> Self {
        Self {
            status: LoadStatus::NotLoaded,
            ..Prompt::new(id, "")
        }
    }
}

/// Partial prompt update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptPatch {
    pub id: Option<EntityId>,
    pub name: Option<String>,
    pub folder: Option<FolderPath>,
    pub description: Option<String>,
    pub content: Option<String>,
}

impl PromptPatch {
    pub fn affects_identity(&self) -> bool {
        self.name.is_some() || self.folder.is_some()
    }

    /// Drop the identity part, leaving what can be applied before the new id is known.
    pub fn without_identity(&self) -> Self {
        Self {
            id: None,
            name: None,
            folder: None,
            ..self.clone()
        }
    }

    pub fn apply(&self, prompt: &mut Prompt) {
        if let Some(id) = &self.id {
            prompt.set_entity_id(id.clone());
        } else if let Some(name) = &self.name {
            prompt.name = name.clone();
        }
        if let Some(description) = &self.description {
            prompt.description = description.clone();
        }
        if let Some(content) = &self.content {
            prompt.content = content.clone();
        }
    }
}
