use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Liked,
    Disliked,
}

impl Rating {
    /// Value sent to the rating endpoint.
    pub fn as_bool(&self) -> bool {
        matches!(self, Rating::Liked)
    }
}

/// Reference to a model/application by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub id: String,
}

impl ModelRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Failed,
}

/// A named step an application reports while producing its answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_value: Option<serde_json::Value>,
}

impl CustomContent {
    pub fn has_form(&self) -> bool {
        self.form_schema.is_some() || self.form_value.is_some()
    }

    /// Fold a streamed delta in: attachments append, stages merge by index,
    /// state and form fields are replaced.
    pub fn merge(&mut self, delta: &CustomContent) {
        self.attachments.extend(delta.attachments.iter().cloned());

        for incoming in &delta.stages {
            match self.stages.iter_mut().find(|s| s.index == incoming.index) {
                Some(stage) => {
                    if incoming.name.is_some() {
                        stage.name = incoming.name.clone();
                    }
                    if let Some(content) = &incoming.content {
                        stage
                            .content
                            .get_or_insert_with(String::new)
                            .push_str(content);
                    }
                    stage.attachments.extend(incoming.attachments.iter().cloned());
                    if incoming.status.is_some() {
                        stage.status = incoming.status;
                    }
                }
                None => self.stages.push(incoming.clone()),
            }
        }

        if delta.state.is_some() {
            self.state = delta.state.clone();
        }
        if delta.form_schema.is_some() {
            self.form_schema = delta.form_schema.clone();
        }
        if delta.form_value.is_some() {
            self.form_value = delta.form_value.clone();
        }
    }
}

/// Model/prompt/temperature/addons in effect when a message was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSettings {
    pub model_id: String,
    #[serde(default)]
    pub prompt: String,
    pub temperature: f32,
    #[serde(default)]
    pub selected_addons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "custom_content", skip_serializing_if = "Option::is_none")]
    pub custom_content: Option<CustomContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<MessageSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            custom_content: None,
            settings: None,
            error_message: None,
            like: None,
            response_id: None,
            model: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Empty assistant message the stream is appended into.
    pub fn assistant_placeholder(model: ModelRef) -> Self {
        Self {
            model: Some(model),
            ..Self::with_role(Role::Assistant, "")
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn is_empty_placeholder(&self) -> bool {
        self.is_assistant()
            && self.content.is_empty()
            && self.custom_content.is_none()
            && self.error_message.is_none()
    }

    pub fn has_form_content(&self) -> bool {
        self.custom_content.as_ref().is_some_and(CustomContent::has_form)
    }

    pub fn merge_delta(&mut self, delta: &MessageDelta) {
        if let Some(content) = &delta.content {
            self.content.push_str(content);
        }
        if let Some(custom) = &delta.custom_content {
            self.custom_content
                .get_or_insert_with(CustomContent::default)
                .merge(custom);
        }
        if delta.response_id.is_some() {
            self.response_id = delta.response_id.clone();
        }
    }
}

/// One decoded chunk of a chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "custom_content")]
    pub custom_content: Option<CustomContent>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl MessageDelta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Partial update for a single message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub custom_content: Option<CustomContent>,
    pub error_message: Option<Option<String>>,
    pub settings: Option<MessageSettings>,
}

impl MessagePatch {
    pub fn apply(&self, message: &mut Message) {
        if let Some(content) = &self.content {
            message.content = content.clone();
        }
        if let Some(custom) = &self.custom_content {
            message.custom_content = Some(custom.clone());
        }
        if let Some(error) = &self.error_message {
            message.error_message = error.clone();
        }
        if let Some(settings) = &self.settings {
            message.settings = Some(settings.clone());
        }
    }
}
