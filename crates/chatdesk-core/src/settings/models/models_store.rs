use serde::{Deserialize, Serialize};

use crate::entities::LoadStatus;
use crate::settings::actions::ModelsAction;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Model,
    Application,
    Assistant,
    Addon,
}

/// Which conversation settings a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFeatures {
    #[serde(default = "default_true")]
    pub system_prompt: bool,
    #[serde(default = "default_true")]
    pub temperature: bool,
    #[serde(default)]
    pub addons: bool,
    #[serde(default)]
    pub attachments: bool,
}

impl Default for ModelFeatures {
    fn default() -> Self {
        Self {
            system_prompt: true,
            temperature: true,
            addons: false,
            attachments: false,
        }
    }
}

/// Deployment state of an application.
///
/// not-deployed → deploying → deployed | failed, and
/// deployed → undeploying → undeployed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionStatus {
    NotDeployed,
    Deploying,
    Deployed,
    Undeploying,
    Undeployed,
    Failed,
}

impl FunctionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FunctionStatus::Deployed | FunctionStatus::Undeployed | FunctionStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    /// Version-independent key; recent/installed lists are keyed by it.
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ModelKind,
    #[serde(default)]
    pub features: ModelFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_status: Option<FunctionStatus>,
}

impl Model {
    pub fn new(id: impl Into<String>, kind: ModelKind) -> Self {
        let id = id.into();
        Self {
            reference: id.clone(),
            name: id.clone(),
            id,
            kind,
            features: ModelFeatures::default(),
            function_status: None,
        }
    }
}

/// Catalog of models/applications plus the user's recent and installed lists.
#[derive(Debug, Clone)]
pub struct ModelsState {
    pub models: Vec<Model>,
    pub status: LoadStatus,
    pub error: Option<String>,
    /// Most recent first, capped at `recent_limit`.
    pub recent_model_ids: Vec<String>,
    pub installed_model_ids: Vec<String>,
    recent_limit: usize,
}

impl ModelsState {
    pub fn new(recent_limit: usize) -> Self {
        Self {
            models: Vec::new(),
            status: LoadStatus::NotLoaded,
            error: None,
            recent_model_ids: Vec::new(),
            installed_model_ids: Vec::new(),
            recent_limit,
        }
    }

    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Features of `id`, or the defaults for a model missing from the catalog.
    pub fn features(&self, id: &str) -> ModelFeatures {
        self.model(id).map(|m| m.features).unwrap_or_default()
    }

    pub fn function_status(&self, id: &str) -> Option<FunctionStatus> {
        self.model(id).and_then(|m| m.function_status)
    }

    pub fn reduce(&mut self, action: &ModelsAction) {
        use ModelsAction as A;

        match action {
            A::GetModels => {
                self.status = LoadStatus::Loading;
                self.error = None;
            }
            A::GetModelsSuccess { models } => {
                self.models = models.clone();
                self.status = LoadStatus::Loaded;
                self.error = None;
            }
            A::GetModelsFail { message, .. } => {
                self.status = LoadStatus::Failed;
                self.error = Some(message.clone());
            }
            A::InitLocalModels { recent, installed } => {
                self.recent_model_ids = recent.clone();
                self.recent_model_ids.truncate(self.recent_limit);
                self.installed_model_ids = installed.clone();
            }
            A::UpdateRecentModels { model_id } => {
                let reference = self
                    .model(model_id)
                    .map(|m| m.reference.clone())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| model_id.clone());
                self.recent_model_ids.retain(|id| id != &reference);
                self.recent_model_ids.insert(0, reference);
                self.recent_model_ids.truncate(self.recent_limit);
            }
            A::AddInstalledModels { ids } => {
                for id in ids {
                    if !self.installed_model_ids.contains(id) {
                        self.installed_model_ids.push(id.clone());
                    }
                }
            }
            A::RemoveInstalledModels { ids } => {
                self.installed_model_ids.retain(|id| !ids.contains(id));
            }
            A::Deploy { id } => self.set_status(id, FunctionStatus::Deploying),
            A::Undeploy { id } => self.set_status(id, FunctionStatus::Undeploying),
            A::UpdateFunctionStatus { id, status } | A::FunctionStatusTerminal { id, status } => {
                self.set_status(id, *status)
            }
        }
    }

    fn set_status(&mut self, id: &str, status: FunctionStatus) {
        if let Some(model) = self.models.iter_mut().find(|m| m.id == id) {
            model.function_status = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_models_most_recent_first_and_capped() {
        let mut state = ModelsState::new(2);
        for id in ["a", "b", "a", "c"] {
            state.reduce(&ModelsAction::UpdateRecentModels {
                model_id: id.into(),
            });
        }
        assert_eq!(state.recent_model_ids, vec!["c", "a"]);
    }

    #[test]
    fn test_recent_models_keyed_by_reference() {
        let mut state = ModelsState::new(5);
        let mut model = Model::new("gpt-4-0613", ModelKind::Model);
        model.reference = "gpt-4".into();
        state.reduce(&ModelsAction::GetModelsSuccess {
            models: vec![model],
        });
        state.reduce(&ModelsAction::UpdateRecentModels {
            model_id: "gpt-4-0613".into(),
        });
        assert_eq!(state.recent_model_ids, vec!["gpt-4"]);
    }

    #[test]
    fn test_installed_models_add_remove() {
        let mut state = ModelsState::new(5);
        state.reduce(&ModelsAction::AddInstalledModels {
            ids: vec!["a".into(), "b".into(), "a".into()],
        });
        state.reduce(&ModelsAction::RemoveInstalledModels {
            ids: vec!["a".into()],
        });
        assert_eq!(state.installed_model_ids, vec!["b"]);
    }

    #[test]
    fn test_deploy_status_transitions() {
        let mut state = ModelsState::new(5);
        state.reduce(&ModelsAction::GetModelsSuccess {
            models: vec![Model::new("app", ModelKind::Application)],
        });
        state.reduce(&ModelsAction::Deploy { id: "app".into() });
        assert_eq!(state.function_status("app"), Some(FunctionStatus::Deploying));
        assert!(!FunctionStatus::Deploying.is_terminal());

        state.reduce(&ModelsAction::FunctionStatusTerminal {
            id: "app".into(),
            status: FunctionStatus::Deployed,
        });
        assert_eq!(state.function_status("app"), Some(FunctionStatus::Deployed));
    }

    #[test]
    fn test_model_json() {
        let json = r#"{"id":"app-1","type":"application","functionStatus":"DEPLOYING",
                       "features":{"systemPrompt":false}}"#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.kind, ModelKind::Application);
        assert_eq!(model.function_status, Some(FunctionStatus::Deploying));
        assert!(!model.features.system_prompt);
        assert!(model.features.temperature);
    }
}
