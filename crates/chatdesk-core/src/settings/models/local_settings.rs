use serde::{Deserialize, Serialize};

use crate::conversations::models::MessageSettings;
use crate::entities::{EntityId, FolderPath};

/// State that survives restarts on this machine only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSettings {
    /// Settings of the last conversation a message was sent from; new conversations start from them.
    #[serde(default)]
    pub last_conversation_settings: Option<MessageSettings>,
    #[serde(default)]
    pub recent_model_ids: Vec<String>,
    #[serde(default)]
    pub installed_model_ids: Vec<String>,
    #[serde(default)]
    pub selected_conversation_ids: Vec<EntityId>,
    #[serde(default)]
    pub collapsed_folder_ids: Vec<FolderPath>,
}

impl LocalSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a selection; unsaved conversations do not outlive the session.
    pub fn set_selection(&mut self, ids: &[EntityId]) {
        self.selected_conversation_ids = ids.iter().filter(|id| !id.is_local()).cloned().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ApiKind;

    #[test]
    fn test_selection_skips_local_ids() {
        let own = EntityId::new(FolderPath::root(ApiKind::Conversations, "u"), "a");
        let local = EntityId::new(FolderPath::local_root(ApiKind::Conversations), "b");
        let mut settings = LocalSettings::new();
        settings.set_selection(&[local, own.clone()]);
        assert_eq!(settings.selected_conversation_ids, vec![own]);
    }

    #[test]
    fn test_missing_fields_default() {
        let settings: LocalSettings = serde_json::from_str(r#"{"recentModelIds":["m"]}"#).unwrap();
        assert_eq!(settings.recent_model_ids, vec!["m"]);
        assert!(settings.last_conversation_settings.is_none());
    }
}
