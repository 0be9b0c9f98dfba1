use super::action::Action;
use crate::conversations::ConversationAction;
use crate::conversations::models::{ConversationsState, MessageSettings};
use crate::entities::EntityId;
use crate::prompts::PromptsState;
use crate::publications::models::PublicationsState;
use crate::publications::review::{PublicationReview, review_publication};
use crate::publications::{PublicationAction, ShareAction, ShareState};
use crate::settings::actions::ModelsAction;
use crate::settings::models::{AppConfig, LocalSettings, ModelsState};

/// The whole application state. Only [`AppState::reduce`] writes to it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub conversations: ConversationsState,
    pub prompts: PromptsState,
    pub models: ModelsState,
    pub publications: PublicationsState,
    pub share: ShareState,
    /// Settings of the conversation that last sent a message; seeds new conversations.
    pub last_conversation_settings: Option<MessageSettings>,
    /// Selection read from local settings, applied once the listing arrives.
    pub restored_selection: Vec<EntityId>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            conversations: ConversationsState::new(config.user_bucket.clone()),
            prompts: PromptsState::new(config.user_bucket.clone()),
            models: ModelsState::new(config.recent_models_limit),
            publications: PublicationsState::new(),
            share: ShareState::default(),
            last_conversation_settings: None,
            restored_selection: Vec::new(),
        }
    }

    pub fn reduce(&mut self, action: &Action) {
        match action {
            Action::LocalSettingsLoaded(settings) => {
                self.models.reduce(&ModelsAction::InitLocalModels {
                    recent: settings.recent_model_ids.clone(),
                    installed: settings.installed_model_ids.clone(),
                });
                self.conversations.collapsed_folder_ids = settings.collapsed_folder_ids.clone();
                self.last_conversation_settings = settings.last_conversation_settings.clone();
                self.restored_selection = settings.selected_conversation_ids.clone();
            }
            Action::Conversations(action) => {
                self.conversations.reduce(action);
                if let ConversationAction::SendMessage { id, .. } = action {
                    if let Some(conversation) = self.conversations.conversation(id) {
                        self.last_conversation_settings = Some(conversation.settings());
                    }
                }
            }
            Action::Prompts(action) => self.prompts.reduce(action),
            Action::Models(action) => self.models.reduce(action),
            Action::Publications(action) => {
                self.publications.reduce(action);
                if let PublicationAction::ApprovePublicationSuccess { url } = action {
                    self.mark_published(url);
                }
            }
            Action::Share(action) => {
                self.share.reduce(action);
                self.reduce_share(action);
            }
        }
    }

    /// Snapshot of everything persisted between sessions.
    pub fn local_settings(&self) -> LocalSettings {
        let mut settings = LocalSettings {
            last_conversation_settings: self.last_conversation_settings.clone(),
            recent_model_ids: self.models.recent_model_ids.clone(),
            installed_model_ids: self.models.installed_model_ids.clone(),
            collapsed_folder_ids: self.conversations.collapsed_folder_ids.clone(),
            ..LocalSettings::default()
        };
        settings.set_selection(&self.conversations.selected_ids);
        settings
    }

    pub fn publication_review(&self, url: &str) -> Option<PublicationReview> {
        let publication = self.publications.publication(url)?;
        Some(review_publication(
            publication,
            &self.publications.publications,
            &self.publications.public_entities,
        ))
    }

    fn reduce_share(&mut self, action: &ShareAction) {
        match action {
            ShareAction::ShareSuccess { ids, .. } => {
                self.conversations.mark_shared(ids, true);
                self.prompts.mark_shared(ids, true);
            }
            ShareAction::RevokeSuccess { ids } => {
                self.conversations.mark_shared(ids, false);
                self.prompts.mark_shared(ids, false);
            }
            ShareAction::AcceptInvitationSuccess {
                conversations,
                prompts,
            } => {
                self.conversations.add_shared_with_me(conversations);
                self.prompts.add_shared_with_me(prompts);
            }
            ShareAction::DiscardSuccess { ids } => {
                self.conversations.remove(ids);
                self.prompts.remove(ids);
            }
            ShareAction::Share { .. }
            | ShareAction::AcceptInvitation { .. }
            | ShareAction::Revoke { .. }
            | ShareAction::Discard { .. }
            | ShareAction::ShareFail { .. } => {}
        }
    }

    /// Own conversations that an approved publication copied to the public bucket.
    fn mark_published(&mut self, url: &str) {
        let Some(publication) = self.publications.publication(url) else {
            return;
        };
        let sources: Vec<EntityId> = publication
            .resources
            .iter()
            .filter(|r| !r.action.is_unpublish())
            .filter_map(|r| r.source_url.clone())
            .collect();
        for conversation in self
            .conversations
            .conversations
            .iter_mut()
            .filter(|c| sources.contains(&c.id))
        {
            conversation.is_published = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::models::{Conversation, ModelRef};
    use crate::entities::{ApiKind, FolderPath};

    fn config() -> AppConfig {
        AppConfig::new("http://localhost", "user")
    }

    fn conversation(name: &str) -> Conversation {
        let id = EntityId::new(FolderPath::root(ApiKind::Conversations, "user"), name);
        Conversation::new(id, ModelRef::new("gpt-4"), 0.5)
    }

    #[test]
    fn test_local_settings_loaded_seeds_slices() {
        let mut state = AppState::new(&config());
        let selected = conversation("a").id;
        let settings = LocalSettings {
            recent_model_ids: vec!["gpt-4".into()],
            selected_conversation_ids: vec![selected.clone()],
            ..LocalSettings::default()
        };

        state.reduce(&Action::LocalSettingsLoaded(settings));

        assert_eq!(state.models.recent_model_ids, vec!["gpt-4"]);
        assert_eq!(state.restored_selection, vec![selected]);
    }

    #[test]
    fn test_share_actions_touch_entity_slices() {
        let mut state = AppState::new(&config());
        let a = conversation("a");
        state.reduce(&Action::Conversations(ConversationAction::AddConversations {
            conversations: vec![a.clone()],
            select: true,
        }));

        state.reduce(&Action::Share(ShareAction::ShareSuccess {
            ids: vec![a.id.clone()],
            invitation_link: "/v1/invitations/1".into(),
        }));
        assert!(state.conversations.conversation(&a.id).unwrap().is_shared);
        assert_eq!(state.share.invitation_link.as_deref(), Some("/v1/invitations/1"));

        state.reduce(&Action::Share(ShareAction::DiscardSuccess {
            ids: vec![a.id.clone()],
        }));
        assert!(state.conversations.conversation(&a.id).is_none());
    }

    #[test]
    fn test_local_settings_skip_unsaved_selection() {
        let mut state = AppState::new(&config());
        let mut local = conversation("draft");
        local.id = EntityId::new(FolderPath::local_root(ApiKind::Conversations), "draft");
        let saved = conversation("saved");
        state.reduce(&Action::Conversations(ConversationAction::AddConversations {
            conversations: vec![saved.clone(), local],
            select: true,
        }));

        let settings = state.local_settings();
        assert_eq!(settings.selected_conversation_ids, vec![saved.id]);
    }
}
