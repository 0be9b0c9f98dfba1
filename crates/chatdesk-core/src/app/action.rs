use crate::conversations::ConversationAction;
use crate::prompts::PromptAction;
use crate::publications::{PublicationAction, ShareAction};
use crate::settings::actions::ModelsAction;
use crate::settings::models::LocalSettings;

/// Every transition the application store accepts, grouped by slice.
#[derive(Debug, Clone)]
pub enum Action {
    /// Persisted preferences read once at startup.
    LocalSettingsLoaded(LocalSettings),
    Conversations(ConversationAction),
    Prompts(PromptAction),
    Models(ModelsAction),
    Publications(PublicationAction),
    Share(ShareAction),
}

impl Action {
    /// Whether reducing this action changes anything kept in [`LocalSettings`].
    pub fn affects_local_settings(&self) -> bool {
        use ConversationAction as C;

        match self {
            Action::Conversations(action) => matches!(
                action,
                C::SelectConversations { .. }
                    | C::AddConversations { select: true, .. }
                    | C::CreateNewConversationSuccess { .. }
                    | C::UpdateConversationSuccess { .. }
                    | C::UpdateConversationFail { .. }
                    | C::DeleteConversationsComplete { .. }
                    | C::SelectForCompareCompleted { .. }
                    | C::SendMessage { .. }
                    | C::ApplyIdRemap { .. }
                    | C::DeleteFolder { .. }
                    | C::ToggleFolderCollapse { .. }
            ),
            Action::Models(action) => matches!(
                action,
                ModelsAction::UpdateRecentModels { .. }
                    | ModelsAction::AddInstalledModels { .. }
                    | ModelsAction::RemoveInstalledModels { .. }
            ),
            Action::LocalSettingsLoaded(_)
            | Action::Prompts(_)
            | Action::Publications(_)
            | Action::Share(_) => false,
        }
    }
}

impl From<ConversationAction> for Action {
    fn from(action: ConversationAction) -> Self {
        Action::Conversations(action)
    }
}

impl From<PromptAction> for Action {
    fn from(action: PromptAction) -> Self {
        Action::Prompts(action)
    }
}

impl From<ModelsAction> for Action {
    fn from(action: ModelsAction) -> Self {
        Action::Models(action)
    }
}

impl From<PublicationAction> for Action {
    fn from(action: PublicationAction) -> Self {
        Action::Publications(action)
    }
}

impl From<ShareAction> for Action {
    fn from(action: ShareAction) -> Self {
        Action::Share(action)
    }
}
