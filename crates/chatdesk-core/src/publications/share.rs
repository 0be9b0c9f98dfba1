use crate::conversations::models::Conversation;
use crate::entities::EntityId;
use crate::prompts::models::Prompt;

/// Share invitations over conversations and prompts.
///
/// The flags they toggle live on the entities themselves, so the app state
/// applies these actions to the conversation and prompt slices as well.
#[derive(Debug, Clone)]
pub enum ShareAction {
    Share {
        ids: Vec<EntityId>,
    },
    ShareSuccess {
        ids: Vec<EntityId>,
        invitation_link: String,
    },
    AcceptInvitation {
        invitation_id: String,
    },
    AcceptInvitationSuccess {
        conversations: Vec<Conversation>,
        prompts: Vec<Prompt>,
    },
    /// Stop sharing own entities with everybody who accepted.
    Revoke {
        ids: Vec<EntityId>,
    },
    RevokeSuccess {
        ids: Vec<EntityId>,
    },
    /// Drop entities someone else shared with the user.
    Discard {
        ids: Vec<EntityId>,
    },
    DiscardSuccess {
        ids: Vec<EntityId>,
    },
    ShareFail {
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ShareState {
    pub in_progress: bool,
    pub invitation_link: Option<String>,
    pub error: Option<String>,
}

impl ShareState {
    pub fn reduce(&mut self, action: &ShareAction) {
        use ShareAction as A;

        match action {
            A::Share { .. } => {
                self.in_progress = true;
                self.invitation_link = None;
                self.error = None;
            }
            A::AcceptInvitation { .. } | A::Revoke { .. } | A::Discard { .. } => {
                self.in_progress = true;
                self.error = None;
            }
            A::ShareSuccess {
                invitation_link, ..
            } => {
                self.in_progress = false;
                self.invitation_link = Some(invitation_link.clone());
            }
            A::AcceptInvitationSuccess { .. } | A::RevokeSuccess { .. } | A::DiscardSuccess { .. } => {
                self.in_progress = false;
            }
            A::ShareFail { message } => {
                self.in_progress = false;
                self.error = Some(message.clone());
            }
        }
    }
}
