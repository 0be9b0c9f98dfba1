use super::models::{Prompt, PromptPatch};
use crate::entities::{EntityId, Folder, FolderPath, IdRemap};

#[derive(Debug, Clone)]
pub enum PromptAction {
    Init,
    /// Listing result. With `replace` the tree is rebuilt from scratch.
    UploadPromptsSuccess {
        folders: Vec<Folder>,
        prompts: Vec<Prompt>,
        replace: bool,
    },
    UploadPromptsFail {
        message: String,
    },
    UploadPromptSuccess {
        prompt: Prompt,
    },
    /// Re-list the whole tree, discarding local guesses.
    RefreshPromptsTree,

    CreateNewPrompt {
        folder: Option<FolderPath>,
        name: Option<String>,
        description: String,
        content: String,
    },
    /// Optimistic insert ahead of the backend write.
    AddPrompts {
        prompts: Vec<Prompt>,
    },
    SavePrompt {
        id: EntityId,
    },
    SavePromptSuccess {
        id: EntityId,
    },
    UpdatePrompt {
        id: EntityId,
        values: PromptPatch,
    },
    UpdatePromptSuccess {
        id: EntityId,
        prompt: PromptPatch,
    },
    UpdatePromptFail {
        id: EntityId,
        previous: Box<Prompt>,
    },
    DeletePrompts {
        ids: Vec<EntityId>,
    },
    DeletePromptsComplete {
        ids: Vec<EntityId>,
    },
    DuplicatePrompt {
        id: EntityId,
    },
    SetSelectedPrompt {
        id: Option<EntityId>,
    },

    CreateFolder {
        parent: Option<FolderPath>,
        name: Option<String>,
    },
    RenameFolder {
        id: FolderPath,
        name: String,
    },
    MoveFolder {
        id: FolderPath,
        parent: FolderPath,
    },
    DeleteFolder {
        id: FolderPath,
    },
    ApplyIdRemap {
        remap: IdRemap,
    },
}
