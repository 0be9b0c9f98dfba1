pub mod prompt_controller;

use crate::app::EpicContext;
use crate::prompts::{Prompt, PromptAction};

pub fn handle(ctx: &EpicContext, action: &PromptAction, previous: Option<Prompt>) {
    use PromptAction as A;
    use prompt_controller as prompts;

    match action {
        A::Init => prompts::load_tree(ctx, false),
        A::RefreshPromptsTree => prompts::load_tree(ctx, true),
        A::CreateNewPrompt {
            folder,
            name,
            description,
            content,
        } => prompts::create(ctx, folder.as_ref(), name.as_deref(), description, content),
        A::DuplicatePrompt { id } => prompts::duplicate(ctx, id),
        A::SavePrompt { id } => prompts::save(ctx, id),
        A::UpdatePrompt { id, values } => prompts::update(ctx, id, values, previous),
        A::DeletePrompts { ids } => prompts::delete(ctx, ids),
        A::SetSelectedPrompt { id: Some(id) } => prompts::load_selected(ctx, id),
        A::RenameFolder { id, name } => prompts::rename_folder(ctx, id, name),
        A::MoveFolder { id, parent } => prompts::move_folder(ctx, id, parent),
        A::DeleteFolder { id } => prompts::delete_folder(ctx, id),

        A::UploadPromptsSuccess { .. }
        | A::UploadPromptsFail { .. }
        | A::UploadPromptSuccess { .. }
        | A::AddPrompts { .. }
        | A::SavePromptSuccess { .. }
        | A::UpdatePromptSuccess { .. }
        | A::UpdatePromptFail { .. }
        | A::DeletePromptsComplete { .. }
        | A::SetSelectedPrompt { id: None }
        | A::CreateFolder { .. }
        | A::ApplyIdRemap { .. } => {}
    }
}
