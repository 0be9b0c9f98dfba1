use tracing::{debug, info, warn};

use crate::app::folder_ops::{self, FolderScope};
use crate::app::{Action, AppState, EpicContext};
use crate::entities::naming::{
    DEFAULT_PROMPT_NAME, next_default_name, prepare_entity_name, unique_name,
};
use crate::entities::{EntityId, Folder, FolderItem, FolderPath, IdRemap, LoadStatus};
use crate::prompts::{Prompt, PromptAction, PromptPatch};
use crate::repositories::RepositoryResult;
use crate::repositories::batch::{delete_all, relocate};

fn folder_scope(ctx: &EpicContext) -> FolderScope<Prompt> {
    fn tree(state: &AppState) -> (&[Folder], Vec<&EntityId>) {
        (
            &state.prompts.folders,
            state.prompts.prompts.iter().map(|p| &p.id).collect(),
        )
    }
    fn apply(remap: IdRemap) -> Action {
        PromptAction::ApplyIdRemap { remap }.into()
    }
    FolderScope {
        tree,
        repository: ctx.services().prompts.clone(),
        apply,
    }
}

async fn load_body(ctx: &EpicContext, id: &EntityId) -> RepositoryResult<Prompt> {
    let resident = ctx.read(|s| s.prompts.prompt(id).filter(|p| p.is_loaded()).cloned());
    if let Some(prompt) = resident {
        return Ok(prompt);
    }
    let mut prompt = ctx.services().prompts.get(id).await?;
    prompt.set_entity_id(id.clone());
    prompt.status = LoadStatus::Loaded;
    Ok(prompt)
}

/// List the user's prompt tree. A refresh replaces the tree instead of merging into it.
pub fn load_tree(ctx: &EpicContext, replace: bool) {
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let root = ctx.read(|s| s.prompts.root_folder());
        match ctx.services().prompts.list(&root).await {
            Ok(listing) => {
                info!(prompts = listing.entities.len(), replace, "Loaded prompts");
                let folders = listing
                    .folders
                    .into_iter()
                    .map(|id| Folder {
                        status: LoadStatus::Loaded,
                        ..Folder::new(id)
                    })
                    .collect();
                ctx.dispatch(PromptAction::UploadPromptsSuccess {
                    folders,
                    prompts: listing.entities,
                    replace,
                });
            }
            Err(e) => {
                warn!(error = ?e, "Failed to load prompts");
                ctx.report(&e, "Failed to load prompts.");
                ctx.dispatch(PromptAction::UploadPromptsFail {
                    message: e.to_string(),
                });
            }
        }
    });
}

/// Insert `prompt` optimistically and store it. The backend may store it under
/// another name; the insert is then dropped and the tree listed again.
fn store_new(ctx: &EpicContext, prompt: Prompt) {
    let id = prompt.id.clone();
    ctx.dispatch(PromptAction::AddPrompts {
        prompts: vec![prompt.clone()],
    });

    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().prompts.create(prompt).await {
            Ok(stored) if stored == id => ctx.dispatch(PromptAction::SavePromptSuccess { id }),
            Ok(stored) => {
                debug!(requested = %id.encode(), stored = %stored.encode(), "Prompt renamed on create");
                ctx.dispatch(PromptAction::DeletePromptsComplete { ids: vec![id] });
                ctx.dispatch(PromptAction::RefreshPromptsTree);
            }
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to create prompt");
                ctx.report(&e, "Failed to create prompt.");
                ctx.dispatch(PromptAction::DeletePromptsComplete { ids: vec![id] });
            }
        }
    });
}

pub fn create(
    ctx: &EpicContext,
    folder: Option<&FolderPath>,
    name: Option<&str>,
    description: &str,
    content: &str,
) {
    let prompt = ctx.read(|s| {
        let folder = folder.cloned().unwrap_or_else(|| s.prompts.root_folder());
        let taken = s.prompts.names_in_folder(&folder);
        let name = match name.map(prepare_entity_name).filter(|n| !n.is_empty()) {
            Some(name) => unique_name(&name, taken.iter().map(String::as_str)),
            None => next_default_name(DEFAULT_PROMPT_NAME, taken.iter().map(String::as_str), 0),
        };
        Prompt {
            description: description.to_string(),
            ..Prompt::new(EntityId::new(folder, name), content)
        }
    });
    store_new(ctx, prompt);
}

/// Copy a prompt, shared or own, into the user's root folder.
pub fn duplicate(ctx: &EpicContext, id: &EntityId) {
    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let source = match load_body(&ctx, &id).await {
            Ok(prompt) => prompt,
            Err(e) => {
                ctx.report(&e, "Failed to duplicate prompt.");
                return;
            }
        };
        let copy = ctx.read(|s| {
            let root = s.prompts.root_folder();
            let taken = s.prompts.names_in_folder(&root);
            let name = unique_name(&source.name, taken.iter().map(String::as_str));
            Prompt {
                description: source.description.clone(),
                ..Prompt::new(EntityId::new(root, name), source.content.clone())
            }
        });
        store_new(&ctx, copy);
    });
}

pub fn save(ctx: &EpicContext, id: &EntityId) {
    let prompt = ctx.read(|s| {
        s.prompts
            .prompt(id)
            .filter(|p| p.is_loaded() && !p.shared_with_me)
            .cloned()
    });
    let Some(prompt) = prompt else {
        return;
    };

    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().prompts.update(prompt).await {
            Ok(()) => ctx.dispatch(PromptAction::SavePromptSuccess { id }),
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to save prompt");
                ctx.report(&e, "Failed to save prompt.");
            }
        }
    });
}

/// Same contract as conversation updates: identity changes move the stored
/// prompt, and any failure restores `previous`.
pub fn update(ctx: &EpicContext, id: &EntityId, values: &PromptPatch, previous: Option<Prompt>) {
    let Some(previous) = previous else {
        return;
    };
    let Some(current) = ctx.read(|s| s.prompts.prompt(id).cloned()) else {
        return;
    };

    if !values.affects_identity() {
        ctx.dispatch(PromptAction::UpdatePromptSuccess {
            id: id.clone(),
            prompt: values.clone(),
        });
        let id = id.clone();
        let values = values.clone();
        let task_ctx = ctx.clone();
        ctx.spawn(async move {
            let ctx = task_ctx;
            let body = if current.is_loaded() {
                Ok(current)
            } else {
                load_body(&ctx, &id).await.map(|mut body| {
                    values.apply(&mut body);
                    body
                })
            };
            let result = match body {
                Ok(body) => ctx.services().prompts.update(body).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(id = %id.encode(), error = ?e, "Failed to update prompt");
                ctx.report(&e, "Failed to update prompt.");
                ctx.dispatch(PromptAction::UpdatePromptFail {
                    id,
                    previous: Box::new(previous),
                });
            }
        });
        return;
    }

    let new_id = ctx.read(|s| {
        let folder = values
            .folder
            .clone()
            .unwrap_or_else(|| current.folder_id().clone());
        let name = values
            .name
            .as_deref()
            .map(prepare_entity_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| current.name.clone());
        let taken: Vec<String> = s
            .prompts
            .prompts
            .iter()
            .filter(|p| p.folder_id() == &folder && &p.id != id)
            .map(|p| p.name.clone())
            .collect();
        EntityId::new(folder, unique_name(&name, taken.iter().map(String::as_str)))
    });

    let patch = PromptPatch {
        id: Some(new_id.clone()),
        ..values.without_identity()
    };
    ctx.dispatch(PromptAction::UpdatePromptSuccess {
        id: id.clone(),
        prompt: patch.clone(),
    });
    if &new_id == id {
        return;
    }

    let body_resident = current.is_loaded();
    let mut moved = current;
    patch.apply(&mut moved);
    let old_id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let repository = ctx.services().prompts.clone();
        let result = if body_resident {
            relocate(repository.as_ref(), moved, &old_id).await
        } else {
            repository
                .move_entity(&old_id, &new_id)
                .await
                .map(|()| new_id.clone())
        };

        match result {
            Ok(stored) => {
                info!(from = %old_id.encode(), to = %stored.encode(), "Prompt moved");
                ctx.dispatch(PromptAction::SavePromptSuccess { id: stored });
            }
            Err(e) => {
                warn!(from = %old_id.encode(), to = %new_id.encode(), error = ?e, "Failed to move prompt");
                ctx.report(&e, "Failed to move prompt.");
                ctx.dispatch(PromptAction::UpdatePromptFail {
                    id: new_id,
                    previous: Box::new(previous),
                });
            }
        }
    });
}

/// Delete the user's own prompts on the backend; every id leaves the state.
pub fn delete(ctx: &EpicContext, ids: &[EntityId]) {
    if ids.is_empty() {
        return;
    }
    let own: Vec<EntityId> = ctx.read(|s| {
        ids.iter()
            .filter(|id| id.bucket() == s.prompts.bucket())
            .cloned()
            .collect()
    });

    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let failed = delete_all(ctx.services().prompts.as_ref(), &own).await;
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(EntityId::name).collect();
            ctx.notify_error(format!(
                "An error occurred while deleting prompts: {}",
                names.join(", ")
            ));
        }
        ctx.dispatch(PromptAction::DeletePromptsComplete { ids });
    });
}

/// Fetch the body of a prompt that was selected while only its header was known.
pub fn load_selected(ctx: &EpicContext, id: &EntityId) {
    let loaded = ctx.read(|s| s.prompts.prompt(id).is_none_or(Prompt::is_loaded));
    if loaded {
        return;
    }

    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match load_body(&ctx, &id).await {
            Ok(prompt) => ctx.dispatch(PromptAction::UploadPromptSuccess { prompt }),
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to load prompt");
                ctx.report(&e, "Failed to load prompt.");
            }
        }
    });
}

pub fn delete_folder(ctx: &EpicContext, id: &FolderPath) {
    let ids: Vec<EntityId> = ctx.read(|s| {
        s.prompts
            .prompts_in_folder(id)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    });
    if !ids.is_empty() {
        ctx.dispatch(PromptAction::DeletePrompts { ids });
    }
}

pub fn rename_folder(ctx: &EpicContext, id: &FolderPath, name: &str) {
    folder_ops::rename(ctx, folder_scope(ctx), id, name);
}

pub fn move_folder(ctx: &EpicContext, id: &FolderPath, parent: &FolderPath) {
    folder_ops::relocate(ctx, folder_scope(ctx), id, parent);
}
