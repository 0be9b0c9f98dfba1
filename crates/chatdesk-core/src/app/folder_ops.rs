use std::sync::Arc;

use tracing::{debug, warn};

use super::action::Action;
use super::controller::EpicContext;
use super::state::AppState;
use crate::entities::folders::{self, child_folders};
use crate::entities::naming::{prepare_entity_name, unique_name};
use crate::entities::{EntityId, Folder, FolderPath, IdRemap};
use crate::repositories::batch::move_all;
use crate::repositories::{EntityRepository, StoredEntity};

pub const EMPTY_FOLDER_NAME_MESSAGE: &str = "Folder name can't be empty.";
pub const DUPLICATE_FOLDER_MESSAGE: &str =
    "Not allowed to have folders with same names in the same folder.";

/// One folder tree (conversations or prompts) and how to rewrite it.
pub struct FolderScope<E: StoredEntity> {
    pub tree: for<'a> fn(&'a AppState) -> (&'a [Folder], Vec<&'a EntityId>),
    pub repository: Arc<dyn EntityRepository<E>>,
    pub apply: fn(IdRemap) -> Action,
}

/// Rename a folder; a name taken by a sibling gets a numeric suffix.
pub fn rename<E: StoredEntity>(ctx: &EpicContext, scope: FolderScope<E>, id: &FolderPath, name: &str) {
    let name = prepare_entity_name(name);
    if name.is_empty() {
        ctx.notify_error(EMPTY_FOLDER_NAME_MESSAGE);
        return;
    }

    let remap = ctx.read(|state| {
        let (tree, entity_ids) = (scope.tree)(state);
        let parent = id.parent()?;
        let siblings: Vec<&str> = child_folders(tree, &parent)
            .into_iter()
            .filter(|f| &f.id != id)
            .map(|f| f.name.as_str())
            .collect();
        let name = unique_name(&name, siblings.iter().copied());
        Some(folders::rename_folder(tree, entity_ids, id, &name))
    });

    if let Some(remap) = remap {
        commit(ctx, scope, remap);
    }
}

/// Move a folder with its whole subtree under `parent`.
pub fn relocate<E: StoredEntity>(
    ctx: &EpicContext,
    scope: FolderScope<E>,
    id: &FolderPath,
    parent: &FolderPath,
) {
    let remap = ctx.read(|state| {
        let (tree, entity_ids) = (scope.tree)(state);
        let name = id.name().unwrap_or_default();
        let clash = child_folders(tree, parent)
            .into_iter()
            .any(|f| &f.id != id && f.name == name);
        if clash {
            return Err(DUPLICATE_FOLDER_MESSAGE.to_string());
        }
        folders::move_folder(tree, entity_ids, id, parent).map_err(|e| e.to_string())
    });

    match remap {
        Ok(remap) => commit(ctx, scope, remap),
        Err(message) => ctx.notify_error(message),
    }
}

/// Apply `remap` to the state, then move every persisted entity on the backend.
/// Entities that fail to move get their old ids back.
fn commit<E: StoredEntity>(ctx: &EpicContext, scope: FolderScope<E>, remap: IdRemap) {
    if remap.is_empty() {
        return;
    }
    ctx.dispatch((scope.apply)(remap.clone()));

    let persisted: Vec<(EntityId, EntityId)> = remap
        .entities
        .into_iter()
        .filter(|(old, _)| !old.is_local())
        .collect();
    if persisted.is_empty() {
        return;
    }

    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let failed = move_all(scope.repository.as_ref(), &persisted).await;
        if failed.is_empty() {
            debug!(moved = persisted.len(), "Folder contents moved");
            return;
        }

        warn!(failed = failed.len(), "Restoring entities that could not be moved");
        let rollback = IdRemap {
            folders: Vec::new(),
            entities: failed.into_iter().map(|(old, new)| (new, old)).collect(),
        };
        let names: Vec<&str> = rollback.entities.iter().map(|(_, old)| old.name()).collect();
        ctx.notify_error(format!("Failed to move: {}", names.join(", ")));
        ctx.dispatch((scope.apply)(rollback));
    });
}
