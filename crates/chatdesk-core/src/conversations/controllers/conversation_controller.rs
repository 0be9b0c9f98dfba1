use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::events::COMPARE_REJECTED_MESSAGE;
use crate::app::folder_ops::{self, FolderScope};
use crate::app::{Action, AppState, EpicContext};
use crate::conversations::ConversationAction;
use crate::conversations::models::{Conversation, ConversationMode, ConversationPatch, ModelRef};
use crate::entities::ids::LOCAL_BUCKET;
use crate::entities::naming::{
    DEFAULT_CONVERSATION_NAME, next_default_name, prepare_entity_name, unique_name,
};
use crate::entities::{
    ApiKind, EntityId, Folder, FolderItem, FolderPath, IdRemap, LoadStatus,
};
use crate::repositories::RepositoryResult;
use crate::repositories::batch::{delete_all, relocate};

/// The conversation with its full body, fetching it when only the header is resident.
pub(crate) async fn load_body(ctx: &EpicContext, id: &EntityId) -> RepositoryResult<Conversation> {
    let resident = ctx.read(|s| {
        s.conversations
            .conversation(id)
            .filter(|c| c.is_loaded())
            .cloned()
    });
    if let Some(conversation) = resident {
        return Ok(conversation);
    }
    let mut conversation = ctx.services().conversations.get(id).await?;
    conversation.set_entity_id(id.clone());
    conversation.status = LoadStatus::Loaded;
    Ok(conversation)
}

pub(crate) fn folder_scope(ctx: &EpicContext) -> FolderScope<Conversation> {
    fn tree(state: &AppState) -> (&[Folder], Vec<&EntityId>) {
        (
            &state.conversations.folders,
            state.conversations.conversations.iter().map(|c| &c.id).collect(),
        )
    }
    fn apply(remap: IdRemap) -> Action {
        ConversationAction::ApplyIdRemap { remap }.into()
    }
    FolderScope {
        tree,
        repository: ctx.services().conversations.clone(),
        apply,
    }
}

/// List the user's conversations, then restore the stored selection or start a new one.
pub fn init(ctx: &EpicContext) {
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let root = ctx.read(|s| s.conversations.root_folder());
        match ctx.services().conversations.list(&root).await {
            Ok(listing) => {
                info!(
                    conversations = listing.entities.len(),
                    folders = listing.folders.len(),
                    "Loaded conversations"
                );
                let available: Vec<EntityId> =
                    listing.entities.iter().map(|c| c.id.clone()).collect();
                let folders = listing
                    .folders
                    .into_iter()
                    .map(|id| Folder {
                        status: LoadStatus::Loaded,
                        ..Folder::new(id)
                    })
                    .collect();
                ctx.dispatch(ConversationAction::InitSuccess {
                    folders,
                    conversations: listing.entities,
                });

                let restored: Vec<EntityId> = ctx.read(|s| {
                    s.restored_selection
                        .iter()
                        .filter(|id| available.contains(id))
                        .cloned()
                        .collect()
                });
                if restored.is_empty() {
                    ctx.dispatch(ConversationAction::CreateNewConversations { names: Vec::new() });
                } else {
                    ctx.dispatch(ConversationAction::SelectConversations { ids: restored });
                }
            }
            Err(e) => {
                warn!(error = ?e, "Failed to load conversations");
                ctx.report(&e, "Failed to load conversations.");
                ctx.dispatch(ConversationAction::InitFail {
                    message: e.to_string(),
                });
                ctx.dispatch(ConversationAction::CreateNewConversations { names: Vec::new() });
            }
        }
    });
}

/// Fetch bodies for the selected conversations that only have headers.
pub fn upload_selected(ctx: &EpicContext, ids: &[EntityId]) {
    let missing: Vec<EntityId> = ctx.read(|s| {
        ids.iter()
            .filter(|id| {
                s.conversations
                    .conversation(id)
                    .is_none_or(|c| !c.is_loaded())
            })
            .cloned()
            .collect()
    });
    ctx.dispatch(ConversationAction::UploadConversationsByIds { ids: missing });
}

pub fn upload_by_ids(ctx: &EpicContext, ids: &[EntityId]) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let repository = ctx.services().conversations.clone();
        let results = join_all(ids.iter().map(|id| repository.get(id))).await;

        let mut conversations = Vec::new();
        let mut failed_ids = Vec::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(mut conversation) => {
                    conversation.set_entity_id(id);
                    conversations.push(conversation);
                }
                Err(e) => {
                    warn!(id = %id.encode(), error = ?e, "Failed to load conversation");
                    if e.is_unauthorized() {
                        ctx.auth_required();
                    }
                    failed_ids.push(id);
                }
            }
        }

        if !failed_ids.is_empty() {
            let names: Vec<&str> = failed_ids.iter().map(EntityId::name).collect();
            ctx.notify_error(format!("Failed to load conversations: {}", names.join(", ")));
        }
        ctx.dispatch(ConversationAction::UploadConversationsByIdsSuccess {
            conversations,
            failed_ids,
        });
    });
}

/// New local conversations seeded with the last used settings.
pub fn create_new(ctx: &EpicContext, names: &[String]) {
    let config = ctx.config().clone();
    let conversations = ctx.read(|s| {
        let local_root = FolderPath::local_root(ApiKind::Conversations);
        let mut taken = s.conversations.names_in_folder(&s.conversations.root_folder());
        taken.extend(s.conversations.names_in_folder(&local_root));

        let requested: Vec<Option<&String>> = if names.is_empty() {
            vec![None]
        } else {
            names.iter().map(Some).collect()
        };

        requested
            .into_iter()
            .map(|requested| {
                let prepared = requested
                    .map(|n| prepare_entity_name(n))
                    .filter(|n| !n.is_empty());
                let name = match prepared {
                    Some(name) => unique_name(&name, taken.iter().map(String::as_str)),
                    None => next_default_name(
                        DEFAULT_CONVERSATION_NAME,
                        taken.iter().map(String::as_str),
                        0,
                    ),
                };
                taken.push(name.clone());

                let mut conversation = Conversation::new(
                    EntityId::new(local_root.clone(), name),
                    ModelRef::new(config.default_model_id.clone()),
                    config.default_temperature,
                );
                if let Some(settings) = &s.last_conversation_settings {
                    conversation.apply_settings(settings);
                }
                conversation
            })
            .collect::<Vec<_>>()
    });

    debug!(count = conversations.len(), "Creating new conversations");
    ctx.dispatch(ConversationAction::CreateNewConversationSuccess { conversations });
}

/// Copy a conversation into the user's root folder under a free name.
pub fn duplicate(ctx: &EpicContext, id: &EntityId) {
    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let source = match load_body(&ctx, &id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                ctx.report(&e, "Failed to duplicate conversation.");
                return;
            }
        };

        let copy = ctx.read(|s| {
            let root = s.conversations.root_folder();
            let taken = s.conversations.names_in_folder(&root);
            let name = unique_name(&source.name, taken.iter().map(String::as_str));
            let mut copy = source.clone();
            copy.set_entity_id(EntityId::new(root, name));
            copy.mode = ConversationMode::Normal;
            copy.is_message_streaming = false;
            copy.is_shared = false;
            copy.shared_with_me = false;
            copy.is_published = false;
            copy.publication_info = None;
            copy.touch();
            copy
        });

        ctx.dispatch(ConversationAction::AddConversations {
            conversations: vec![copy.clone()],
            select: false,
        });
        let copy_id = copy.id.clone();
        if let Err(e) = ctx.services().conversations.create(copy).await {
            warn!(id = %copy_id.encode(), error = ?e, "Failed to store duplicate");
            ctx.report(&e, "Failed to duplicate conversation.");
            ctx.dispatch(ConversationAction::DeleteConversationsComplete { ids: vec![copy_id] });
        }
    });
}

/// Persist an update. Name and folder changes derive a new id and move the stored
/// conversation; any failure restores `previous`.
pub fn update(
    ctx: &EpicContext,
    id: &EntityId,
    values: &ConversationPatch,
    previous: Option<Conversation>,
) {
    let Some(previous) = previous else {
        debug!(id = %id.encode(), "Update for unknown conversation ignored");
        return;
    };
    let Some(current) = ctx.read(|s| s.conversations.conversation(id).cloned()) else {
        return;
    };

    if !values.affects_identity() {
        ctx.dispatch(ConversationAction::UpdateConversationSuccess {
            id: id.clone(),
            conversation: values.clone(),
        });
        if id.is_local() {
            return;
        }
        let id = id.clone();
        let values = values.clone();
        let task_ctx = ctx.clone();
        ctx.spawn(async move {
            let ctx = task_ctx;
            // Only the header is resident: write the patch onto the stored body.
            let body = if current.is_loaded() {
                Ok(current)
            } else {
                load_body(&ctx, &id).await.map(|mut body| {
                    values.apply(&mut body);
                    body
                })
            };
            let result = match body {
                Ok(body) => ctx.services().conversations.update(body).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(id = %id.encode(), error = ?e, "Failed to update conversation");
                ctx.report(&e, "Failed to update conversation.");
                ctx.dispatch(ConversationAction::UpdateConversationFail {
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
            .conversations
            .conversations
            .iter()
            .filter(|c| c.folder_id() == &folder && &c.id != id)
            .map(|c| c.name.clone())
            .collect();
        EntityId::new(folder, unique_name(&name, taken.iter().map(String::as_str)))
    });

    let patch = ConversationPatch {
        id: Some(new_id.clone()),
        name: None,
        folder: None,
        ..values.clone()
    };
    ctx.dispatch(ConversationAction::UpdateConversationSuccess {
        id: id.clone(),
        conversation: patch.clone(),
    });
    if &new_id == id || new_id.is_local() {
        return;
    }

    let body_resident = current.is_loaded();
    let mut moved = current;
    patch.apply(&mut moved);
    let old_id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let repository = ctx.services().conversations.clone();
        let result = if old_id.is_local() {
            repository.create(moved).await
        } else if body_resident {
            relocate(repository.as_ref(), moved, &old_id).await
        } else {
            repository
                .move_entity(&old_id, &new_id)
                .await
                .map(|()| new_id.clone())
        };

        match result {
            Ok(stored) => {
                info!(from = %old_id.encode(), to = %stored.encode(), "Conversation moved");
                ctx.dispatch(ConversationAction::SaveConversationSuccess { id: stored });
            }
            Err(e) => {
                warn!(from = %old_id.encode(), to = %new_id.encode(), error = ?e, "Failed to move conversation");
                ctx.report(&e, "Failed to move conversation.");
                ctx.dispatch(ConversationAction::UpdateConversationFail {
                    id: new_id,
                    previous: Box::new(previous),
                });
            }
        }
    });
}

/// Write the resident body of a persisted conversation.
pub fn save(ctx: &EpicContext, id: &EntityId) {
    let conversation = ctx.read(|s| {
        s.conversations
            .conversation(id)
            .filter(|c| !c.id.is_local() && c.is_loaded() && !c.shared_with_me)
            .cloned()
    });
    let Some(conversation) = conversation else {
        return;
    };

    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().conversations.update(conversation).await {
            Ok(()) => ctx.dispatch(ConversationAction::SaveConversationSuccess { id }),
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to save conversation");
                ctx.report(&e, "Failed to save conversation.");
                ctx.dispatch(ConversationAction::SaveConversationFail {
                    id,
                    message: e.to_string(),
                });
            }
        }
    });
}

/// Delete `ids` from the backend and the state. Failures are reported together
/// but every id is removed locally; an emptied selection gets a new conversation.
pub fn delete(ctx: &EpicContext, ids: &[EntityId], suppress_notice: bool) {
    if ids.is_empty() {
        return;
    }
    let (persisted, selection_emptied) = ctx.read(|s| {
        let persisted: Vec<EntityId> = ids
            .iter()
            .filter(|id| !id.is_local() && id.bucket() == s.conversations.bucket())
            .cloned()
            .collect();
        let selection_emptied = !s.conversations.selected_ids.is_empty()
            && s.conversations.selected_ids.iter().all(|id| ids.contains(id));
        (persisted, selection_emptied)
    });

    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let failed = delete_all(ctx.services().conversations.as_ref(), &persisted).await;
        if !failed.is_empty() && !suppress_notice {
            let names: Vec<&str> = failed.iter().map(EntityId::name).collect();
            ctx.notify_error(format!(
                "An error occurred while deleting conversations: {}",
                names.join(", ")
            ));
        }
        info!(deleted = ids.len(), failed = failed.len(), "Conversations deleted");
        ctx.dispatch(ConversationAction::DeleteConversationsComplete { ids });
        if selection_emptied {
            ctx.dispatch(ConversationAction::CreateNewConversations { names: Vec::new() });
        }
    });
}

/// Chosen folders cascade to their contents; chosen conversations outside them go in one batch.
pub fn delete_chosen(ctx: &EpicContext) {
    let (folders, conversations) = ctx.read(|s| {
        let folders = s.conversations.chosen_folder_ids.clone();
        let conversations: Vec<EntityId> = s
            .conversations
            .chosen_conversation_ids
            .iter()
            .filter(|id| !folders.iter().any(|f| f.contains(id.folder())))
            .cloned()
            .collect();
        (folders, conversations)
    });

    for id in folders {
        ctx.dispatch(ConversationAction::DeleteFolder { id });
    }
    if !conversations.is_empty() {
        ctx.dispatch(ConversationAction::DeleteConversations {
            ids: conversations,
            suppress_notice: false,
        });
    }
    ctx.dispatch(ConversationAction::ResetChosen);
}

/// The reducer already dropped the folders; remove what was inside them, including
/// unsaved conversations kept under the same path in the local bucket.
pub fn delete_folder(ctx: &EpicContext, id: &FolderPath) {
    let local = id.with_bucket(LOCAL_BUCKET);
    let ids: Vec<EntityId> = ctx.read(|s| {
        let mut contents = s.conversations.conversations_in_folder(id);
        if !id.is_local() && !local.is_root() {
            contents.extend(s.conversations.conversations_in_folder(&local));
        }
        contents.into_iter().map(|c| c.id.clone()).collect()
    });
    if !ids.is_empty() {
        ctx.dispatch(ConversationAction::DeleteConversations {
            ids,
            suppress_notice: false,
        });
    }
}

pub fn rename_folder(ctx: &EpicContext, id: &FolderPath, name: &str) {
    folder_ops::rename(ctx, folder_scope(ctx), id, name);
}

pub fn move_folder(ctx: &EpicContext, id: &FolderPath, parent: &FolderPath) {
    folder_ops::relocate(ctx, folder_scope(ctx), id, parent);
}

/// Pair `id` with the current conversation when both have the same number of
/// messages and neither carries form content.
pub fn select_for_compare(ctx: &EpicContext, id: &EntityId) {
    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let candidate = match load_body(&ctx, &id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to load comparison candidate");
                ctx.report(&e, COMPARE_REJECTED_MESSAGE);
                ctx.dispatch(ConversationAction::SelectForCompareFail);
                return;
            }
        };

        let compatible = ctx.read(|s| {
            let Some(current) = s
                .conversations
                .selected_ids
                .first()
                .and_then(|current| s.conversations.conversation(current))
            else {
                return false;
            };
            current.id != candidate.id
                && !current.has_form_content()
                && !candidate.has_form_content()
                && current.messages.len() == candidate.messages.len()
        });

        if compatible {
            ctx.dispatch(ConversationAction::SelectForCompareCompleted {
                conversation: Box::new(candidate),
            });
        } else {
            ctx.notify_error(COMPARE_REJECTED_MESSAGE);
            ctx.dispatch(ConversationAction::SelectForCompareFail);
        }
    });
}
