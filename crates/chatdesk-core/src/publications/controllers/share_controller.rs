use futures::future::join_all;
use tracing::{info, warn};

use crate::app::EpicContext;
use crate::entities::{ApiKind, EntityId, FolderItem, LoadStatus};
use crate::publications::ShareAction;
use crate::repositories::{EntityRepository, StoredEntity};
use crate::services::ApiError;

pub fn handle(ctx: &EpicContext, action: &ShareAction) {
    use ShareAction as A;

    match action {
        A::Share { ids } => share(ctx, ids),
        A::AcceptInvitation { invitation_id } => accept(ctx, invitation_id),
        A::Revoke { ids } => revoke(ctx, ids),
        A::Discard { ids } => discard(ctx, ids),
        A::ShareSuccess { .. }
        | A::AcceptInvitationSuccess { .. }
        | A::RevokeSuccess { .. }
        | A::DiscardSuccess { .. }
        | A::ShareFail { .. } => {}
    }
}

fn fail(ctx: &EpicContext, error: &ApiError, message: &str) {
    warn!(error = ?error, "{message}");
    if error.is_unauthorized() {
        ctx.auth_required();
    }
    ctx.notify_error(message);
    ctx.dispatch(ShareAction::ShareFail {
        message: message.to_string(),
    });
}

fn share(ctx: &EpicContext, ids: &[EntityId]) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().shares.share(&ids).await {
            Ok(invitation_link) => {
                info!(resources = ids.len(), "Share invitation created");
                ctx.dispatch(ShareAction::ShareSuccess {
                    ids,
                    invitation_link,
                });
            }
            Err(e) => fail(&ctx, &e, "Failed to share."),
        }
    });
}

/// Bodies of the entities an invitation opened up; unreadable ones are skipped.
async fn fetch_shared<E: StoredEntity>(
    repository: &dyn EntityRepository<E>,
    ids: &[&EntityId],
) -> Vec<E> {
    let results = join_all(ids.iter().map(|id| repository.get(id))).await;
    ids.iter()
        .zip(results)
        .filter_map(|(id, result)| match result {
            Ok(mut entity) => {
                entity.set_entity_id((*id).clone());
                Some(entity)
            }
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to fetch shared entity");
                None
            }
        })
        .collect()
}

fn accept(ctx: &EpicContext, invitation_id: &str) {
    let invitation_id = invitation_id.to_string();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let ids = match ctx.services().shares.accept(&invitation_id).await {
            Ok(ids) => ids,
            Err(e) => return fail(&ctx, &e, "Failed to accept the invitation."),
        };

        let of_kind = |kind: ApiKind| ids.iter().filter(|id| id.kind() == kind).collect::<Vec<_>>();
        let (conversation_ids, prompt_ids) = (of_kind(ApiKind::Conversations), of_kind(ApiKind::Prompts));
        let services = ctx.services();
        let (mut conversations, mut prompts) = tokio::join!(
            fetch_shared(services.conversations.as_ref(), &conversation_ids),
            fetch_shared(services.prompts.as_ref(), &prompt_ids),
        );
        for conversation in &mut conversations {
            conversation.status = LoadStatus::Loaded;
        }
        for prompt in &mut prompts {
            prompt.status = LoadStatus::Loaded;
        }

        info!(
            conversations = conversations.len(),
            prompts = prompts.len(),
            "Invitation accepted"
        );
        ctx.dispatch(ShareAction::AcceptInvitationSuccess {
            conversations,
            prompts,
        });
    });
}

fn revoke(ctx: &EpicContext, ids: &[EntityId]) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().shares.revoke(&ids).await {
            Ok(()) => ctx.dispatch(ShareAction::RevokeSuccess { ids }),
            Err(e) => fail(&ctx, &e, "Failed to unshare."),
        }
    });
}

fn discard(ctx: &EpicContext, ids: &[EntityId]) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().shares.discard(&ids).await {
            Ok(()) => ctx.dispatch(ShareAction::DiscardSuccess { ids }),
            Err(e) => fail(&ctx, &e, "Failed to remove shared items."),
        }
    });
}
