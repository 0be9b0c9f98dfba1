use tracing::{debug, info, warn};

use crate::app::EpicContext;
use crate::app::events::CONFLICT_MESSAGE;
use crate::entities::{ApiKind, EntityId, FolderPath, ids::PUBLIC_BUCKET};
use crate::publications::PublicationAction;
use crate::publications::models::PublicationRequest;
use crate::services::ApiError;

pub fn handle(ctx: &EpicContext, action: &PublicationAction) {
    use PublicationAction as A;

    match action {
        A::UploadPublications => upload_publications(ctx),
        A::UploadPublication { url } => upload_publication(ctx, url),
        A::UploadPublicTree => upload_public_tree(ctx),
        A::CreatePublication { request } => create(ctx, request),
        A::ApprovePublication { url } => approve(ctx, url),
        A::RejectPublication { url } => reject(ctx, url),
        A::UploadPublicationsSuccess { .. }
        | A::UploadPublicationSuccess { .. }
        | A::UploadPublicTreeSuccess { .. }
        | A::CreatePublicationSuccess { .. }
        | A::SelectPublication { .. }
        | A::ApprovePublicationSuccess { .. }
        | A::RejectPublicationSuccess { .. }
        | A::PublicationFail { .. } => {}
    }
}

fn fail(ctx: &EpicContext, error: &ApiError, fallback: &str) {
    if error.is_unauthorized() {
        ctx.auth_required();
    }
    let message = if error.is_conflict() {
        CONFLICT_MESSAGE
    } else {
        fallback
    };
    ctx.notify_error(message);
    ctx.dispatch(PublicationAction::PublicationFail {
        message: message.to_string(),
    });
}

fn upload_publications(ctx: &EpicContext) {
    let folder_url = ctx.read(|s| format!("publications/{}/", s.conversations.bucket()));
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().publications.list(&folder_url).await {
            Ok(publications) => {
                ctx.dispatch(PublicationAction::UploadPublicationsSuccess { publications })
            }
            Err(e) => {
                warn!(error = ?e, "Failed to load publications");
                fail(&ctx, &e, "Failed to load publications.");
            }
        }
    });
}

fn upload_publication(ctx: &EpicContext, url: &str) {
    let url = url.to_string();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().publications.get(&url).await {
            Ok(publication) => {
                ctx.dispatch(PublicationAction::UploadPublicationSuccess { publication })
            }
            Err(e) => {
                warn!(publication = %url, error = ?e, "Failed to load publication");
                fail(&ctx, &e, "Failed to load publication.");
            }
        }
    });
}

/// List the public conversation and prompt trees.
fn upload_public_tree(ctx: &EpicContext) {
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let services = ctx.services();
        let (conversations, prompts) = tokio::join!(
            services
                .conversations
                .list(&FolderPath::root(ApiKind::Conversations, PUBLIC_BUCKET)),
            services
                .prompts
                .list(&FolderPath::root(ApiKind::Prompts, PUBLIC_BUCKET)),
        );

        let mut ids: Vec<EntityId> = Vec::new();
        match conversations {
            Ok(listing) => ids.extend(listing.entities.into_iter().map(|c| c.id)),
            Err(e) => warn!(error = ?e, "Failed to list public conversations"),
        }
        match prompts {
            Ok(listing) => ids.extend(listing.entities.into_iter().map(|p| p.id)),
            Err(e) => warn!(error = ?e, "Failed to list public prompts"),
        }
        debug!(count = ids.len(), "Loaded public tree");
        ctx.dispatch(PublicationAction::UploadPublicTreeSuccess { ids });
    });
}

fn create(ctx: &EpicContext, request: &PublicationRequest) {
    if request.resources.is_empty() {
        ctx.notify_error("Nothing to publish.");
        return;
    }
    let request = request.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().publications.create(&request).await {
            Ok(publication) => {
                info!(publication = %publication.url, "Publication request created");
                ctx.dispatch(PublicationAction::CreatePublicationSuccess { publication });
            }
            Err(e) => {
                warn!(name = %request.name, error = ?e, "Failed to create publication");
                fail(&ctx, &e, "Failed to create publication request.");
            }
        }
    });
}

/// Approve after the review passes; a failing review is shown instead of calling the backend.
fn approve(ctx: &EpicContext, url: &str) {
    let Some(review) = ctx.read(|s| s.publication_review(url)) else {
        debug!(publication = %url, "Approve for unknown publication ignored");
        return;
    };
    if !review.can_approve {
        let message = review
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        ctx.notify_error(message.clone());
        ctx.dispatch(PublicationAction::PublicationFail { message });
        return;
    }

    let url = url.to_string();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().publications.approve(&url).await {
            Ok(()) => ctx.dispatch(PublicationAction::ApprovePublicationSuccess { url }),
            Err(e) => {
                warn!(publication = %url, error = ?e, "Failed to approve publication");
                fail(&ctx, &e, "Failed to approve publication.");
            }
        }
    });
}

fn reject(ctx: &EpicContext, url: &str) {
    let url = url.to_string();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().publications.reject(&url, None).await {
            Ok(()) => ctx.dispatch(PublicationAction::RejectPublicationSuccess { url }),
            Err(e) => {
                warn!(publication = %url, error = ?e, "Failed to reject publication");
                fail(&ctx, &e, "Failed to reject publication.");
            }
        }
    });
}
